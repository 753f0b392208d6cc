//! Aggregate function registry
//!
//! Every aggregate and window function is a variant of [`AggregateKind`].
//! The kind carries its argument bounds and the property mask the semantic
//! checker consults to decide which clauses may accompany a call.

use crate::common::error::{PrismAggError, PrismAggResult};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Clauses and protocol capabilities a function supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AggregateProperties: u32 {
        const ALLOWS_REGULAR = 1 << 0;
        const ALLOWS_WINDOW = 1 << 1;
        const ALLOWS_DISTINCT = 1 << 2;
        const ALLOWS_FILTER = 1 << 3;
        const ALLOWS_WINDOW_FRAME = 1 << 4;
        const ALLOWS_INCREMENTAL = 1 << 5;
        /// ORDER BY is required inside OVER
        const WINDOW_ORDER = 1 << 6;
        /// ORDER BY is forbidden inside OVER
        const WINDOW_NOORDER = 1 << 7;
        const WINDOW_RESPECT_NULLS = 1 << 8;
        const WINDOW_IGNORE_NULLS = 1 << 9;
        const WINDOW_FROM_FIRST = 1 << 10;
        const WINDOW_FROM_LAST = 1 << 11;
        /// Second argument must be a positive integer
        const WINDOW_2ND_POSINT = 1 << 12;
        /// Second argument may depend on the row
        const WINDOW_2ND_DYNAMIC = 1 << 13;
        /// Supports `is_cumulate_done`
        const CUMULATE_DONE = 1 << 14;

        const REGULAR_AGGREGATE = Self::ALLOWS_REGULAR.bits()
            | Self::ALLOWS_WINDOW.bits()
            | Self::ALLOWS_DISTINCT.bits()
            | Self::ALLOWS_FILTER.bits()
            | Self::ALLOWS_WINDOW_FRAME.bits();
        const NULLS_CLAUSE = Self::WINDOW_RESPECT_NULLS.bits() | Self::WINDOW_IGNORE_NULLS.bits();
        const FROM_CLAUSE = Self::WINDOW_FROM_FIRST.bits() | Self::WINDOW_FROM_LAST.bits();
    }
}

/// Closed set of supported functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    ArrayAgg,
    Avg,
    Count,
    CountN,
    Max,
    Min,
    Median,
    Sum,
    StddevPop,
    StddevSamp,
    VarPop,
    VarSamp,
    RowNumber,
    Rank,
    DenseRank,
    PercentRank,
    CumeDist,
    Ntile,
    Lag,
    Lead,
    FirstValue,
    LastValue,
    NthValue,
    RatioToReport,
}

impl AggregateKind {
    /// Look up a function by name, case-insensitively, resolving aliases
    pub fn from_name(name: &str) -> PrismAggResult<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "array_agg" => AggregateKind::ArrayAgg,
            "avg" | "mean" => AggregateKind::Avg,
            "count" => AggregateKind::Count,
            "countn" => AggregateKind::CountN,
            "max" => AggregateKind::Max,
            "min" => AggregateKind::Min,
            "median" => AggregateKind::Median,
            "sum" => AggregateKind::Sum,
            "stddev_pop" => AggregateKind::StddevPop,
            "stddev" | "stddev_samp" => AggregateKind::StddevSamp,
            "var_pop" | "variance_pop" => AggregateKind::VarPop,
            "variance" | "var_samp" | "variance_samp" => AggregateKind::VarSamp,
            "row_number" => AggregateKind::RowNumber,
            "rank" => AggregateKind::Rank,
            "dense_rank" => AggregateKind::DenseRank,
            "percent_rank" => AggregateKind::PercentRank,
            "cume_dist" => AggregateKind::CumeDist,
            "ntile" => AggregateKind::Ntile,
            "lag" => AggregateKind::Lag,
            "lead" => AggregateKind::Lead,
            "first_value" => AggregateKind::FirstValue,
            "last_value" => AggregateKind::LastValue,
            "nth_value" => AggregateKind::NthValue,
            "ratio_to_report" => AggregateKind::RatioToReport,
            _ => return Err(PrismAggError::UnknownFunction(name.to_string())),
        };
        Ok(kind)
    }

    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::ArrayAgg => "ARRAY_AGG",
            AggregateKind::Avg => "AVG",
            AggregateKind::Count => "COUNT",
            AggregateKind::CountN => "COUNTN",
            AggregateKind::Max => "MAX",
            AggregateKind::Min => "MIN",
            AggregateKind::Median => "MEDIAN",
            AggregateKind::Sum => "SUM",
            AggregateKind::StddevPop => "STDDEV_POP",
            AggregateKind::StddevSamp => "STDDEV_SAMP",
            AggregateKind::VarPop => "VAR_POP",
            AggregateKind::VarSamp => "VAR_SAMP",
            AggregateKind::RowNumber => "ROW_NUMBER",
            AggregateKind::Rank => "RANK",
            AggregateKind::DenseRank => "DENSE_RANK",
            AggregateKind::PercentRank => "PERCENT_RANK",
            AggregateKind::CumeDist => "CUME_DIST",
            AggregateKind::Ntile => "NTILE",
            AggregateKind::Lag => "LAG",
            AggregateKind::Lead => "LEAD",
            AggregateKind::FirstValue => "FIRST_VALUE",
            AggregateKind::LastValue => "LAST_VALUE",
            AggregateKind::NthValue => "NTH_VALUE",
            AggregateKind::RatioToReport => "RATIO_TO_REPORT",
        }
    }

    pub fn properties(&self) -> AggregateProperties {
        use AggregateProperties as P;
        match self {
            AggregateKind::Sum | AggregateKind::Avg | AggregateKind::Count | AggregateKind::CountN => {
                P::REGULAR_AGGREGATE | P::ALLOWS_INCREMENTAL
            }
            AggregateKind::ArrayAgg
            | AggregateKind::Max
            | AggregateKind::Min
            | AggregateKind::Median
            | AggregateKind::StddevPop
            | AggregateKind::StddevSamp
            | AggregateKind::VarPop
            | AggregateKind::VarSamp => P::REGULAR_AGGREGATE,
            AggregateKind::RowNumber => P::ALLOWS_WINDOW | P::ALLOWS_INCREMENTAL,
            AggregateKind::Rank
            | AggregateKind::DenseRank
            | AggregateKind::PercentRank
            | AggregateKind::CumeDist
            | AggregateKind::Ntile => P::ALLOWS_WINDOW | P::ALLOWS_INCREMENTAL | P::WINDOW_ORDER,
            AggregateKind::Lag | AggregateKind::Lead => {
                P::ALLOWS_WINDOW
                    | P::WINDOW_ORDER
                    | P::NULLS_CLAUSE
                    | P::WINDOW_2ND_POSINT
                    | P::WINDOW_2ND_DYNAMIC
                    | P::CUMULATE_DONE
            }
            AggregateKind::FirstValue | AggregateKind::LastValue => {
                P::ALLOWS_WINDOW | P::ALLOWS_WINDOW_FRAME | P::NULLS_CLAUSE | P::CUMULATE_DONE
            }
            AggregateKind::NthValue => {
                P::ALLOWS_WINDOW
                    | P::ALLOWS_WINDOW_FRAME
                    | P::NULLS_CLAUSE
                    | P::FROM_CLAUSE
                    | P::WINDOW_2ND_POSINT
                    | P::CUMULATE_DONE
            }
            AggregateKind::RatioToReport => P::ALLOWS_WINDOW | P::WINDOW_NOORDER,
        }
    }

    /// True when any of `properties` is declared
    pub fn has_property(&self, properties: AggregateProperties) -> bool {
        self.properties().intersects(properties)
    }

    pub fn min_args(&self) -> usize {
        match self {
            AggregateKind::Count
            | AggregateKind::RowNumber
            | AggregateKind::Rank
            | AggregateKind::DenseRank
            | AggregateKind::PercentRank
            | AggregateKind::CumeDist => 0,
            AggregateKind::NthValue => 2,
            _ => 1,
        }
    }

    pub fn max_args(&self) -> usize {
        match self {
            AggregateKind::RowNumber
            | AggregateKind::Rank
            | AggregateKind::DenseRank
            | AggregateKind::PercentRank
            | AggregateKind::CumeDist => 0,
            AggregateKind::Lag | AggregateKind::Lead => 3,
            AggregateKind::NthValue => 2,
            _ => 1,
        }
    }

    pub fn check_arguments(&self, name: &str, actual: usize) -> PrismAggResult<()> {
        let (min, max) = (self.min_args(), self.max_args());
        if actual < min || actual > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(PrismAggError::ArgumentCount {
                function: name.to_uppercase(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Functions that may only appear with an OVER clause
    pub fn is_window_only(&self) -> bool {
        !self.has_property(AggregateProperties::ALLOWS_REGULAR)
    }

    /// Functions that skip every non-numeric operand
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AggregateKind::Sum
                | AggregateKind::Avg
                | AggregateKind::CountN
                | AggregateKind::Median
                | AggregateKind::StddevPop
                | AggregateKind::StddevSamp
                | AggregateKind::VarPop
                | AggregateKind::VarSamp
        )
    }

    pub fn is_rank_family(&self) -> bool {
        matches!(
            self,
            AggregateKind::RowNumber
                | AggregateKind::Rank
                | AggregateKind::DenseRank
                | AggregateKind::PercentRank
                | AggregateKind::CumeDist
        )
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether the named function declares any of `properties`; unknown names declare nothing
pub fn aggregate_has_property(name: &str, properties: AggregateProperties) -> bool {
    AggregateKind::from_name(name)
        .map(|kind| kind.has_property(properties))
        .unwrap_or(false)
}
