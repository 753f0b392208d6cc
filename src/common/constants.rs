//! Constants used throughout the aggregate engine

/// Initial capacity of DISTINCT sets
pub const DISTINCT_SET_CAPACITY: usize = 64;

/// Initial capacity of buffered value lists (STDDEV, VARIANCE, MEDIAN, ARRAY_AGG)
pub const INITIAL_LIST_CAPACITY: usize = 16;

/// Group length used by median-of-medians selection
pub const MEDIAN_GROUP_LENGTH: usize = 5;

/// Rows per morsel for parallel partial aggregation
pub const MORSEL_SIZE: usize = 102400;

/// Default offset for LAG, LEAD, FIRST_VALUE and LAST_VALUE
pub const DEFAULT_NTH_ITEM: usize = 1;
