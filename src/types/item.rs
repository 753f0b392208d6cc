//! Rows handed to the aggregate protocol

use crate::types::value::Value;

/// Per-row facts computed by the window driver before an aggregate sees the row.
///
/// `part` is the row's contribution: the rank increment for the rank family,
/// the row index within the partition for NTILE, the partition sum for
/// RATIO_TO_REPORT. `nrows` is the partition cardinality.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRowFact {
    pub part: Value,
    pub nrows: Value,
}

impl WindowRowFact {
    pub fn new(part: impl Into<Value>, nrows: impl Into<Value>) -> Self {
        Self {
            part: part.into(),
            nrows: nrows.into(),
        }
    }

    /// A fact carrying only `part`
    pub fn with_part(part: impl Into<Value>) -> Self {
        Self {
            part: part.into(),
            nrows: Value::Missing,
        }
    }
}

/// One input row: the evaluated document plus the optional window fact
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    value: Value,
    window: Option<WindowRowFact>,
}

impl Item {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            window: None,
        }
    }

    pub fn with_window(value: Value, fact: WindowRowFact) -> Self {
        Self {
            value,
            window: Some(fact),
        }
    }

    /// Row with no document, used for defaults of empty groups
    pub fn empty() -> Self {
        Self::new(Value::Missing)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn window_fact(&self) -> Option<&WindowRowFact> {
        self.window.as_ref()
    }

    pub fn set_window_fact(&mut self, fact: WindowRowFact) {
        self.window = Some(fact);
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Item::new(value)
    }
}

impl From<serde_json::Value> for Item {
    fn from(json: serde_json::Value) -> Self {
        Item::new(Value::from(json))
    }
}
