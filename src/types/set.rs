//! Deduplicating value set used by DISTINCT aggregates

use crate::types::value::Value;
use ahash::AHashMap;
use ordered_float::OrderedFloat;

/// Hash key of a value inside a [`DistinctSet`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SetKey {
    Missing,
    Null,
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Composite(String),
}

impl SetKey {
    fn new(value: &Value) -> Self {
        match value {
            Value::Missing => SetKey::Missing,
            Value::Null => SetKey::Null,
            Value::Boolean(b) => SetKey::Boolean(*b),
            Value::Integer(v) => SetKey::Integer(*v),
            Value::Double(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    SetKey::Integer(*v as i64)
                } else {
                    SetKey::Float(normalize(*v))
                }
            }
            Value::String(s) => SetKey::String(s.clone()),
            Value::Array(_) | Value::Object(_) => SetKey::Composite(value.to_string()),
        }
    }
}

fn normalize(v: f64) -> OrderedFloat<f64> {
    // -0.0 and 0.0 must hash alike
    if v == 0.0 {
        OrderedFloat(0.0)
    } else {
        OrderedFloat(v)
    }
}

/// Unordered set of values.
///
/// Integral doubles share keys with integers (`1.0` and `1` are one entry),
/// integers stay exact. A numeric set holds numbers only.
#[derive(Debug, Clone)]
pub struct DistinctSet {
    entries: AHashMap<SetKey, Value>,
    numeric: bool,
}

impl DistinctSet {
    pub fn new(capacity: usize, numeric: bool) -> Self {
        Self {
            entries: AHashMap::with_capacity(capacity),
            numeric,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a value; returns false when an equal value was already present,
    /// or when a numeric set is offered a non-number
    pub fn add(&mut self, item: Value) -> bool {
        if self.numeric && !item.is_number() {
            return false;
        }
        let key = SetKey::new(&item);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, item);
        true
    }

    pub fn has(&self, item: &Value) -> bool {
        self.entries.contains_key(&SetKey::new(item))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_values().collect()
    }

    /// Values ordered by collation
    pub fn sorted_values(self) -> Vec<Value> {
        let mut values = self.into_values();
        values.sort_by(|a, b| a.collate(b));
        values
    }

    /// Move every value of `other` into this set, returning the ones that were new
    pub fn extend_from(&mut self, other: DistinctSet) -> Vec<Value> {
        let mut added = Vec::new();
        for item in other.into_values() {
            if self.numeric && !item.is_number() {
                continue;
            }
            let key = SetKey::new(&item);
            if !self.entries.contains_key(&key) {
                added.push(item.clone());
                self.entries.insert(key, item);
            }
        }
        added
    }

    /// Union two sets by moving the smaller into the larger; the larger survives
    pub fn union(first: DistinctSet, second: DistinctSet) -> DistinctSet {
        let (mut bigger, smaller) = if first.len() >= second.len() {
            (first, second)
        } else {
            (second, first)
        };
        bigger.extend_from(smaller);
        bigger
    }
}
