use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a value, declared in collation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    Missing,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Missing => "missing",
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// A document value.
///
/// Values of every kind are totally ordered by [`Value::collate`]:
/// MISSING < NULL < false < true < numbers < strings < arrays < objects.
/// Equality follows collation, so `Integer(1) == Double(1.0)`.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent field or expression with no result
    Missing,
    /// Explicit JSON null
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Get the kind of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Missing => ValueType::Missing,
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) | Value::Double(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for NULL and MISSING, the two values aggregates skip
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Missing | Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer when this is a number that is a whole value greater than zero
    pub fn as_positive_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) if *v > 0 => Some(*v),
            Value::Double(v) if *v > 0.0 && v.fract() == 0.0 && *v <= i64::MAX as f64 => {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    /// Truthiness used by FILTER predicates
    pub fn truth(&self) -> bool {
        match self {
            Value::Missing | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(v) => *v != 0,
            Value::Double(v) => *v != 0.0 && !v.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// Look up a field of an object; anything else yields MISSING
    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Object(fields) => fields.get(name).cloned().unwrap_or(Value::Missing),
            _ => Value::Missing,
        }
    }

    /// Numeric addition. Integers stay integers until they overflow.
    pub fn add_number(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_add(*b)
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(*a as f64 + *b as f64)),
            ),
            _ => Some(Value::Double(self.as_f64()? + other.as_f64()?)),
        }
    }

    /// Numeric subtraction. Integers stay integers until they overflow.
    pub fn sub_number(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_sub(*b)
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(*a as f64 - *b as f64)),
            ),
            _ => Some(Value::Double(self.as_f64()? - other.as_f64()?)),
        }
    }

    /// Build an array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(values)
    }

    /// Build an object value from name/value pairs
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Total order over values of every kind
    pub fn collate(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Missing, Value::Missing) | (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Double(b)) => compare_f64(*a as f64, *b),
            (Value::Double(a), Value::Integer(b)) => compare_f64(*a, *b as f64),
            (Value::Double(a), Value::Double(b)) => compare_f64(*a, *b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ord = left.collate(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                let ord = a.len().cmp(&b.len());
                if ord != Ordering::Equal {
                    return ord;
                }
                for (left, right) in a.keys().zip(b.keys()) {
                    let ord = left.cmp(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                for (left, right) in a.values().zip(b.values()) {
                    let ord = left.collate(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            }
            _ => self.value_type().cmp(&other.value_type()),
        }
    }

    /// Convert to JSON. MISSING has no JSON form; inside arrays it becomes null
    /// and inside objects the field is dropped.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Missing => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            Value::Integer(v) => Some(serde_json::Value::from(*v)),
            Value::Double(v) => Some(
                serde_json::Number::from_f64(*v)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(values) => Some(serde_json::Value::Array(
                values
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(fields) => Some(serde_json::Value::Object(
                fields
                    .iter()
                    .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect(),
            )),
        }
    }
}

/// Numeric ordering where NaN sorts below every other number
pub fn compare_f64(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        None => a.is_nan().cmp(&b.is_nan()).reverse(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.collate(other) == Ordering::Equal
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Value::Integer(v),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "MISSING"),
            Value::Null => write!(f, "null"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Double(value) => {
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
                    write!(f, "{}", *value as i64)
                } else {
                    write!(f, "{}", value)
                }
            }
            Value::String(value) => match serde_json::to_string(value) {
                Ok(quoted) => write!(f, "{}", quoted),
                Err(_) => write!(f, "\"{}\"", value),
            },
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", Value::String(name.clone()), value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
