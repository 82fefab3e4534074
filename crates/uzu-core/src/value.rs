use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Markers that count as silence when a string value sits in a rhythmic
/// position (mask patterns, structure patterns).
const REST_MARKERS: [&str; 4] = ["~", "-", "rest", "0"];

/// A value carried by a pattern event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Number value
    Number(f64),
    /// String value (note names, sample names, etc.)
    String(String),
    /// Boolean value
    Bool(bool),
    /// List of values
    List(Vec<Value>),
    /// Control map (parameter name -> value)
    Map(BTreeMap<String, Value>),
    /// Silence/rest
    Silence,
}

impl Value {
    pub fn is_silence(&self) -> bool {
        matches!(self, Value::Silence)
    }

    /// Silence plus the conventional rest markers; used by `mask`
    pub fn is_rest(&self) -> bool {
        match self {
            Value::Silence => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0,
            Value::String(s) => REST_MARKERS.contains(&s.as_str()),
            _ => false,
        }
    }

    /// Truthiness as used by structure patterns
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty() && !REST_MARKERS.contains(&s.as_str()),
            Value::Bool(b) => *b,
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Silence => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Numeric reading of a value: plain numbers, the sampled `value` key
    /// of a signal map, an `n` control, or a parseable numeric string.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.parse().ok(),
            Value::Map(m) => m
                .get("value")
                .or_else(|| m.get("n"))
                .and_then(|v| v.numeric()),
            _ => None,
        }
    }

    /// Coerce a value into a control map: strings name a sound, numbers a
    /// sample index, maps pass through.
    pub fn into_controls(self) -> BTreeMap<String, Value> {
        match self {
            Value::Map(m) => m,
            Value::String(s) => {
                let mut m = BTreeMap::new();
                m.insert("s".to_string(), Value::String(s));
                m
            }
            Value::Number(n) => {
                let mut m = BTreeMap::new();
                m.insert("n".to_string(), Value::Number(n));
                m
            }
            _ => BTreeMap::new(),
        }
    }

    /// Structural union of two values as control maps; `self` wins key
    /// conflicts. Non-map values on both sides keep `self` unchanged.
    pub fn union(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Map(_), _) | (_, Value::Map(_)) => {
                let mut merged = other.clone().into_controls();
                merged.extend(self.clone().into_controls());
                Value::Map(merged)
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Silence => write!(f, "~"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}
