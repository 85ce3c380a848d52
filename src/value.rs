use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

// Numbers outside of this range stay text.
const MAX_SAFE_FLOAT: f64 = 9_007_199_254_740_992.0; // 2^53

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$").unwrap()
});

/// A single cell of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
}

/// Hashable identity of a value, used for distinct counting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Number(u64),
    Text(String),
    Bool(bool),
    Empty,
}

impl Value {
    /// Coerce a raw field from a delimited file into a typed value.
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Value::Empty,
            Some("true") | Some("TRUE") => Value::Bool(true),
            Some("false") | Some("FALSE") => Value::Bool(false),
            Some(s) => {
                if FLOAT.is_match(s)
                    && let Ok(n) = s.trim().parse::<f64>()
                    && n > -MAX_SAFE_FLOAT
                    && n < MAX_SAFE_FLOAT
                {
                    return Value::Number(n);
                }
                Value::Text(s.to_string())
            }
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Empty),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            nested => Value::Text(nested.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_FLOAT => {
                serde_json::Value::Number((*n as i64).into())
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Empty => serde_json::Value::Null,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn key(&self) -> ValueKey {
        match self {
            // -0 and 0 are the same value, all NaNs are the same value
            Value::Number(n) if *n == 0.0 => ValueKey::Number(0f64.to_bits()),
            Value::Number(n) if n.is_nan() => ValueKey::Number(f64::NAN.to_bits()),
            Value::Number(n) => ValueKey::Number(n.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Empty => ValueKey::Empty,
        }
    }

    /// Label used when the value becomes a chart category.
    pub fn label(&self) -> String {
        match self {
            Value::Empty => "(empty)".to_string(),
            v => v.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Bool(_) => 1,
            Value::Text(_) => 2,
            Value::Empty => 3,
        }
    }

    /// Total order over defined values. Numbers compare numerically, text
    /// lexically; values of different kinds are ordered number < bool < text.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

pub fn format_js_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_js_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Empty => Ok(()),
        }
    }
}
