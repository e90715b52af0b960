use serde::{Serialize, Serializer};
use std::fmt;

/// Tokens treated as a missing value, in CSV fields and Excel string cells alike
pub(crate) const NA_TOKENS: [&str; 9] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// A single cell of a parsed spreadsheet
///
/// Missing cells are normalized to `Empty`, which displays (and exports) as the
/// empty string. Numeric aggregation only looks at `Int` and `Float`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Infer a typed value from a raw text field
    ///
    /// # Examples
    /// ```
    /// use sheetscope::cell::Value;
    ///
    /// assert_eq!(Value::infer("42"), Value::Int(42));
    /// assert_eq!(Value::infer(" 2.5 "), Value::Float(2.5));
    /// assert_eq!(Value::infer("NA"), Value::Empty);
    /// assert_eq!(Value::infer("hello"), Value::Text("hello".to_string()));
    /// ```
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_TOKENS.contains(&trimmed) {
            return Value::Empty;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }

        if trimmed.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else {
            Value::Text(raw.to_string())
        }
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            // Keep a decimal point so whole floats re-parse as floats
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_str(""),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_types() {
        assert_eq!(Value::infer("-7"), Value::Int(-7));
        assert_eq!(Value::infer("3.25"), Value::Float(3.25));
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("false"), Value::Bool(false));
        assert_eq!(Value::infer(""), Value::Empty);
        assert_eq!(Value::infer("null"), Value::Empty);
        assert_eq!(Value::infer("inf"), Value::Text("inf".to_string()));
    }

    #[test]
    fn test_display_round_trips_through_infer() {
        for value in [
            Value::Int(3),
            Value::Float(2.0),
            Value::Float(0.125),
            Value::Bool(true),
            Value::Text("Graph theory".to_string()),
            Value::Empty,
        ] {
            assert_eq!(Value::infer(&value.to_string()), value);
        }
    }

    #[test]
    fn test_serialize_empty_as_blank_string() {
        let json = serde_json::to_string(&vec![Value::Empty, Value::Int(1)]).unwrap();
        assert_eq!(json, r#"["",1]"#);
    }
}
