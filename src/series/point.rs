//! Data points
//!
//! A point is an immutable `(timestamp, value)` pair where the value is
//! tagged as integer or floating. Exactly one typed accessor is valid per tag.

use crate::series::error::{SeriesError, SeriesResult};
use serde::{Deserialize, Serialize};

/// A tagged numeric value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value
    Integer(i64),
    /// Floating value
    Float(f64),
}

impl Value {
    /// Whether this value is integer-typed
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Lossy conversion used for arithmetic across both representations
    pub fn to_f64(&self) -> f64 {
        match *self {
            Value::Integer(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A single time-series data point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The measured value
    pub value: Value,
}

impl DataPoint {
    /// Create an integer-valued point
    pub fn integer(timestamp: i64, value: i64) -> Self {
        Self {
            timestamp,
            value: Value::Integer(value),
        }
    }

    /// Create a floating-valued point
    pub fn float(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: Value::Float(value),
        }
    }

    /// Whether the value is integer-typed
    pub fn is_integer(&self) -> bool {
        self.value.is_integer()
    }

    /// Read the integer value, failing if the point is floating
    pub fn int_value(&self) -> SeriesResult<i64> {
        match self.value {
            Value::Integer(v) => Ok(v),
            other => Err(SeriesError::TypeMismatch {
                requested: "integer",
                actual: other.kind(),
            }),
        }
    }

    /// Read the floating value, failing if the point is an integer
    pub fn float_value(&self) -> SeriesResult<f64> {
        match self.value {
            Value::Float(v) => Ok(v),
            other => Err(SeriesError::TypeMismatch {
                requested: "float",
                actual: other.kind(),
            }),
        }
    }

    /// Value as f64 regardless of tag
    pub fn to_f64(&self) -> f64 {
        self.value.to_f64()
    }

    /// Same timestamp, value converted to floating
    pub fn as_float(&self) -> Self {
        Self::float(self.timestamp, self.to_f64())
    }
}

impl std::fmt::Display for DataPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(timestamp={}, value={})", self.timestamp, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let int_point = DataPoint::integer(1000, 42);
        assert!(int_point.is_integer());
        assert_eq!(int_point.int_value(), Ok(42));
        assert!(matches!(
            int_point.float_value(),
            Err(SeriesError::TypeMismatch { requested: "float", .. })
        ));

        let float_point = DataPoint::float(1000, 4.5);
        assert!(!float_point.is_integer());
        assert_eq!(float_point.float_value(), Ok(4.5));
        assert!(matches!(
            float_point.int_value(),
            Err(SeriesError::TypeMismatch { requested: "integer", .. })
        ));
    }

    #[test]
    fn test_as_float() {
        let point = DataPoint::integer(5, 3).as_float();
        assert_eq!(point.timestamp, 5);
        assert_eq!(point.float_value(), Ok(3.0));
    }

    #[test]
    fn test_value_serialization() {
        let json = serde_json::to_string(&DataPoint::integer(1, 7)).unwrap();
        assert_eq!(json, r#"{"timestamp":1,"value":7}"#);

        let restored: DataPoint = serde_json::from_str(r#"{"timestamp":1,"value":7.5}"#).unwrap();
        assert_eq!(restored, DataPoint::float(1, 7.5));
    }
}
