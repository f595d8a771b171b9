use chrono::{DateTime, Utc};

/// A scalar field value on a [`crate::Fact`] (spec §3).
#[derive(Clone, Debug)]
pub enum Scalar {
    /// A UTF-8 string.
    String(String),
    /// A number. Canonicalized to its shortest exact decimal form.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A point in time, normalized to ISO-8601 UTC with millisecond precision.
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// `true` if this value can be canonicalized (finite numbers only).
    pub fn is_serializable(&self) -> bool {
        match self {
            Scalar::Number(n) => n.is_finite(),
            _ => true,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => {
                a.timestamp_millis() == b.timestamp_millis()
            }
            _ => false,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::Timestamp(value)
    }
}
