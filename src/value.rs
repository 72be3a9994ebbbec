//! Parameter and result value types.

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

use crate::error::{Error, Result};

/// A tagged SQL value, used both as a parameter slot and as a stored
/// result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Storage class for an explicit-typed bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl Value {
    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert from rusqlite ValueRef.
    pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    /// Convert this value into the requested storage class.
    ///
    /// NULL stays NULL under any target type. Conversions that would lose
    /// the value entirely (e.g. a non-numeric string to INTEGER) fail with
    /// [`Error::BindFailed`].
    pub fn coerce(self, ty: ValueType) -> Result<Value> {
        let fail = |v: &Value| Error::BindFailed {
            message: format!("cannot convert {} value to {:?}", v.type_name(), ty),
        };

        match (self, ty) {
            (_, ValueType::Null) => Ok(Value::Null),
            (Value::Null, _) => Ok(Value::Null),

            (v @ Value::Integer(_), ValueType::Integer) => Ok(v),
            (Value::Real(f), ValueType::Integer) => Ok(Value::Integer(f as i64)),
            (Value::Text(s), ValueType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| fail(&Value::Text(s))),

            (v @ Value::Real(_), ValueType::Real) => Ok(v),
            (Value::Integer(i), ValueType::Real) => Ok(Value::Real(i as f64)),
            (Value::Text(s), ValueType::Real) => s
                .trim()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| fail(&Value::Text(s))),

            (v @ Value::Text(_), ValueType::Text) => Ok(v),
            (Value::Integer(i), ValueType::Text) => Ok(Value::Text(i.to_string())),
            (Value::Real(f), ValueType::Text) => Ok(Value::Text(f.to_string())),
            (Value::Blob(b), ValueType::Text) => String::from_utf8(b)
                .map(Value::Text)
                .map_err(|e| Error::BindFailed {
                    message: format!("cannot convert BLOB value to Text: {}", e),
                }),

            (v @ Value::Blob(_), ValueType::Blob) => Ok(v),
            (Value::Text(s), ValueType::Blob) => Ok(Value::Blob(s.into_bytes())),

            (v, _) => Err(fail(&v)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
            Value::Integer(i) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i))),
            Value::Real(f) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Real(*f))),
            // Borrowed for Text and Blob to avoid cloning on every bind
            Value::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::Blob(b) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(b))),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(if b { 1 } else { 0 })
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Real(f as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A decoded column value of the cursor's current row.
///
/// Accessors convert lazily; the view is valid until the next `fetch()`.
#[derive(Debug, Clone, Copy)]
pub struct FieldValue<'a> {
    value: &'a Value,
}

impl<'a> FieldValue<'a> {
    pub(crate) fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// The underlying tagged value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Check if this field is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Try to get as i64. Real values truncate; numeric text parses.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&'a str> {
        match self.value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.value {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert!(v.is_null());
    }

    #[test]
    fn test_field_integer() {
        let v = Value::Integer(42);
        let f = FieldValue::new(&v);
        assert_eq!(f.as_i64(), Some(42));
        assert_eq!(f.as_f64(), Some(42.0));
        assert_eq!(f.as_str(), None);
    }

    #[test]
    fn test_field_real() {
        let v = Value::Real(1.5);
        let f = FieldValue::new(&v);
        assert_eq!(f.as_f64(), Some(1.5));
        assert_eq!(f.as_i64(), Some(1));
    }

    #[test]
    fn test_field_text_parses_numbers() {
        let v = Value::Text("17".to_string());
        let f = FieldValue::new(&v);
        assert_eq!(f.as_str(), Some("17"));
        assert_eq!(f.as_i64(), Some(17));
        assert_eq!(f.as_f64(), Some(17.0));
    }

    #[test]
    fn test_field_blob() {
        let v = Value::Blob(vec![1, 2, 3]);
        let f = FieldValue::new(&v);
        assert_eq!(f.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(f.as_i64(), None);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(7i64), Value::Integer(7));
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(2i32)), Value::Integer(2));
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(
            Value::Text("42".to_string()).coerce(ValueType::Integer).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            Value::Integer(3).coerce(ValueType::Real).unwrap(),
            Value::Real(3.0)
        );
        assert_eq!(
            Value::Real(2.9).coerce(ValueType::Integer).unwrap(),
            Value::Integer(2)
        );
    }

    #[test]
    fn test_coerce_null_is_sticky() {
        assert_eq!(Value::Null.coerce(ValueType::Text).unwrap(), Value::Null);
        assert_eq!(
            Value::Integer(1).coerce(ValueType::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_coerce_failure() {
        let err = Value::Text("abc".to_string())
            .coerce(ValueType::Integer)
            .unwrap_err();
        assert!(matches!(err, crate::Error::BindFailed { .. }));

        let err = Value::Blob(vec![0]).coerce(ValueType::Real).unwrap_err();
        assert!(matches!(err, crate::Error::BindFailed { .. }));
    }
}
