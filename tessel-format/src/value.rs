use alloc::string::String;
use alloc::vec::Vec;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use tessel_core::{Bound, PropertyValue};

/// A dynamically typed value, for untyped (`Any`) properties and for reading
/// input without a schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    I64(i64),
    /// Unsigned integer
    U64(u64),
    /// Float
    F64(f64),
    /// String
    Str(String),
    /// Exact decimal
    Decimal(Decimal),
    /// Array
    Array(Vec<Value>),
    /// Object, in input order
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Look up a key of an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Borrow as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as an `i64`, if the value is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(n) => Some(n),
            Value::U64(n) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Whether this is `null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert into a bound value for an untyped property.
    pub fn into_bound(self) -> Bound {
        match self {
            Value::Null => Bound::Null,
            Value::Bool(b) => Bound::Bool(b),
            Value::I64(n) => Bound::I64(n),
            Value::U64(n) => Bound::U64(n),
            Value::F64(f) => Bound::F64(f),
            Value::Str(s) => Bound::Str(s),
            Value::Decimal(d) => Bound::Decimal(d),
            Value::Array(items) => Bound::Seq(items.into_iter().map(Value::into_bound).collect()),
            Value::Object(entries) => Bound::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_bound()))
                    .collect(),
            ),
        }
    }

    /// Borrow as a property value, so the serializer can write it.
    pub fn to_property(&self) -> PropertyValue<'_> {
        match self {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::I64(n) => PropertyValue::I64(*n),
            Value::U64(n) => PropertyValue::U64(*n),
            Value::F64(f) => PropertyValue::F64(*f),
            Value::Str(s) => PropertyValue::Str(s.as_str().into()),
            Value::Decimal(d) => PropertyValue::Decimal(*d),
            Value::Array(items) => PropertyValue::Seq(items.iter().map(Value::to_property).collect()),
            Value::Object(entries) => PropertyValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_str().into(), v.to_property()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}
