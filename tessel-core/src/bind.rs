//! Decoded values on their way into constructors and setters.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{Introspected, TypeKey};

/// An owned, decoded property value.
pub enum Bound {
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer (already range-checked against the slot type)
    I64(i64),
    /// Unsigned integer (already range-checked against the slot type)
    U64(u64),
    /// Floating point
    F64(f64),
    /// Character
    Char(char),
    /// String
    Str(String),
    /// Decimal
    Decimal(Decimal),
    /// Sequence
    Seq(Vec<Bound>),
    /// String-keyed map, in wire order
    Map(Vec<(String, Bound)>),
    /// A freshly built object
    Object(Box<dyn Introspected>),
    /// An object with identity, possibly referenced from elsewhere in the graph
    Shared(Arc<dyn Introspected>),
}

impl Bound {
    /// Short name of the value kind, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Bound::Null => "null",
            Bound::Bool(_) => "bool",
            Bound::I64(_) | Bound::U64(_) => "integer",
            Bound::F64(_) => "float",
            Bound::Char(_) => "char",
            Bound::Str(_) => "string",
            Bound::Decimal(_) => "decimal",
            Bound::Seq(_) => "sequence",
            Bound::Map(_) => "map",
            Bound::Object(_) => "object",
            Bound::Shared(_) => "shared object",
        }
    }

    /// Downcast an object into a concrete type held by value.
    pub fn into_object<T: Introspected>(self) -> Result<T, BindError> {
        self.into_boxed::<T>().map(|b| *b)
    }

    /// Downcast an object into a concrete boxed type.
    pub fn into_boxed<T: Introspected>(self) -> Result<Box<T>, BindError> {
        let got = self.kind_name();
        match self {
            Bound::Object(obj) => {
                let key = obj.type_key();
                obj.into_any()
                    .downcast::<T>()
                    .map_err(|_| BindError::WrongType {
                        expected: core::any::type_name::<T>(),
                        got: key.to_string(),
                    })
            }
            _ => Err(BindError::WrongType {
                expected: core::any::type_name::<T>(),
                got: got.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Null => f.write_str("Null"),
            Bound::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Bound::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Bound::U64(v) => f.debug_tuple("U64").field(v).finish(),
            Bound::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Bound::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Bound::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Bound::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Bound::Seq(v) => f.debug_tuple("Seq").field(v).finish(),
            Bound::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Bound::Object(v) => f.debug_tuple("Object").field(&v.type_key()).finish(),
            Bound::Shared(v) => f.debug_tuple("Shared").field(&v.type_key()).finish(),
        }
    }
}

/// Failure to move a decoded value into an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A constructor argument was taken twice or never supplied.
    Missing {
        /// Logical property name
        property: &'static str,
    },
    /// The decoded value cannot become the requested Rust type.
    WrongType {
        /// Requested Rust type
        expected: &'static str,
        /// What was decoded
        got: String,
    },
    /// A number does not fit the requested Rust type.
    OutOfRange {
        /// The value, rendered
        value: String,
        /// Requested Rust type
        target: &'static str,
    },
    /// The type has no setter for this slot.
    NoSetter {
        /// Type that was asked
        type_key: TypeKey,
        /// Slot index
        index: usize,
    },
    /// The schema has no instantiator.
    NotInstantiable {
        /// The type
        type_key: TypeKey,
    },
    /// Anything else reported by generated code.
    Custom(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Missing { property } => write!(f, "no value for `{property}`"),
            BindError::WrongType { expected, got } => {
                write!(f, "cannot bind {got} to {expected}")
            }
            BindError::OutOfRange { value, target } => {
                write!(f, "{value} is out of range for {target}")
            }
            BindError::NoSetter { type_key, index } => {
                write!(f, "type `{type_key}` has no setter for slot {index}")
            }
            BindError::NotInstantiable { type_key } => {
                write!(f, "type `{type_key}` has no instantiator")
            }
            BindError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl core::error::Error for BindError {}

/// Conversion of a [`Bound`] into a Rust value.
pub trait FromBound: Sized {
    /// Convert, failing on a kind or range mismatch.
    fn from_bound(bound: Bound) -> Result<Self, BindError>;
}

fn wrong<T>(bound: &Bound) -> BindError {
    BindError::WrongType {
        expected: core::any::type_name::<T>(),
        got: bound.kind_name().to_string(),
    }
}

macro_rules! from_bound_int {
    ($($t:ty),*) => {$(
        impl FromBound for $t {
            fn from_bound(bound: Bound) -> Result<Self, BindError> {
                let out_of_range = |value: String| BindError::OutOfRange {
                    value,
                    target: stringify!($t),
                };
                match bound {
                    Bound::I64(n) => <$t>::try_from(n).map_err(|_| out_of_range(n.to_string())),
                    Bound::U64(n) => <$t>::try_from(n).map_err(|_| out_of_range(n.to_string())),
                    other => Err(wrong::<$t>(&other)),
                }
            }
        }
    )*};
}

from_bound_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromBound for f64 {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::F64(n) => Ok(n),
            Bound::I64(n) => Ok(n as f64),
            Bound::U64(n) => Ok(n as f64),
            Bound::Decimal(d) => d.to_f64().ok_or_else(|| BindError::OutOfRange {
                value: d.to_string(),
                target: "f64",
            }),
            other => Err(wrong::<f64>(&other)),
        }
    }
}

impl FromBound for f32 {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        f64::from_bound(bound).map(|n| n as f32)
    }
}

impl FromBound for bool {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Bool(b) => Ok(b),
            other => Err(wrong::<bool>(&other)),
        }
    }
}

impl FromBound for char {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Char(c) => Ok(c),
            other => Err(wrong::<char>(&other)),
        }
    }
}

impl FromBound for String {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Str(s) => Ok(s),
            other => Err(wrong::<String>(&other)),
        }
    }
}

impl FromBound for Decimal {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Decimal(d) => Ok(d),
            Bound::I64(n) => Ok(Decimal::from(n)),
            Bound::U64(n) => Ok(Decimal::from(n)),
            other => Err(wrong::<Decimal>(&other)),
        }
    }
}

impl<T: FromBound> FromBound for Option<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Null => Ok(None),
            other => T::from_bound(other).map(Some),
        }
    }
}

impl<T: FromBound> FromBound for Vec<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Seq(items) => items.into_iter().map(T::from_bound).collect(),
            other => Err(wrong::<Vec<T>>(&other)),
        }
    }
}

impl<T: FromBound> FromBound for BTreeMap<String, T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_bound(value)?)))
                .collect(),
            other => Err(wrong::<BTreeMap<String, T>>(&other)),
        }
    }
}

impl<T: Introspected> FromBound for Box<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        bound.into_boxed::<T>()
    }
}

impl FromBound for Box<dyn Introspected> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Object(obj) => Ok(obj),
            other => Err(wrong::<Box<dyn Introspected>>(&other)),
        }
    }
}

impl<T: Introspected> FromBound for Arc<T> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Shared(shared) => {
                let key = shared.type_key();
                shared
                    .into_any_arc()
                    .downcast::<T>()
                    .map_err(|_| BindError::WrongType {
                        expected: core::any::type_name::<T>(),
                        got: key.to_string(),
                    })
            }
            other => other.into_boxed::<T>().map(Arc::from),
        }
    }
}

impl FromBound for Arc<dyn Introspected> {
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Shared(shared) => Ok(shared),
            Bound::Object(obj) => Ok(Arc::from(obj)),
            other => Err(wrong::<Arc<dyn Introspected>>(&other)),
        }
    }
}

/// Constructor arguments collected by the engine for one instantiation.
///
/// Slots the input never mentioned and that declare a default are left empty;
/// the instantiator fills them with [`Arguments::take_or_default`] or
/// [`Arguments::take_or_else`].
pub struct Arguments {
    type_key: TypeKey,
    names: Vec<&'static str>,
    values: Vec<Option<Bound>>,
}

impl Arguments {
    /// Empty arguments for a constructor with the given parameter names.
    pub fn new(type_key: TypeKey, names: Vec<&'static str>) -> Self {
        let values = names.iter().map(|_| None).collect();
        Self {
            type_key,
            names,
            values,
        }
    }

    /// The type being constructed.
    pub const fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Number of constructor parameters.
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Store a value (used by the engine).
    pub fn set(&mut self, index: usize, value: Option<Bound>) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Whether a value was supplied for `index`.
    pub fn is_present(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(Option::is_some)
    }

    /// Take the raw bound value.
    pub fn take_bound(&mut self, index: usize) -> Option<Bound> {
        self.values.get_mut(index).and_then(Option::take)
    }

    /// Take and convert an argument that must be present.
    pub fn take<T: FromBound>(&mut self, index: usize) -> Result<T, BindError> {
        match self.take_bound(index) {
            Some(bound) => T::from_bound(bound),
            None => Err(BindError::Missing {
                property: self.name(index),
            }),
        }
    }

    /// Take and convert, or compute a default when absent.
    pub fn take_or_else<T: FromBound>(
        &mut self,
        index: usize,
        default: impl FnOnce() -> T,
    ) -> Result<T, BindError> {
        match self.take_bound(index) {
            Some(bound) => T::from_bound(bound),
            None => Ok(default()),
        }
    }

    /// Take and convert, or use `T::default()` when absent.
    pub fn take_or_default<T: FromBound + Default>(&mut self, index: usize) -> Result<T, BindError> {
        self.take_or_else(index, T::default)
    }

    /// Take a nested object held by value.
    pub fn take_object<T: Introspected>(&mut self, index: usize) -> Result<T, BindError> {
        match self.take_bound(index) {
            Some(bound) => bound.into_object::<T>(),
            None => Err(BindError::Missing {
                property: self.name(index),
            }),
        }
    }

    fn name(&self, index: usize) -> &'static str {
        self.names.get(index).copied().unwrap_or("<unknown>")
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.names.iter().zip(&self.values) {
            map.entry(name, value);
        }
        map.finish()
    }
}

/// Downcast helper for codecs and filters that receive `&dyn Introspected`.
pub fn downcast_ref<T: Any>(value: &dyn Introspected) -> Option<&T> {
    value.as_any().downcast_ref::<T>()
}
