//! The contract between generated per-type code and the engine.
//!
//! A type takes part in (de)serialization by implementing [`Introspected`]
//! (read access to its properties by slot index, optional setters) and by
//! registering a [`TypeSchema`](crate::TypeSchema) whose instantiator builds it
//! from [`Arguments`](crate::Arguments). Nothing here inspects types at run
//! time beyond `Any` downcasts of values the schema already names.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use rust_decimal::Decimal;

use crate::{BindError, Bound, TypeKey};

/// Upcasts to `Any` for downcasting concrete values out of trait objects.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Convert a box into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    /// Convert an arc into `Arc<dyn Any>`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Read/write access to a value's properties, indexed by slot position in
/// its schema.
pub trait Introspected: AsAny + Send + Sync {
    /// The concrete runtime type of this value.
    fn type_key(&self) -> TypeKey;

    /// Read the property at `index` (position in the schema's slot list).
    fn property(&self, index: usize) -> PropertyValue<'_>;

    /// Apply a setter-bound property after construction.
    fn set_property(&mut self, index: usize, value: Bound) -> Result<(), BindError> {
        let _ = value;
        Err(BindError::NoSetter {
            type_key: self.type_key(),
            index,
        })
    }

    /// Link a shared object into a setter-bound slot after the whole graph
    /// has been decoded. Only needed by types that take part in reference
    /// cycles; they hold the slot behind interior mutability.
    fn link(&self, index: usize, target: Arc<dyn Introspected>) -> Result<(), BindError> {
        let _ = target;
        Err(BindError::NoSetter {
            type_key: self.type_key(),
            index,
        })
    }
}

impl fmt::Debug for dyn Introspected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_key())
    }
}

/// Types with a statically known schema key.
pub trait HasSchema: Introspected + Sized {
    /// Key of this type's schema.
    const TYPE_KEY: TypeKey;
}

/// A borrowed view of a property value, produced by
/// [`Introspected::property`].
#[derive(Clone)]
pub enum PropertyValue<'a> {
    /// No value at all (distinct from `null`).
    Absent,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    I64(i64),
    /// Unsigned integer
    U64(u64),
    /// Floating point
    F64(f64),
    /// Character
    Char(char),
    /// String
    Str(Cow<'a, str>),
    /// Decimal
    Decimal(Decimal),
    /// Sequence
    Seq(Vec<PropertyValue<'a>>),
    /// String-keyed map, in iteration order
    Map(Vec<(Cow<'a, str>, PropertyValue<'a>)>),
    /// Nested object owned by the parent
    Object(&'a dyn Introspected),
    /// Nested object with identity
    Shared(Arc<dyn Introspected>),
}

impl PropertyValue<'_> {
    /// `null` or absent.
    pub const fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null | PropertyValue::Absent)
    }

    /// `null`, absent, or an empty string/collection.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Null | PropertyValue::Absent => true,
            PropertyValue::Str(s) => s.is_empty(),
            PropertyValue::Seq(items) => items.is_empty(),
            PropertyValue::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Equal to the default value of its type.
    pub fn is_default(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => !*b,
            PropertyValue::I64(n) => *n == 0,
            PropertyValue::U64(n) => *n == 0,
            PropertyValue::F64(n) => *n == 0.0,
            PropertyValue::Char(c) => *c == '\0',
            PropertyValue::Decimal(d) => d.is_zero(),
            PropertyValue::Object(_) | PropertyValue::Shared(_) => false,
            other => other.is_empty(),
        }
    }

    /// Short name of the value kind, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Absent => "absent",
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::I64(_) | PropertyValue::U64(_) => "integer",
            PropertyValue::F64(_) => "float",
            PropertyValue::Char(_) => "char",
            PropertyValue::Str(_) => "string",
            PropertyValue::Decimal(_) => "decimal",
            PropertyValue::Seq(_) => "sequence",
            PropertyValue::Map(_) => "map",
            PropertyValue::Object(_) => "object",
            PropertyValue::Shared(_) => "shared object",
        }
    }
}

impl fmt::Debug for PropertyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Absent => f.write_str("Absent"),
            PropertyValue::Null => f.write_str("Null"),
            PropertyValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            PropertyValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            PropertyValue::U64(v) => f.debug_tuple("U64").field(v).finish(),
            PropertyValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            PropertyValue::Char(v) => f.debug_tuple("Char").field(v).finish(),
            PropertyValue::Str(v) => f.debug_tuple("Str").field(v).finish(),
            PropertyValue::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            PropertyValue::Seq(v) => f.debug_tuple("Seq").field(v).finish(),
            PropertyValue::Map(v) => f.debug_tuple("Map").field(v).finish(),
            PropertyValue::Object(v) => f.debug_tuple("Object").field(&v.type_key()).finish(),
            PropertyValue::Shared(v) => f.debug_tuple("Shared").field(&v.type_key()).finish(),
        }
    }
}

/// Conversion of a field into a [`PropertyValue`].
///
/// Implemented for the scalar types, strings, `Option`, `Vec` and smart
/// pointers to introspected types. Nested objects held by value are exposed
/// with `PropertyValue::Object(&self.field)`.
pub trait ToProperty {
    /// Borrow as a property value.
    fn to_property(&self) -> PropertyValue<'_>;
}

macro_rules! to_property_signed {
    ($($t:ty),*) => {$(
        impl ToProperty for $t {
            fn to_property(&self) -> PropertyValue<'_> {
                PropertyValue::I64(i64::from(*self))
            }
        }
    )*};
}

macro_rules! to_property_unsigned {
    ($($t:ty),*) => {$(
        impl ToProperty for $t {
            fn to_property(&self) -> PropertyValue<'_> {
                PropertyValue::U64(u64::from(*self))
            }
        }
    )*};
}

to_property_signed!(i8, i16, i32, i64);
to_property_unsigned!(u8, u16, u32, u64);

impl ToProperty for bool {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Bool(*self)
    }
}

impl ToProperty for f32 {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::F64(f64::from(*self))
    }
}

impl ToProperty for f64 {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::F64(*self)
    }
}

impl ToProperty for char {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Char(*self)
    }
}

impl ToProperty for String {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Str(Cow::Borrowed(self.as_str()))
    }
}

impl ToProperty for &'static str {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Str(Cow::Borrowed(self))
    }
}

impl ToProperty for Decimal {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Decimal(*self)
    }
}

impl<T: ToProperty> ToProperty for Option<T> {
    fn to_property(&self) -> PropertyValue<'_> {
        match self {
            Some(value) => value.to_property(),
            None => PropertyValue::Null,
        }
    }
}

impl<T: ToProperty> ToProperty for Vec<T> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Seq(self.iter().map(ToProperty::to_property).collect())
    }
}

impl<T: ToProperty> ToProperty for BTreeMap<String, T> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Map(
            self.iter()
                .map(|(key, value)| (Cow::Borrowed(key.as_str()), value.to_property()))
                .collect(),
        )
    }
}

impl<T: Introspected> ToProperty for Box<T> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Object(&**self)
    }
}

impl ToProperty for Box<dyn Introspected> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Object(&**self)
    }
}

impl<T: Introspected> ToProperty for Arc<T> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Shared(self.clone())
    }
}

impl ToProperty for Arc<dyn Introspected> {
    fn to_property(&self) -> PropertyValue<'_> {
        PropertyValue::Shared(self.clone())
    }
}
