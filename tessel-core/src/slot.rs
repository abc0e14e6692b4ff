use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::{Bound, Inclusion, TypeKey};

/// The declared type of a property, as far as the wire is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `char`, encoded as a one-character string
    Char,
    /// UTF-8 string
    Str,
    /// Arbitrary-precision decimal (`rust_decimal::Decimal`)
    Decimal,
    /// A nested object owned by value (or `Box`). The key may name an
    /// abstract type, in which case the polymorphic resolver picks the
    /// concrete schema.
    Object(TypeKey),
    /// A nested object behind an `Arc`. Shared objects carry identity and are
    /// the only values tracked by the reference manager.
    Shared(TypeKey),
    /// A homogeneous sequence.
    Seq(Box<PropertyType>),
    /// A map with string keys.
    Map(Box<PropertyType>),
    /// Any value; decoded as a materialized tree.
    Any,
}

impl PropertyType {
    /// Returns true for numeric and boolean types, the ones that have a zero
    /// value and are subject to the fail-on-null-for-primitives toggle.
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            PropertyType::Bool
                | PropertyType::I8
                | PropertyType::I16
                | PropertyType::I32
                | PropertyType::I64
                | PropertyType::U8
                | PropertyType::U16
                | PropertyType::U32
                | PropertyType::U64
                | PropertyType::F32
                | PropertyType::F64
                | PropertyType::Char
        )
    }

    /// Value an absent primitive takes when zero-filling is allowed. `None`
    /// for everything that is not [primitive](Self::is_primitive).
    pub fn zero_value(&self) -> Option<Bound> {
        Some(match self {
            PropertyType::Bool => Bound::Bool(false),
            PropertyType::I8 | PropertyType::I16 | PropertyType::I32 | PropertyType::I64 => {
                Bound::I64(0)
            }
            PropertyType::U8 | PropertyType::U16 | PropertyType::U32 | PropertyType::U64 => {
                Bound::U64(0)
            }
            PropertyType::F32 | PropertyType::F64 => Bound::F64(0.0),
            PropertyType::Char => Bound::Char('\0'),
            _ => return None,
        })
    }

    /// The object type this property refers to, if any.
    pub const fn object_key(&self) -> Option<TypeKey> {
        match self {
            PropertyType::Object(key) | PropertyType::Shared(key) => Some(*key),
            _ => None,
        }
    }

    /// Short human-readable name used in error messages.
    pub const fn describe(&self) -> &'static str {
        match self {
            PropertyType::Bool => "bool",
            PropertyType::I8 => "i8",
            PropertyType::I16 => "i16",
            PropertyType::I32 => "i32",
            PropertyType::I64 => "i64",
            PropertyType::U8 => "u8",
            PropertyType::U16 => "u16",
            PropertyType::U32 => "u32",
            PropertyType::U64 => "u64",
            PropertyType::F32 => "f32",
            PropertyType::F64 => "f64",
            PropertyType::Char => "char",
            PropertyType::Str => "string",
            PropertyType::Decimal => "decimal",
            PropertyType::Object(_) => "object",
            PropertyType::Shared(_) => "shared object",
            PropertyType::Seq(_) => "sequence",
            PropertyType::Map(_) => "map",
            PropertyType::Any => "any",
        }
    }
}

/// How a decoded property value reaches the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Passed to the instantiator as a constructor argument.
    Constructor,
    /// Applied through [`Introspected::set_property`](crate::Introspected::set_property)
    /// after construction.
    Setter,
}

/// Which directions ignore a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnorePolicy {
    /// The property takes part in both directions.
    #[default]
    None,
    /// Never written, still read.
    Serialize,
    /// Always written, skipped when read.
    Deserialize,
    /// Neither written nor read.
    Both,
}

impl IgnorePolicy {
    /// Whether the property is skipped when serializing.
    pub const fn skips_serialize(self) -> bool {
        matches!(self, IgnorePolicy::Serialize | IgnorePolicy::Both)
    }

    /// Whether the property is skipped when deserializing.
    pub const fn skips_deserialize(self) -> bool {
        matches!(self, IgnorePolicy::Deserialize | IgnorePolicy::Both)
    }
}

/// One property of a [`TypeSchema`](crate::TypeSchema).
///
/// Slots are built with a small builder API, standing in for what a code
/// generator would emit:
///
/// ```
/// use tessel_core::{PropertySlot, PropertyType, Inclusion};
///
/// let slot = PropertySlot::new("preferredName", PropertyType::Str)
///     .nullable()
///     .include(Inclusion::NonNull);
/// assert!(slot.nullable);
/// ```
#[derive(Clone)]
pub struct PropertySlot {
    /// Logical property name.
    pub name: &'static str,
    /// Explicit wire name; overrides any naming strategy.
    pub wire_name: Option<&'static str>,
    /// Additional names accepted when decoding.
    pub aliases: Vec<&'static str>,
    /// Declared type.
    pub ty: PropertyType,
    /// `null` is a legal value (the Rust field is an `Option`).
    pub nullable: bool,
    /// The slot must be present in the input even if it has a zero value.
    pub required: bool,
    /// The instantiator supplies a default when the slot is absent.
    pub has_default: bool,
    /// Direction-specific ignore.
    pub ignore: IgnorePolicy,
    /// Per-property inclusion; falls back to the configured default.
    pub inclusion: Option<Inclusion>,
    /// Name of a custom codec registered with the mapper.
    pub codec: Option<&'static str>,
    /// Constructor or setter binding.
    pub binding: Binding,
    /// The nested object's properties are merged into the parent namespace.
    pub unwrapped: bool,
    /// A string-keyed map that collects every key the schema does not know
    /// when reading, and whose entries are written as properties of the
    /// owning object.
    pub any_properties: bool,
    /// Constructor argument index, assigned when the slot is added to a schema.
    pub arg: Option<usize>,
}

impl PropertySlot {
    /// Create a constructor-bound, non-nullable slot.
    pub fn new(name: &'static str, ty: PropertyType) -> Self {
        Self {
            name,
            wire_name: None,
            aliases: Vec::new(),
            ty,
            nullable: false,
            required: false,
            has_default: false,
            ignore: IgnorePolicy::None,
            inclusion: None,
            codec: None,
            binding: Binding::Constructor,
            unwrapped: false,
            any_properties: false,
            arg: None,
        }
    }

    /// Override the wire name.
    pub fn wire_name(mut self, name: &'static str) -> Self {
        self.wire_name = Some(name);
        self
    }

    /// Accept an extra name when decoding.
    pub fn alias(mut self, name: &'static str) -> Self {
        self.aliases.push(name);
        self
    }

    /// Mark the slot as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the slot as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the slot as having an instantiator-provided default.
    pub fn default_value(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Set the ignore policy.
    pub fn ignore(mut self, policy: IgnorePolicy) -> Self {
        self.ignore = policy;
        self
    }

    /// Set the inclusion policy.
    pub fn include(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    /// Use a named custom codec for this property.
    pub fn codec(mut self, name: &'static str) -> Self {
        self.codec = Some(name);
        self
    }

    /// Bind through a setter instead of the constructor.
    pub fn setter(mut self) -> Self {
        self.binding = Binding::Setter;
        self
    }

    /// Merge the nested object's properties into the parent.
    pub fn unwrapped(mut self) -> Self {
        self.unwrapped = true;
        self
    }

    /// Collect unknown keys into this map slot, and write its entries flat.
    pub fn any_properties(mut self) -> Self {
        self.any_properties = true;
        self
    }

    /// Whether the slot must receive a non-null value from the input.
    ///
    /// Primitives are not required by default: when absent they are zero-filled
    /// unless the mapper is configured to fail on null primitives.
    pub fn is_required(&self) -> bool {
        self.required || (!self.nullable && !self.has_default && !self.ty.is_primitive())
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PropertySlot");
        s.field("name", &self.name).field("ty", &self.ty);
        if let Some(wire) = self.wire_name {
            s.field("wire_name", &wire);
        }
        if self.nullable {
            s.field("nullable", &true);
        }
        if self.unwrapped {
            s.field("unwrapped", &true);
        }
        if self.any_properties {
            s.field("any_properties", &true);
        }
        s.field("binding", &self.binding).finish_non_exhaustive()
    }
}
