use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{Arguments, BindError, Introspected, NamingStrategy, PropertySlot};

/// Stable identity of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey(pub &'static str);

impl TypeKey {
    /// The key as a string.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Builds an instance from its constructor arguments.
pub type Instantiator = fn(&mut Arguments) -> Result<Box<dyn Introspected>, BindError>;

/// What kind of type a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// A bean: an object with named properties.
    Object,
    /// The root of a polymorphic family. Never instantiated directly.
    Abstract,
    /// A single-value wrapper written as its only slot, without an enclosing
    /// object (a raw/unwrapped value type such as `Email(String)`).
    Value,
}

/// Where the discriminator of a polymorphic family lives on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscriminatorPlacement {
    /// A sibling property of the object: `{"@type": "circle", "radius": 1}`.
    Property,
    /// An object with a single key naming the subtype:
    /// `{"circle": {"radius": 1}}`.
    WrapperObject,
    /// A property of the *enclosing* object, next to the property holding the
    /// polymorphic value: `{"kind": "circle", "shape": {"radius": 1}}`.
    External,
}

/// Polymorphism metadata attached to an abstract schema.
#[derive(Debug, Clone)]
pub struct SubtypeInfo {
    /// Name of the discriminator property (or external sibling property).
    pub discriminator_name: &'static str,
    /// Placement of the discriminator.
    pub placement: DiscriminatorPlacement,
    /// Registered subtypes with the discriminator values they answer to. The
    /// first value is the one written when encoding.
    pub subtypes: Vec<(crate::TypeKey, Vec<&'static str>)>,
    /// The discriminator is also a regular property of the subtypes and is
    /// bound like any other property when decoding.
    pub visible: bool,
}

impl SubtypeInfo {
    /// Default discriminator property name.
    pub const DEFAULT_DISCRIMINATOR: &'static str = "@type";

    /// A family discriminated by a sibling `@type` property.
    pub fn new() -> Self {
        Self {
            discriminator_name: Self::DEFAULT_DISCRIMINATOR,
            placement: DiscriminatorPlacement::Property,
            subtypes: Vec::new(),
            visible: false,
        }
    }

    /// Use a different discriminator property name.
    pub fn discriminator(mut self, name: &'static str) -> Self {
        self.discriminator_name = name;
        self
    }

    /// Change where the discriminator lives.
    pub fn placement(mut self, placement: DiscriminatorPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Make the discriminator visible to the subtype as a regular property.
    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }

    /// Register a subtype under one or more discriminator values.
    pub fn subtype(mut self, key: crate::TypeKey, names: &[&'static str]) -> Self {
        self.subtypes.push((key, names.to_vec()));
        self
    }
}

impl Default for SubtypeInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A property as the engine sees it after registration: wire name resolved
/// and unwrapped slots expanded into their parent.
#[derive(Debug, Clone)]
pub struct ResolvedProperty {
    /// The name used on the wire.
    pub wire_name: String,
    /// Slot indices from the owning schema down through unwrapped slots. A
    /// plain property has a route of length one.
    pub route: Vec<usize>,
    /// The leaf slot.
    pub slot: PropertySlot,
}

/// Static per-type descriptor.
///
/// Schemas are assembled with [`TypeSchema::object`], [`TypeSchema::abstract_type`]
/// or [`TypeSchema::value`], handed to a
/// [`SchemaRegistryBuilder`](crate::SchemaRegistryBuilder), and become
/// immutable once the registry is built.
#[derive(Clone)]
pub struct TypeSchema {
    /// Registry key.
    pub key: TypeKey,
    /// Human-readable type name used in errors.
    pub type_name: &'static str,
    /// Kind of type.
    pub kind: SchemaKind,
    /// Declared slots, in wire order.
    pub slots: Vec<PropertySlot>,
    /// Number of constructor parameters.
    pub constructor_arity: usize,
    /// Family metadata, for abstract schemas.
    pub subtypes: Option<SubtypeInfo>,
    /// Supertypes, nearest first. Used to pick the most specific registered
    /// subtype when encoding a value whose exact type is not registered in
    /// the declared family.
    pub supertypes: Vec<TypeKey>,
    /// Type-level naming strategy, overriding the registry default.
    pub naming: Option<NamingStrategy>,
    /// Type-level custom codec.
    pub codec: Option<&'static str>,
    /// Builds instances from constructor arguments.
    pub instantiate: Option<Instantiator>,

    pub(crate) properties: Vec<ResolvedProperty>,
    pub(crate) lookup: BTreeMap<String, usize>,
    pub(crate) any_slot: Option<usize>,
}

impl TypeSchema {
    fn with_kind(key: TypeKey, type_name: &'static str, kind: SchemaKind) -> Self {
        Self {
            key,
            type_name,
            kind,
            slots: Vec::new(),
            constructor_arity: 0,
            subtypes: None,
            supertypes: Vec::new(),
            naming: None,
            codec: None,
            instantiate: None,
            properties: Vec::new(),
            lookup: BTreeMap::new(),
            any_slot: None,
        }
    }

    /// Start an object schema.
    pub fn object(key: TypeKey, type_name: &'static str) -> Self {
        Self::with_kind(key, type_name, SchemaKind::Object)
    }

    /// Start an abstract family root.
    pub fn abstract_type(key: TypeKey, type_name: &'static str, subtypes: SubtypeInfo) -> Self {
        let mut schema = Self::with_kind(key, type_name, SchemaKind::Abstract);
        schema.subtypes = Some(subtypes);
        schema
    }

    /// Start a single-value wrapper schema around `slot`.
    pub fn value(key: TypeKey, type_name: &'static str, slot: PropertySlot) -> Self {
        Self::with_kind(key, type_name, SchemaKind::Value).slot(slot)
    }

    /// Append a slot. Constructor-bound slots get the next argument index.
    pub fn slot(mut self, mut slot: PropertySlot) -> Self {
        if slot.binding == crate::Binding::Constructor {
            slot.arg = Some(self.constructor_arity);
            self.constructor_arity += 1;
        } else {
            slot.arg = None;
        }
        self.slots.push(slot);
        self
    }

    /// Set the instantiator.
    pub fn instantiate(mut self, f: Instantiator) -> Self {
        self.instantiate = Some(f);
        self
    }

    /// Declare a supertype (nearest first).
    pub fn extends(mut self, key: TypeKey) -> Self {
        self.supertypes.push(key);
        self
    }

    /// Override the naming strategy for this type.
    pub fn naming(mut self, strategy: NamingStrategy) -> Self {
        self.naming = Some(strategy);
        self
    }

    /// Use a custom codec for every occurrence of this type.
    pub fn codec(mut self, name: &'static str) -> Self {
        self.codec = Some(name);
        self
    }

    /// Properties in wire order, with unwrapped slots expanded.
    ///
    /// Empty until the schema has been registered.
    pub fn properties(&self) -> &[ResolvedProperty] {
        &self.properties
    }

    /// Find a property index by wire name or alias.
    pub fn property_index(&self, wire_name: &str) -> Option<usize> {
        self.lookup.get(wire_name).copied()
    }

    /// Index of the slot that collects unknown properties, if any.
    pub const fn any_slot(&self) -> Option<usize> {
        self.any_slot
    }

    /// Constructor parameter names, in argument order.
    pub fn constructor_names(&self) -> Vec<&'static str> {
        let mut names = alloc::vec![""; self.constructor_arity];
        for slot in &self.slots {
            if let Some(arg) = slot.arg {
                names[arg] = slot.name;
            }
        }
        names
    }

    /// Whether this schema is the root of a polymorphic family.
    pub const fn is_polymorphic(&self) -> bool {
        self.subtypes.is_some()
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("slots", &self.slots)
            .field("subtypes", &self.subtypes)
            .finish_non_exhaustive()
    }
}
