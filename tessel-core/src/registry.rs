//! Schema registration and build-time validation.
//!
//! All checks that depend only on metadata happen in
//! [`SchemaRegistryBuilder::build`]: duplicate types, unknown references,
//! wire-name collisions (including those introduced by unwrapped
//! properties), recursive unwrapping, and ambiguous discriminators. Once
//! built, a registry is immutable and can be shared across threads.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::collections::HashMap;

use crate::{
    DiscriminatorPlacement, NamingStrategy, PropertyType, ResolvedProperty, SchemaKind, TypeKey,
    TypeSchema,
};

/// Source of schemas for the engine.
pub trait SchemaProvider: Send + Sync {
    /// Look up a schema by key.
    fn schema(&self, key: TypeKey) -> Option<&Arc<TypeSchema>>;

    /// Look up the discriminator index of a polymorphic family.
    fn discriminators(&self, family: TypeKey) -> Option<&DiscriminatorIndex>;
}

/// Maps discriminator values of one family to subtypes and back.
#[derive(Debug, Clone, Default)]
pub struct DiscriminatorIndex {
    by_value: HashMap<String, TypeKey>,
    by_type: HashMap<TypeKey, String>,
}

impl DiscriminatorIndex {
    /// Subtype registered for a discriminator value.
    pub fn subtype(&self, value: &str) -> Option<TypeKey> {
        self.by_value.get(value).copied()
    }

    /// Discriminator value written for a subtype.
    pub fn discriminator(&self, key: TypeKey) -> Option<&str> {
        self.by_type.get(&key).map(String::as_str)
    }

    /// Whether `key` is a registered member of the family.
    pub fn contains(&self, key: TypeKey) -> bool {
        self.by_type.contains_key(&key)
    }

    /// All discriminator values, sorted (for error messages).
    pub fn values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.by_value.keys().map(String::as_str).collect();
        values.sort_unstable();
        values
    }
}

/// Failure detected while building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two schemas with the same key.
    DuplicateType(TypeKey),
    /// A slot, subtype or supertype refers to an unregistered key.
    UnknownType {
        /// The referring type
        owner: TypeKey,
        /// The missing key
        missing: TypeKey,
    },
    /// Two properties of one type resolve to the same wire name.
    NameCollision {
        /// The type
        owner: TypeKey,
        /// The colliding wire name
        wire_name: String,
    },
    /// Two subtypes claim the same discriminator value.
    AmbiguousSchema {
        /// The family
        family: TypeKey,
        /// The contested value
        discriminator: String,
        /// First claimant
        first: TypeKey,
        /// Second claimant
        second: TypeKey,
    },
    /// An unwrapped property eventually unwraps its own type.
    RecursiveUnwrap(TypeKey),
    /// An unwrapped slot does not refer to an object type.
    InvalidUnwrap {
        /// The type
        owner: TypeKey,
        /// The slot
        property: &'static str,
    },
    /// A value schema must have exactly one slot.
    InvalidValueSchema(TypeKey),
    /// An any-properties slot is not a map, is unwrapped, or is not the only
    /// one of its type.
    InvalidAnyProperties {
        /// The type
        owner: TypeKey,
        /// The slot
        property: &'static str,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::DuplicateType(key) => write!(f, "type `{key}` registered twice"),
            SchemaError::UnknownType { owner, missing } => {
                write!(f, "type `{owner}` refers to unregistered type `{missing}`")
            }
            SchemaError::NameCollision { owner, wire_name } => {
                write!(f, "type `{owner}` has two properties named `{wire_name}` on the wire")
            }
            SchemaError::AmbiguousSchema {
                family,
                discriminator,
                first,
                second,
            } => write!(
                f,
                "ambiguous subtypes of `{family}`: `{first}` and `{second}` both claim discriminator `{discriminator}`"
            ),
            SchemaError::RecursiveUnwrap(key) => {
                write!(f, "type `{key}` unwraps itself")
            }
            SchemaError::InvalidUnwrap { owner, property } => {
                write!(f, "`{owner}.{property}` is unwrapped but is not an object")
            }
            SchemaError::InvalidValueSchema(key) => {
                write!(f, "value type `{key}` must have exactly one slot")
            }
            SchemaError::InvalidAnyProperties { owner, property } => write!(
                f,
                "`{owner}.{property}` cannot collect unknown properties: it must be the only such slot and a plain map"
            ),
        }
    }
}

impl core::error::Error for SchemaError {}

/// Collects schemas and validates them into a [`SchemaRegistry`].
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    schemas: Vec<TypeSchema>,
    naming: NamingStrategy,
}

impl SchemaRegistryBuilder {
    /// Default naming strategy for types without their own.
    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Add a schema.
    pub fn register(mut self, schema: TypeSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Add a schema through a mutable reference.
    pub fn add(&mut self, schema: TypeSchema) -> &mut Self {
        self.schemas.push(schema);
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut by_key: BTreeMap<TypeKey, TypeSchema> = BTreeMap::new();
        for schema in self.schemas {
            if by_key.contains_key(&schema.key) {
                return Err(SchemaError::DuplicateType(schema.key));
            }
            by_key.insert(schema.key, schema);
        }

        for schema in by_key.values() {
            check_references(schema, &by_key)?;
            if schema.kind == SchemaKind::Value && schema.slots.len() != 1 {
                return Err(SchemaError::InvalidValueSchema(schema.key));
            }
            any_slot(schema)?;
        }

        let mut families = HashMap::new();
        for schema in by_key.values() {
            if let Some(info) = &schema.subtypes {
                families.insert(schema.key, build_index(schema.key, info)?);
            }
        }

        let mut resolved: BTreeMap<TypeKey, (Vec<ResolvedProperty>, BTreeMap<String, usize>)> =
            BTreeMap::new();
        for schema in by_key.values() {
            let mut properties = Vec::new();
            let mut stack = Vec::new();
            expand(schema, &by_key, self.naming, &mut Vec::new(), &mut stack, &mut properties)?;

            let mut lookup = BTreeMap::new();
            for (index, prop) in properties.iter().enumerate() {
                let names = core::iter::once(prop.wire_name.clone())
                    .chain(prop.slot.aliases.iter().map(|a| a.to_string()));
                for name in names {
                    if lookup.insert(name.clone(), index).is_some() {
                        return Err(SchemaError::NameCollision {
                            owner: schema.key,
                            wire_name: name,
                        });
                    }
                }
            }
            resolved.insert(schema.key, (properties, lookup));
        }

        let mut schemas = HashMap::new();
        for (key, mut schema) in by_key {
            if let Some((properties, lookup)) = resolved.remove(&key) {
                schema.properties = properties;
                schema.lookup = lookup;
            }
            schema.any_slot = any_slot(&schema)?;
            crate::debug!(
                "registered `{}` with {} properties",
                key,
                schema.properties.len()
            );
            schemas.insert(key, Arc::new(schema));
        }

        Ok(SchemaRegistry {
            schemas,
            families,
            naming: self.naming,
        })
    }
}

fn check_references(
    schema: &TypeSchema,
    by_key: &BTreeMap<TypeKey, TypeSchema>,
) -> Result<(), SchemaError> {
    let missing = |missing: TypeKey| SchemaError::UnknownType {
        owner: schema.key,
        missing,
    };

    for slot in &schema.slots {
        let mut ty = &slot.ty;
        while let PropertyType::Seq(inner) | PropertyType::Map(inner) = ty {
            ty = &**inner;
        }
        if let Some(key) = ty.object_key() {
            if !by_key.contains_key(&key) {
                return Err(missing(key));
            }
        }
        if slot.unwrapped && !matches!(slot.ty, PropertyType::Object(_)) {
            return Err(SchemaError::InvalidUnwrap {
                owner: schema.key,
                property: slot.name,
            });
        }
    }
    for key in &schema.supertypes {
        if !by_key.contains_key(key) {
            return Err(missing(*key));
        }
    }
    if let Some(info) = &schema.subtypes {
        for (key, _) in &info.subtypes {
            if !by_key.contains_key(key) {
                return Err(missing(*key));
            }
        }
    }
    Ok(())
}

/// The schema's any-properties slot, checked.
fn any_slot(schema: &TypeSchema) -> Result<Option<usize>, SchemaError> {
    let mut found = None;
    for (index, slot) in schema.slots.iter().enumerate() {
        if !slot.any_properties {
            continue;
        }
        let valid = found.is_none()
            && !slot.unwrapped
            && slot.codec.is_none()
            && schema.kind == SchemaKind::Object
            && matches!(slot.ty, PropertyType::Map(_));
        if !valid {
            return Err(SchemaError::InvalidAnyProperties {
                owner: schema.key,
                property: slot.name,
            });
        }
        found = Some(index);
    }
    Ok(found)
}

fn build_index(
    family: TypeKey,
    info: &crate::SubtypeInfo,
) -> Result<DiscriminatorIndex, SchemaError> {
    let mut index = DiscriminatorIndex::default();
    for (key, names) in &info.subtypes {
        for name in names {
            if let Some(first) = index.by_value.insert(name.to_string(), *key) {
                return Err(SchemaError::AmbiguousSchema {
                    family,
                    discriminator: name.to_string(),
                    first,
                    second: *key,
                });
            }
        }
        if let Some(first_name) = names.first() {
            index.by_type.insert(*key, first_name.to_string());
        }
    }
    if info.placement == DiscriminatorPlacement::WrapperObject && info.visible {
        crate::debug!("family `{}`: visible has no effect on wrapper objects", family);
    }
    Ok(index)
}

/// Append `schema`'s properties to `out`, expanding unwrapped slots in place.
fn expand(
    schema: &TypeSchema,
    by_key: &BTreeMap<TypeKey, TypeSchema>,
    default_naming: NamingStrategy,
    route: &mut Vec<usize>,
    stack: &mut Vec<TypeKey>,
    out: &mut Vec<ResolvedProperty>,
) -> Result<(), SchemaError> {
    if stack.contains(&schema.key) {
        return Err(SchemaError::RecursiveUnwrap(schema.key));
    }
    stack.push(schema.key);
    let naming = schema.naming.unwrap_or(default_naming);

    for (index, slot) in schema.slots.iter().enumerate() {
        if slot.any_properties {
            continue;
        }
        route.push(index);
        match (&slot.ty, slot.unwrapped) {
            (PropertyType::Object(key), true) => {
                let nested = by_key.get(key).ok_or(SchemaError::UnknownType {
                    owner: schema.key,
                    missing: *key,
                })?;
                expand(nested, by_key, default_naming, route, stack, out)?;
            }
            _ => {
                let wire_name = match slot.wire_name {
                    Some(name) => name.to_string(),
                    None => naming.apply(slot.name),
                };
                out.push(ResolvedProperty {
                    wire_name,
                    route: route.clone(),
                    slot: slot.clone(),
                });
            }
        }
        route.pop();
    }

    stack.pop();
    Ok(())
}

/// Immutable set of registered schemas.
pub struct SchemaRegistry {
    schemas: HashMap<TypeKey, Arc<TypeSchema>>,
    families: HashMap<TypeKey, DiscriminatorIndex>,
    naming: NamingStrategy,
}

impl SchemaRegistry {
    /// Start building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// The default naming strategy the registry was built with.
    pub const fn naming(&self) -> NamingStrategy {
        self.naming
    }

    /// Resolve the same schemas again under another default naming strategy.
    ///
    /// Types with their own strategy and slots with an explicit wire name
    /// keep their names. Fails when the new names collide.
    pub fn renamed(&self, naming: NamingStrategy) -> Result<SchemaRegistry, SchemaError> {
        let mut builder = SchemaRegistry::builder().naming(naming);
        for key in self.keys() {
            if let Some(schema) = self.schemas.get(&key) {
                builder.add(TypeSchema::clone(schema));
            }
        }
        builder.build()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<TypeKey> {
        let set: BTreeSet<TypeKey> = self.schemas.keys().copied().collect();
        set.into_iter().collect()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn schema(&self, key: TypeKey) -> Option<&Arc<TypeSchema>> {
        self.schemas.get(&key)
    }

    fn discriminators(&self, family: TypeKey) -> Option<&DiscriminatorIndex> {
        self.families.get(&family)
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("types", &self.keys())
            .field("naming", &self.naming)
            .finish()
    }
}
