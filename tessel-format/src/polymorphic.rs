//! Subtype selection for polymorphic families.

use alloc::string::{String, ToString};
use alloc::sync::Arc;

use tessel_core::{SchemaProvider, SubtypeInfo, TypeKey, TypeSchema};

use crate::SerdeErrorKind;

/// Family metadata of `declared`, if it is the root of a polymorphic family.
pub fn family<'r>(
    provider: &'r dyn SchemaProvider,
    declared: TypeKey,
) -> Option<(&'r Arc<TypeSchema>, &'r SubtypeInfo)> {
    let schema = provider.schema(declared)?;
    let info = schema.subtypes.as_ref()?;
    Some((schema, info))
}

/// Discriminator value to write for a value of type `runtime` declared as
/// `family`.
///
/// When `runtime` itself is not a registered member, the nearest registered
/// supertype is used instead.
pub fn resolve_for_encode(
    provider: &dyn SchemaProvider,
    family: TypeKey,
    runtime: TypeKey,
) -> Result<String, SerdeErrorKind> {
    let index = provider
        .discriminators(family)
        .ok_or(SerdeErrorKind::UnknownType(family))?;
    if let Some(value) = index.discriminator(runtime) {
        return Ok(value.to_string());
    }
    let schema = provider
        .schema(runtime)
        .ok_or(SerdeErrorKind::UnknownType(runtime))?;
    schema
        .supertypes
        .iter()
        .find_map(|key| index.discriminator(*key))
        .map(ToString::to_string)
        .ok_or_else(|| SerdeErrorKind::UnknownSubtype {
            family,
            value: runtime.to_string(),
        })
}

/// Schema of the subtype selected by discriminator `value`.
pub fn resolve_for_decode(
    provider: &dyn SchemaProvider,
    family: TypeKey,
    value: &str,
) -> Result<Arc<TypeSchema>, SerdeErrorKind> {
    let index = provider
        .discriminators(family)
        .ok_or(SerdeErrorKind::UnknownType(family))?;
    let key = index
        .subtype(value)
        .ok_or_else(|| SerdeErrorKind::UnknownSubtype {
            family,
            value: value.to_string(),
        })?;
    provider
        .schema(key)
        .cloned()
        .ok_or(SerdeErrorKind::UnknownType(key))
}
