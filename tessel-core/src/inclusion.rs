use crate::{Introspected, PropertySlot, PropertyValue};

/// When a property is written during serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusion {
    /// Always written, `null` included.
    #[default]
    Always,
    /// Never written.
    Never,
    /// Written unless the value is `null` or absent.
    NonNull,
    /// Written unless the value is absent. `null` is still written.
    NonAbsent,
    /// Written unless the value is `null`, absent, or empty (`""`, `[]`, `{}`).
    NonEmpty,
    /// Written unless the value equals its type's default (`0`, `false`,
    /// `""`, empty collections, `null`).
    NonDefault,
}

impl Inclusion {
    /// Decide whether `value` is written.
    pub fn includes(self, value: &PropertyValue<'_>) -> bool {
        match self {
            Inclusion::Always => true,
            Inclusion::Never => false,
            Inclusion::NonNull => !value.is_null(),
            Inclusion::NonAbsent => !matches!(value, PropertyValue::Absent),
            Inclusion::NonEmpty => !value.is_empty(),
            Inclusion::NonDefault => !value.is_default(),
        }
    }
}

/// Caller-supplied dynamic filter, consulted after the static inclusion
/// policy for every (bean, property, value) triple.
///
/// The bean is passed so a filter can look at sibling properties; for example
/// "write `name` only when `preferredName` is absent".
pub trait PropertyFilter: Send + Sync {
    /// Return `false` to suppress the property.
    fn should_include(
        &self,
        bean: &dyn Introspected,
        slot: &PropertySlot,
        value: &PropertyValue<'_>,
    ) -> bool;
}

impl<F> PropertyFilter for F
where
    F: Fn(&dyn Introspected, &PropertySlot, &PropertyValue<'_>) -> bool + Send + Sync,
{
    fn should_include(
        &self,
        bean: &dyn Introspected,
        slot: &PropertySlot,
        value: &PropertyValue<'_>,
    ) -> bool {
        self(bean, slot, value)
    }
}
