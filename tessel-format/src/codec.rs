//! User-supplied codecs.
//!
//! A codec replaces the built-in handling of one property (when named on the
//! slot) or of every value of a type (when named on the schema). When both
//! apply, the property-level codec is used.

use alloc::sync::Arc;
use std::collections::HashMap;

use tessel_core::{Bound, PropertyValue};

use crate::{Decoder, Encoder, Result};

/// Custom encoding for a property or type.
pub trait Codec: Send + Sync {
    /// Write `value`. For a type-level codec the value is
    /// [`PropertyValue::Object`] holding the instance.
    fn encode(&self, value: &PropertyValue<'_>, encoder: &mut Encoder<'_>) -> Result<()>;

    /// Read one value. A type-level codec returns [`Bound::Object`].
    fn decode(&self, decoder: &mut Decoder<'_, '_>) -> Result<Bound>;
}

/// Codecs by name.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec under `name`, replacing any previous one.
    pub fn register(mut self, name: &'static str, codec: impl Codec + 'static) -> Self {
        self.insert(name, Arc::new(codec));
        self
    }

    /// Register a shared codec under `name`.
    pub fn insert(&mut self, name: &'static str, codec: Arc<dyn Codec>) {
        self.codecs.insert(name, codec);
    }

    /// Look up a codec.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(name)
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl core::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: alloc::vec::Vec<_> = self.codecs.keys().collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}
