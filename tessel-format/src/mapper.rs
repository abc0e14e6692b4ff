use alloc::boxed::Box;
use alloc::sync::Arc;

use tessel_core::{
    Bound, FromBound, HasSchema, Introspected, PropertyFilter, PropertyType, SchemaError,
    SchemaRegistry, TypeKey,
};
use tessel_path::Path;

use crate::de::Deserializer;
use crate::ser::Serializer;
use crate::{
    Codec, CodecRegistry, Decoder, Encoder, Result, SerdeConfig, SerdeError, SerdeErrorKind,
    TokenSink, TokenSource, Value, debug,
};

/// Entry point: serializes and deserializes registered types.
///
/// A mapper is immutable once configured and can be shared between threads.
/// Every call gets its own decoder or encoder state and reference table.
///
/// ```
/// use std::sync::Arc;
/// use tessel_core::SchemaRegistry;
/// use tessel_format::{Mapper, SerdeConfig, TokenBuffer, Value};
///
/// let registry = Arc::new(SchemaRegistry::builder().build().unwrap());
/// let mapper = Mapper::new(registry, SerdeConfig::default()).unwrap();
/// let mut buffer = TokenBuffer::new();
/// mapper.serialize_value(&Value::from("hi"), &mut buffer).unwrap();
/// assert_eq!(mapper.deserialize_value(&mut buffer).unwrap(), Value::from("hi"));
/// ```
#[derive(Clone)]
pub struct Mapper {
    registry: Arc<SchemaRegistry>,
    config: SerdeConfig,
    filter: Option<Arc<dyn PropertyFilter>>,
    codecs: CodecRegistry,
}

impl Mapper {
    /// Create a mapper over a built registry.
    ///
    /// When the configuration names a default naming strategy other than the
    /// registry's, wire names are resolved again under it; this fails if the
    /// new names collide.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        config: SerdeConfig,
    ) -> core::result::Result<Self, SchemaError> {
        let registry = match config.naming {
            Some(naming) if naming != registry.naming() => {
                debug!(?naming, "renaming registry for mapper");
                Arc::new(registry.renamed(naming)?)
            }
            _ => registry,
        };
        Ok(Self {
            registry,
            config,
            filter: None,
            codecs: CodecRegistry::new(),
        })
    }

    /// Consult `filter` for every property written.
    pub fn with_filter(mut self, filter: impl PropertyFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Use these codecs for properties and types that name one.
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Register a single codec.
    pub fn with_codec(mut self, name: &'static str, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(name, Arc::new(codec));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SerdeConfig {
        &self.config
    }

    /// The schema registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Serialize `value` using its own schema.
    pub fn serialize(&self, value: &dyn Introspected, sink: &mut dyn TokenSink) -> Result<()> {
        self.serialize_root(value, None, sink)
    }

    /// Serialize `value` as a member of the polymorphic family `declared`,
    /// writing its discriminator.
    pub fn serialize_as(
        &self,
        value: &dyn Introspected,
        declared: TypeKey,
        sink: &mut dyn TokenSink,
    ) -> Result<()> {
        self.serialize_root(value, Some(declared), sink)
    }

    fn serialize_root(
        &self,
        value: &dyn Introspected,
        declared: Option<TypeKey>,
        sink: &mut dyn TokenSink,
    ) -> Result<()> {
        debug!(type_key = %value.type_key(), "serialize");
        let enc = Encoder::new(sink, &self.config);
        Serializer::new(
            &*self.registry,
            &self.config,
            self.filter.as_deref(),
            &self.codecs,
            enc,
        )
        .serialize_root(value, declared)
    }

    /// Write a [`Value`] tree.
    pub fn serialize_value(&self, value: &Value, sink: &mut dyn TokenSink) -> Result<()> {
        let mut enc = Encoder::new(sink, &self.config);
        enc.encode_value(value)?;
        enc.finish()
    }

    fn deserialize_root<'de>(
        &self,
        ty: &PropertyType,
        source: &mut dyn TokenSource<'de>,
    ) -> Result<Bound> {
        debug!(?ty, "deserialize");
        let dec = Decoder::new(source, &self.config);
        Deserializer::new(&*self.registry, &self.config, &self.codecs, dec).deserialize_root(ty)
    }

    /// Read one `T`.
    pub fn deserialize<'de, T: HasSchema>(&self, source: &mut dyn TokenSource<'de>) -> Result<T> {
        let bound = self.deserialize_root(&PropertyType::Object(T::TYPE_KEY), source)?;
        let boxed = Box::<T>::from_bound(not_null(bound)?).map_err(bind_error)?;
        Ok(*boxed)
    }

    /// Read one `T` as a shared root. Back-references to the root (and
    /// cycles through setter-bound slots) resolve to the returned `Arc`.
    pub fn deserialize_shared<'de, T: HasSchema>(
        &self,
        source: &mut dyn TokenSource<'de>,
    ) -> Result<Arc<T>> {
        let bound = self.deserialize_root(&PropertyType::Shared(T::TYPE_KEY), source)?;
        Arc::<T>::from_bound(not_null(bound)?).map_err(bind_error)
    }

    /// Read one value of the registered type `key`. For a polymorphic family
    /// the result is the selected subtype.
    pub fn deserialize_dyn<'de>(
        &self,
        key: TypeKey,
        source: &mut dyn TokenSource<'de>,
    ) -> Result<Box<dyn Introspected>> {
        let bound = self.deserialize_root(&PropertyType::Object(key), source)?;
        Box::<dyn Introspected>::from_bound(not_null(bound)?).map_err(bind_error)
    }

    /// Read one value without a schema.
    pub fn deserialize_value<'de>(&self, source: &mut dyn TokenSource<'de>) -> Result<Value> {
        let mut dec = Decoder::new(source, &self.config);
        let value = dec.decode_value()?;
        dec.finish()?;
        Ok(value)
    }
}

fn not_null(bound: Bound) -> Result<Bound> {
    match bound {
        Bound::Null => Err(SerdeError::mismatch("object", "null", Path::root())),
        other => Ok(other),
    }
}

fn bind_error(err: tessel_core::BindError) -> SerdeError {
    SerdeError::new(SerdeErrorKind::Bind(err), Path::root())
}

impl core::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.config)
            .field("filter", &self.filter.is_some())
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}
