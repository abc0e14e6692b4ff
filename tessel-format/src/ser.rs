//! Object serializer engine.

use alloc::string::ToString;
use alloc::sync::Arc;

use tessel_core::{
    DiscriminatorPlacement, Introspected, PropertyFilter, PropertyType, PropertyValue,
    ResolvedProperty, SchemaKind, SchemaProvider, TypeKey, TypeSchema,
};

use crate::polymorphic::{family, resolve_for_encode};
use crate::reference::{Identity, ReferenceTable, Tracked};
use crate::{CodecRegistry, Encoder, Result, SerdeConfig, SerdeErrorKind, debug};

/// Walks a value through its schema and pushes it into an [`Encoder`].
pub(crate) struct Serializer<'m, 's> {
    provider: &'m dyn SchemaProvider,
    config: &'m SerdeConfig,
    filter: Option<&'m dyn PropertyFilter>,
    codecs: &'m CodecRegistry,
    refs: ReferenceTable,
    enc: Encoder<'s>,
}

/// Follow `route` from `owner` through unwrapped slots and hand the leaf
/// owner and value to `f`. Returns `None` when an intermediate value is
/// missing.
fn visit_route<R>(
    owner: &dyn Introspected,
    route: &[usize],
    f: impl FnOnce(&dyn Introspected, PropertyValue<'_>) -> R,
) -> Option<R> {
    match route {
        [] => None,
        [last] => Some(f(owner, owner.property(*last))),
        [first, rest @ ..] => match owner.property(*first) {
            PropertyValue::Object(inner) => visit_route(inner, rest, f),
            PropertyValue::Shared(inner) => visit_route(&*inner, rest, f),
            _ => None,
        },
    }
}

impl<'m, 's> Serializer<'m, 's> {
    pub fn new(
        provider: &'m dyn SchemaProvider,
        config: &'m SerdeConfig,
        filter: Option<&'m dyn PropertyFilter>,
        codecs: &'m CodecRegistry,
        enc: Encoder<'s>,
    ) -> Self {
        Self {
            provider,
            config,
            filter,
            codecs,
            refs: ReferenceTable::new(config.cycles),
            enc,
        }
    }

    /// Write `value` as the root, declared as `declared` (its own type when
    /// `None`).
    pub fn serialize_root(
        mut self,
        value: &dyn Introspected,
        declared: Option<TypeKey>,
    ) -> Result<()> {
        let id = Identity::of(value);
        let root = self.enc.value_path();
        self.refs.enter(id, &root);
        let result = self.write_object(value, declared, false);
        self.refs.release();
        result?;
        self.enc.finish()
    }

    fn schema(&self, key: TypeKey) -> Result<&'m Arc<TypeSchema>> {
        self.provider
            .schema(key)
            .ok_or_else(|| self.enc.error(SerdeErrorKind::UnknownType(key)))
    }

    fn with_codec(&mut self, name: &'static str, value: &PropertyValue<'_>) -> Result<()> {
        let codecs = self.codecs;
        let codec = codecs.get(name).ok_or_else(|| {
            self.enc.error(SerdeErrorKind::Codec {
                name,
                message: "no codec registered under this name".into(),
            })
        })?;
        codec.encode(value, &mut self.enc)
    }

    /// Write an object. `external` is set when the parent already wrote the
    /// discriminator as a sibling property.
    fn write_object(
        &mut self,
        value: &dyn Introspected,
        declared: Option<TypeKey>,
        external: bool,
    ) -> Result<()> {
        let schema = self.schema(value.type_key())?;
        if let Some(name) = schema.codec {
            return self.with_codec(name, &PropertyValue::Object(value));
        }
        let provider = self.provider;
        let Some((family_schema, info)) = declared.and_then(|key| family(provider, key)) else {
            return self.write_body(value, schema, None);
        };
        let discriminator = resolve_for_encode(provider, family_schema.key, schema.key)
            .map_err(|kind| self.enc.error(kind))?;
        debug!(
            family = %family_schema.key,
            runtime = %schema.key,
            %discriminator,
            "resolved subtype"
        );
        match info.placement {
            DiscriminatorPlacement::External if external => self.write_body(value, schema, None),
            DiscriminatorPlacement::Property | DiscriminatorPlacement::External => {
                self.enc.begin_object()?;
                self.enc.key(info.discriminator_name)?;
                self.enc.encode_str(&discriminator)?;
                self.write_properties(value, schema, Some(info.discriminator_name))?;
                self.enc.end_object()
            }
            DiscriminatorPlacement::WrapperObject => {
                self.enc.begin_object()?;
                self.enc.key(&discriminator)?;
                self.write_body(value, schema, None)?;
                self.enc.end_object()
            }
        }
    }

    fn write_body(
        &mut self,
        value: &dyn Introspected,
        schema: &TypeSchema,
        skip: Option<&str>,
    ) -> Result<()> {
        if schema.kind == SchemaKind::Value {
            let Some(slot) = schema.slots.first() else {
                return Err(self.enc.error(SerdeErrorKind::UnknownType(schema.key)));
            };
            return self.write_value(&slot.ty, value.property(0), slot.codec, false);
        }
        self.enc.begin_object()?;
        self.write_properties(value, schema, skip)?;
        self.enc.end_object()
    }

    fn write_properties(
        &mut self,
        value: &dyn Introspected,
        schema: &TypeSchema,
        skip: Option<&str>,
    ) -> Result<()> {
        for prop in schema.properties() {
            if skip == Some(prop.wire_name.as_str()) || prop.slot.ignore.skips_serialize() {
                continue;
            }
            if let Some(result) =
                visit_route(value, &prop.route, |owner, pv| self.write_property(owner, prop, pv))
            {
                result?;
            }
        }
        if let Some(index) = schema.any_slot() {
            self.write_any_properties(value, schema, index, skip)?;
        }
        Ok(())
    }

    /// Entries of the any-properties map, flattened into the current object.
    fn write_any_properties(
        &mut self,
        value: &dyn Introspected,
        schema: &TypeSchema,
        index: usize,
        skip: Option<&str>,
    ) -> Result<()> {
        let Some(slot) = schema.slots.get(index) else {
            return Ok(());
        };
        if slot.ignore.skips_serialize() {
            return Ok(());
        }
        let element = match &slot.ty {
            PropertyType::Map(element) => &**element,
            _ => &PropertyType::Any,
        };
        if let PropertyValue::Map(entries) = value.property(index) {
            for (key, item) in entries {
                if skip == Some(key.as_ref()) || schema.property_index(&key).is_some() {
                    continue;
                }
                self.enc.key(&key)?;
                self.write_value(element, item, None, false)?;
            }
        }
        Ok(())
    }

    fn write_property(
        &mut self,
        owner: &dyn Introspected,
        prop: &ResolvedProperty,
        value: PropertyValue<'_>,
    ) -> Result<()> {
        let slot = &prop.slot;
        let inclusion = slot.inclusion.unwrap_or(self.config.inclusion);
        if !inclusion.includes(&value) {
            return Ok(());
        }
        if let Some(filter) = self.filter
            && !filter.should_include(owner, slot, &value)
        {
            return Ok(());
        }
        let mut external = false;
        if let Some((family_key, name)) = self.external_discriminator(&slot.ty) {
            let runtime = match &value {
                PropertyValue::Object(inner) => Some(inner.type_key()),
                PropertyValue::Shared(inner) => Some(inner.type_key()),
                _ => None,
            };
            if let Some(runtime) = runtime {
                let discriminator = resolve_for_encode(self.provider, family_key, runtime)
                    .map_err(|kind| self.enc.error(kind))?;
                self.enc.key(name)?;
                self.enc.encode_str(&discriminator)?;
                external = true;
            }
        }
        self.enc.key(&prop.wire_name)?;
        self.write_value(&slot.ty, value, slot.codec, external)
    }

    /// Family key and discriminator name, when `ty` is a family that keeps its
    /// discriminator beside the owning property.
    fn external_discriminator(&self, ty: &PropertyType) -> Option<(TypeKey, &'static str)> {
        let (schema, info) = family(self.provider, ty.object_key()?)?;
        (info.placement == DiscriminatorPlacement::External)
            .then_some((schema.key, info.discriminator_name))
    }

    fn write_value(
        &mut self,
        ty: &PropertyType,
        value: PropertyValue<'_>,
        codec: Option<&'static str>,
        external: bool,
    ) -> Result<()> {
        if let Some(name) = codec {
            return self.with_codec(name, &value);
        }
        match value {
            PropertyValue::Absent | PropertyValue::Null => self.enc.encode_null(),
            PropertyValue::Bool(b) => self.enc.encode_bool(b),
            PropertyValue::I64(n) => self.enc.encode_i64(n),
            PropertyValue::U64(n) => self.enc.encode_u64(n),
            PropertyValue::F64(f) => self.enc.encode_f64(f),
            PropertyValue::Char(c) => self.enc.encode_char(c),
            PropertyValue::Str(s) => self.enc.encode_str(&s),
            PropertyValue::Decimal(d) => self.enc.encode_decimal(d),
            PropertyValue::Seq(items) => {
                let element = match ty {
                    PropertyType::Seq(element) => &**element,
                    _ => &PropertyType::Any,
                };
                self.enc.begin_array()?;
                for item in items {
                    self.write_value(element, item, None, false)?;
                }
                self.enc.end_array()
            }
            PropertyValue::Map(entries) => {
                let element = match ty {
                    PropertyType::Map(element) => &**element,
                    _ => &PropertyType::Any,
                };
                self.enc.begin_object()?;
                for (key, item) in entries {
                    self.enc.key(&key)?;
                    self.write_value(element, item, None, false)?;
                }
                self.enc.end_object()
            }
            PropertyValue::Object(inner) => self.write_object(inner, ty.object_key(), external),
            PropertyValue::Shared(inner) => self.write_shared(ty, &inner, external),
        }
    }

    fn write_shared(
        &mut self,
        ty: &PropertyType,
        inner: &Arc<dyn Introspected>,
        external: bool,
    ) -> Result<()> {
        let id = Identity::of(&**inner);
        let path = self.enc.value_path();
        match self.refs.enter(id, &path) {
            Tracked::New => {
                let result = self.write_object(&**inner, ty.object_key(), external);
                self.refs.leave(id);
                result
            }
            Tracked::Seen(first) => {
                debug!(%first, %path, "back-reference");
                self.enc.encode_back_reference(&first)
            }
            Tracked::Cycle(first) => Err(self.enc.error(SerdeErrorKind::CircularReference {
                first: first.to_string(),
            })),
        }
    }
}
