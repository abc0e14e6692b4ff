//! Object deserializer engine.
//!
//! Each object is read in a fixed sequence of states, logged at debug level:
//!
//! ```text
//! Start -> ReadingDiscriminator? -> BindingProperties -> ValidatingRequired -> Complete
//!                                                                           \-> Failed
//! ```
//!
//! Values are collected per resolved property, validated, and only then
//! handed to the type's instantiator, so a failure never leaves a partially
//! built object behind.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use tessel_core::{
    Arguments, BindError, Binding, Bound, DiscriminatorPlacement, Introspected, PropertySlot,
    PropertyType, SchemaKind, SchemaProvider, SubtypeInfo, TypeKey, TypeSchema,
};
use tessel_path::Path;

use crate::polymorphic::{family, resolve_for_decode};
use crate::reference::{PendingLink, ResolvedReferences};
use crate::{
    CodecRegistry, CycleMode, Decoder, Result, SerdeConfig, SerdeError, SerdeErrorKind,
    TokenKind, debug, trace,
};

/// Minimum similarity for an unknown key to be offered a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    ReadingDiscriminator,
    BindingProperties,
    ValidatingRequired,
    Complete,
    Failed,
}

/// What the input supplied for one resolved property.
enum Incoming {
    Absent,
    Value(Bound),
    /// A back-reference to an object still being decoded; linked at the end.
    Deferred,
}

/// Pulls values out of a [`Decoder`] according to their schemas.
pub(crate) struct Deserializer<'m, 's, 'de> {
    provider: &'m dyn SchemaProvider,
    config: &'m SerdeConfig,
    codecs: &'m CodecRegistry,
    refs: ResolvedReferences,
    dec: Decoder<'s, 'de>,
}

impl<'m, 's, 'de> Deserializer<'m, 's, 'de> {
    pub fn new(
        provider: &'m dyn SchemaProvider,
        config: &'m SerdeConfig,
        codecs: &'m CodecRegistry,
        dec: Decoder<'s, 'de>,
    ) -> Self {
        Self {
            provider,
            config,
            codecs,
            refs: ResolvedReferences::default(),
            dec,
        }
    }

    /// Read one root value of type `ty`, check that nothing follows it, and
    /// link deferred back-references.
    pub fn deserialize_root(mut self, ty: &PropertyType) -> Result<Bound> {
        let bound = self.read_value(ty, None, None)?;
        self.dec.finish()?;
        self.link_pending()?;
        Ok(bound)
    }

    fn error(&self, kind: SerdeErrorKind) -> SerdeError {
        self.dec.error(kind)
    }

    fn schema(&self, key: TypeKey) -> Result<&'m Arc<TypeSchema>> {
        self.provider
            .schema(key)
            .ok_or_else(|| self.error(SerdeErrorKind::UnknownType(key)))
    }

    fn bind_error(&self, err: BindError) -> SerdeError {
        self.error(SerdeErrorKind::Bind(err))
    }

    fn transition(&self, schema: &TypeSchema, state: State) {
        debug!(
            type_name = schema.type_name,
            path = %self.dec.path(),
            ?state,
            "deserializer state"
        );
        let _ = (schema, state);
    }

    /// Read one value of type `ty`.
    ///
    /// `codec` is a property-level codec; `external` is a discriminator value
    /// read by the parent for an externally discriminated family.
    fn read_value(
        &mut self,
        ty: &PropertyType,
        codec: Option<&'static str>,
        external: Option<String>,
    ) -> Result<Bound> {
        if let Some(name) = codec {
            return self.with_codec(name);
        }
        if self.dec.decode_null()? {
            return Ok(Bound::Null);
        }
        let bound = match ty {
            PropertyType::Bool => Bound::Bool(self.dec.decode_bool()?),
            PropertyType::I8 => Bound::I64(self.dec.decode_i8()?.into()),
            PropertyType::I16 => Bound::I64(self.dec.decode_i16()?.into()),
            PropertyType::I32 => Bound::I64(self.dec.decode_i32()?.into()),
            PropertyType::I64 => Bound::I64(self.dec.decode_i64()?),
            PropertyType::U8 => Bound::U64(self.dec.decode_u8()?.into()),
            PropertyType::U16 => Bound::U64(self.dec.decode_u16()?.into()),
            PropertyType::U32 => Bound::U64(self.dec.decode_u32()?.into()),
            PropertyType::U64 => Bound::U64(self.dec.decode_u64()?),
            PropertyType::F32 => Bound::F64(self.dec.decode_f32()?.into()),
            PropertyType::F64 => Bound::F64(self.dec.decode_f64()?),
            PropertyType::Char => Bound::Char(self.dec.decode_char()?),
            PropertyType::Str => Bound::Str(self.dec.decode_string()?.into_owned()),
            PropertyType::Decimal => Bound::Decimal(self.dec.decode_decimal()?),
            PropertyType::Any => self.dec.decode_value()?.into_bound(),
            PropertyType::Seq(element) => {
                self.dec.begin_array()?;
                let mut items = Vec::new();
                while self.dec.has_next_element()? {
                    items.push(self.read_value(element, None, None)?);
                }
                self.dec.finish_structure()?;
                Bound::Seq(items)
            }
            PropertyType::Map(element) => {
                self.dec.begin_object()?;
                let mut entries = Vec::new();
                while let Some(key) = self.dec.next_key()? {
                    let value = self.read_value(element, None, None)?;
                    entries.push((key.into_owned(), value));
                }
                self.dec.finish_structure()?;
                Bound::Map(entries)
            }
            PropertyType::Object(key) => Bound::Object(self.read_object(*key, external)?),
            PropertyType::Shared(key) => {
                if let Some(target) = self.peek_back_reference()? {
                    return self
                        .refs
                        .get(&target)
                        .map(Bound::Shared)
                        .ok_or_else(|| self.unresolvable(target));
                }
                self.read_shared(*key, external)?
            }
        };
        Ok(bound)
    }

    fn with_codec(&mut self, name: &'static str) -> Result<Bound> {
        let codecs = self.codecs;
        let codec = codecs.get(name).ok_or_else(|| {
            self.error(SerdeErrorKind::Codec {
                name,
                message: "no codec registered under this name".into(),
            })
        })?;
        codec.decode(&mut self.dec)
    }

    fn unresolvable(&self, target: String) -> SerdeError {
        self.error(SerdeErrorKind::UnresolvableReference { target })
    }

    /// If back-references are enabled and the next value is a reference
    /// marker, consume it and return its target.
    fn peek_back_reference(&mut self) -> Result<Option<String>> {
        if self.config.cycles != CycleMode::BackReference
            || self.dec.peek_kind()? != TokenKind::BeginObject
        {
            return Ok(None);
        }
        self.dec.start_buffering()?;
        self.dec.begin_object()?;
        let is_reference = self
            .dec
            .next_key()?
            .is_some_and(|key| key == self.config.reference_key);
        if !is_reference || self.dec.peek_kind()? != TokenKind::String {
            self.dec.replay()?;
            return Ok(None);
        }
        let target = self.dec.decode_string()?.into_owned();
        if self.dec.next_key()?.is_some() {
            self.dec.replay()?;
            return Ok(None);
        }
        self.dec.finish_structure()?;
        self.dec.discard();
        debug!(%target, "back-reference");
        Ok(Some(target))
    }

    fn read_shared(&mut self, key: TypeKey, external: Option<String>) -> Result<Bound> {
        let path = self.dec.path().clone();
        self.refs.start(&path);
        match self.read_object(key, external) {
            Ok(object) => {
                let shared: Arc<dyn Introspected> = Arc::from(object);
                self.refs.complete(&path, shared.clone());
                Ok(Bound::Shared(shared))
            }
            Err(err) => {
                self.refs.abandon(&path);
                Err(err)
            }
        }
    }

    fn read_object(
        &mut self,
        key: TypeKey,
        external: Option<String>,
    ) -> Result<Box<dyn Introspected>> {
        let schema = self.schema(key)?;
        self.transition(schema, State::Start);
        if let Some(name) = schema.codec {
            return match self.with_codec(name)? {
                Bound::Object(object) => Ok(object),
                other => Err(self.error(SerdeErrorKind::Codec {
                    name,
                    message: alloc::format!("expected an object, got {}", other.kind_name()),
                })),
            };
        }
        let result = match &schema.subtypes {
            Some(info) => self.read_polymorphic(schema, info, external),
            None => self.read_concrete(schema, None),
        };
        if result.is_err() {
            self.transition(schema, State::Failed);
        }
        result
    }

    fn read_polymorphic(
        &mut self,
        family_schema: &TypeSchema,
        info: &SubtypeInfo,
        external: Option<String>,
    ) -> Result<Box<dyn Introspected>> {
        self.transition(family_schema, State::ReadingDiscriminator);
        let family_key = family_schema.key;
        match (&info.placement, external) {
            (DiscriminatorPlacement::External, Some(value)) => {
                let concrete = self.resolve(family_key, &value)?;
                self.read_concrete(&concrete, None)
            }
            (DiscriminatorPlacement::Property | DiscriminatorPlacement::External, _) => {
                let value = self.scan_discriminator(family_key, info.discriminator_name)?;
                let concrete = self.resolve(family_key, &value)?;
                let skip = (!info.visible).then_some(info.discriminator_name);
                self.read_concrete(&concrete, skip)
            }
            (DiscriminatorPlacement::WrapperObject, _) => {
                self.dec.begin_object()?;
                let Some(value) = self.dec.next_key()? else {
                    return Err(self.error(SerdeErrorKind::MissingDiscriminator {
                        family: family_key,
                        name: info.discriminator_name,
                    }));
                };
                let concrete = self.resolve(family_key, &value)?;
                let object = self.read_concrete(&concrete, None)?;
                if let Some(extra) = self.dec.next_key()? {
                    return Err(self.error(SerdeErrorKind::MalformedInput {
                        message: alloc::format!(
                            "wrapper object for `{family_key}` has a second key `{extra}`"
                        ),
                    }));
                }
                self.dec.finish_structure()?;
                Ok(object)
            }
        }
    }

    fn resolve(&self, family_key: TypeKey, value: &str) -> Result<Arc<TypeSchema>> {
        let schema =
            resolve_for_decode(self.provider, family_key, value).map_err(|kind| self.error(kind))?;
        debug!(family = %family_key, %value, subtype = %schema.key, "resolved subtype");
        Ok(schema)
    }

    /// Read a discriminator value: a string, or an integer rendered as one.
    fn read_discriminator(&mut self) -> Result<String> {
        match self.dec.peek_kind()? {
            TokenKind::Number => Ok(self.dec.decode_i64()?.to_string()),
            _ => Ok(self.dec.decode_string()?.into_owned()),
        }
    }

    /// Find the discriminator among the keys of the object that comes next,
    /// then rewind so the object can be read from the start.
    fn scan_discriminator(&mut self, family_key: TypeKey, name: &'static str) -> Result<String> {
        self.dec.start_buffering()?;
        self.dec.begin_object()?;
        let mut found = None;
        while let Some(key) = self.dec.next_key()? {
            if key == name {
                found = Some(self.read_discriminator()?);
                break;
            }
            self.dec.skip_value()?;
        }
        self.dec.replay()?;
        found.ok_or_else(|| {
            self.error(SerdeErrorKind::MissingDiscriminator {
                family: family_key,
                name,
            })
        })
    }

    /// Look ahead among the remaining siblings for an external discriminator.
    /// The decoder is positioned on the value of the property that needs it.
    fn scan_external(&mut self, family_key: TypeKey, name: &'static str) -> Result<String> {
        self.dec.start_buffering()?;
        self.dec.skip_value()?;
        let mut found = None;
        while let Some(key) = self.dec.next_key()? {
            if key == name {
                found = Some(self.read_discriminator()?);
                break;
            }
            self.dec.skip_value()?;
        }
        self.dec.replay()?;
        found.ok_or_else(|| {
            self.error(SerdeErrorKind::MissingDiscriminator {
                family: family_key,
                name,
            })
        })
    }

    fn read_concrete(
        &mut self,
        schema: &TypeSchema,
        skip: Option<&'static str>,
    ) -> Result<Box<dyn Introspected>> {
        match schema.kind {
            SchemaKind::Abstract => Err(self.bind_error(BindError::NotInstantiable {
                type_key: schema.key,
            })),
            SchemaKind::Value => self.read_value_type(schema),
            SchemaKind::Object => self.read_bean(schema, skip),
        }
    }

    fn read_value_type(&mut self, schema: &TypeSchema) -> Result<Box<dyn Introspected>> {
        let Some(slot) = schema.slots.first() else {
            return Err(self.error(SerdeErrorKind::UnknownType(schema.key)));
        };
        self.transition(schema, State::BindingProperties);
        let value = self.read_value(&slot.ty, slot.codec, None)?;
        self.transition(schema, State::ValidatingRequired);
        let value = self.validate(schema.type_name, slot, 0, Incoming::Value(value))?;
        let object = self.assemble(schema, vec![(&[0usize][..], value)])?;
        self.transition(schema, State::Complete);
        Ok(object)
    }

    fn read_bean(
        &mut self,
        schema: &TypeSchema,
        skip: Option<&'static str>,
    ) -> Result<Box<dyn Introspected>> {
        let object_path = self.dec.path().clone();
        let properties = schema.properties();
        let mut incoming: Vec<Incoming> = properties.iter().map(|_| Incoming::Absent).collect();
        let mut external_seen: BTreeMap<&'static str, String> = BTreeMap::new();
        let external_names = self.external_names(schema);
        let any = schema.any_slot().and_then(|index| {
            let slot = schema.slots.get(index)?;
            match &slot.ty {
                PropertyType::Map(element) if !slot.ignore.skips_deserialize() => {
                    Some((index, &**element))
                }
                _ => None,
            }
        });
        let mut extra: Vec<(String, Bound)> = Vec::new();

        self.dec.begin_object()?;
        self.transition(schema, State::BindingProperties);
        while let Some(key) = self.dec.next_key()? {
            if skip == Some(key.as_ref()) {
                self.dec.skip_value()?;
                continue;
            }
            let Some(index) = schema.property_index(&key) else {
                if let Some(name) = external_names.iter().copied().find(|name| *name == key) {
                    let value = self.read_discriminator()?;
                    external_seen.insert(name, value);
                    continue;
                }
                if let Some((_, element)) = any {
                    let key = key.into_owned();
                    trace!(%key, "collecting unknown property");
                    let value = self.read_value(element, None, None)?;
                    extra.push((key, value));
                    continue;
                }
                if self.config.strict {
                    return Err(self.unknown_property(schema, key));
                }
                self.dec.skip_value()?;
                continue;
            };
            let prop = &properties[index];
            let slot = &prop.slot;
            if slot.ignore.skips_deserialize() {
                self.dec.skip_value()?;
                continue;
            }
            if let PropertyType::Shared(_) = slot.ty
                && let Some(target) = self.peek_back_reference()?
            {
                incoming[index] = self.bind_reference(schema, &object_path, prop, target)?;
                continue;
            }
            let external = match self.external_family(&slot.ty) {
                Some((family_key, name)) => {
                    if self.dec.peek_kind()? == TokenKind::Null {
                        None
                    } else if let Some(value) = external_seen.get(name) {
                        Some(value.clone())
                    } else {
                        Some(self.scan_external(family_key, name)?)
                    }
                }
                None => None,
            };
            incoming[index] = Incoming::Value(self.read_value(&slot.ty, slot.codec, external)?);
        }
        self.dec.finish_structure()?;

        self.transition(schema, State::ValidatingRequired);
        let any_route = any.map(|(index, _)| [index]);
        let mut values = Vec::with_capacity(properties.len() + 1);
        for (prop, input) in properties.iter().zip(incoming) {
            let owner = self.leaf_owner(schema, &prop.route)?;
            let leaf = prop.route.last().copied().unwrap_or_default();
            let value = self.validate(owner.type_name, &prop.slot, leaf, input)?;
            values.push((prop.route.as_slice(), value));
        }
        if let Some(route) = &any_route {
            values.push((route.as_slice(), Some(Bound::Map(extra))));
        }
        let object = self.assemble(schema, values)?;
        self.transition(schema, State::Complete);
        Ok(object)
    }

    fn bind_reference(
        &mut self,
        schema: &TypeSchema,
        object_path: &Path,
        prop: &tessel_core::ResolvedProperty,
        target: String,
    ) -> Result<Incoming> {
        if let Some(shared) = self.refs.get(&target) {
            return Ok(Incoming::Value(Bound::Shared(shared)));
        }
        let linkable = prop.route.len() == 1 && prop.slot.binding == Binding::Setter;
        if linkable && self.refs.is_in_progress(&target) {
            self.refs.defer(PendingLink {
                owner: object_path.to_string(),
                slot: prop.route[0],
                target,
            });
            return Ok(Incoming::Deferred);
        }
        Err(self.unresolvable(target))
    }

    fn external_family(&self, ty: &PropertyType) -> Option<(TypeKey, &'static str)> {
        let (schema, info) = family(self.provider, ty.object_key()?)?;
        (info.placement == DiscriminatorPlacement::External)
            .then_some((schema.key, info.discriminator_name))
    }

    fn external_names(&self, schema: &TypeSchema) -> Vec<&'static str> {
        schema
            .properties()
            .iter()
            .filter_map(|prop| self.external_family(&prop.slot.ty))
            .map(|(_, name)| name)
            .collect()
    }

    fn unknown_property(&self, schema: &TypeSchema, key: Cow<'_, str>) -> SerdeError {
        let mut best: Option<(&str, f64)> = None;
        for prop in schema.properties() {
            let score = strsim::jaro_winkler(&key, &prop.wire_name);
            if score > SUGGESTION_THRESHOLD && best.is_none_or(|(_, best)| score > best) {
                best = Some((&prop.wire_name, score));
            }
        }
        self.error(SerdeErrorKind::UnknownProperty {
            type_name: schema.type_name,
            key: key.into_owned(),
            suggestion: best.map(|(name, _)| name.to_string()),
        })
    }

    /// Schema that declares the leaf slot of `route`.
    fn leaf_owner<'a>(&self, schema: &'a TypeSchema, route: &[usize]) -> Result<&'a TypeSchema>
    where
        'm: 'a,
    {
        let mut owner: &'a TypeSchema = schema;
        for index in route.iter().take(route.len().saturating_sub(1)) {
            let key = owner
                .slots
                .get(*index)
                .and_then(|slot| slot.ty.object_key())
                .ok_or_else(|| self.error(SerdeErrorKind::UnknownType(owner.key)))?;
            owner = self.schema(key)?;
        }
        Ok(owner)
    }

    /// Turn what the input supplied for a slot into the constructor or setter
    /// argument, or `None` to let the instantiator apply its default.
    fn validate(
        &self,
        type_name: &'static str,
        slot: &PropertySlot,
        index: usize,
        input: Incoming,
    ) -> Result<Option<Bound>> {
        let missing = || {
            self.error(SerdeErrorKind::MissingRequiredProperty {
                type_name,
                property: slot.name,
                index,
            })
        };
        let is_null = match input {
            Incoming::Deferred => return Ok(None),
            Incoming::Value(Bound::Null) => true,
            Incoming::Value(value) => return Ok(Some(value)),
            Incoming::Absent => false,
        };
        if slot.ignore.skips_deserialize() {
            return Ok(None);
        }
        if slot.required {
            return Err(missing());
        }
        if slot.nullable {
            return Ok(if !is_null && slot.has_default {
                None
            } else {
                Some(Bound::Null)
            });
        }
        if slot.has_default {
            return Ok(None);
        }
        if let Some(zero) = slot.ty.zero_value() {
            if self.config.fail_on_null_for_primitives {
                return Err(missing());
            }
            return Ok(Some(zero));
        }
        Err(missing())
    }

    /// Instantiate `schema` from validated values keyed by route. Routes
    /// longer than one step belong to unwrapped slots and are regrouped into
    /// the nested object first.
    fn assemble(
        &self,
        schema: &TypeSchema,
        values: Vec<(&[usize], Option<Bound>)>,
    ) -> Result<Box<dyn Introspected>> {
        let mut args = Arguments::new(schema.key, schema.constructor_names());
        let mut setters = Vec::new();
        let mut nested: BTreeMap<usize, Vec<(&[usize], Option<Bound>)>> = BTreeMap::new();
        let mut direct = Vec::new();

        for (route, value) in values {
            match route {
                [index] => direct.push((*index, value)),
                [index, rest @ ..] => nested.entry(*index).or_default().push((rest, value)),
                [] => {}
            }
        }
        for (index, group) in nested {
            let Some(slot) = schema.slots.get(index) else {
                continue;
            };
            let value = if slot.nullable && group.iter().all(|(_, value)| value.is_none()) {
                Bound::Null
            } else {
                let key = slot
                    .ty
                    .object_key()
                    .ok_or_else(|| self.error(SerdeErrorKind::UnknownType(schema.key)))?;
                let child = self.schema(key)?;
                Bound::Object(self.assemble(child, group)?)
            };
            direct.push((index, Some(value)));
        }
        for (index, value) in direct {
            let (Some(slot), Some(value)) = (schema.slots.get(index), value) else {
                continue;
            };
            match (slot.binding, slot.arg) {
                (Binding::Constructor, Some(arg)) => args.set(arg, Some(value)),
                _ => setters.push((index, value)),
            }
        }

        let instantiate = schema.instantiate.ok_or_else(|| {
            self.bind_error(BindError::NotInstantiable {
                type_key: schema.key,
            })
        })?;
        let mut object = instantiate(&mut args).map_err(|err| self.bind_error(err))?;
        for (index, value) in setters {
            object
                .set_property(index, value)
                .map_err(|err| self.bind_error(err))?;
        }
        Ok(object)
    }

    fn link_pending(&mut self) -> Result<()> {
        for link in self.refs.take_pending() {
            let at = || Path::parse(&link.owner).unwrap_or_default();
            let owner = self.refs.get(&link.owner).ok_or_else(|| {
                SerdeError::new(
                    SerdeErrorKind::UnresolvableReference {
                        target: link.target.clone(),
                    },
                    at(),
                )
            })?;
            let target = self.refs.get(&link.target).ok_or_else(|| {
                SerdeError::new(
                    SerdeErrorKind::UnresolvableReference {
                        target: link.target.clone(),
                    },
                    at(),
                )
            })?;
            debug!(owner = %link.owner, target = %link.target, "linking back-reference");
            owner
                .link(link.slot, target)
                .map_err(|err| SerdeError::new(SerdeErrorKind::Bind(err), at()))?;
        }
        Ok(())
    }
}
