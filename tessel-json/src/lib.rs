#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

/// Trace-level logging macro that forwards to `tracing::trace!` when tracing is enabled.
#[cfg(any(test, feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when tracing is disabled).
#[cfg(not(any(test, feature = "tracing")))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Debug-level logging macro that forwards to `tracing::debug!` when tracing is enabled.
#[cfg(any(test, feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when tracing is disabled).
#[cfg(not(any(test, feature = "tracing")))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use {debug, trace};

mod sink;
mod source;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

pub use sink::{JsonSink, SerializeOptions};
pub use source::JsonSource;

use tessel_core::{HasSchema, Introspected, TypeKey};
use tessel_format::{Mapper, Result, Value};

/// Serialize `value` to compact JSON.
pub fn to_string(mapper: &Mapper, value: &dyn Introspected) -> Result<String> {
    to_string_with_options(mapper, value, SerializeOptions::default())
}

/// Serialize `value` to indented JSON.
pub fn to_string_pretty(mapper: &Mapper, value: &dyn Introspected) -> Result<String> {
    to_string_with_options(mapper, value, SerializeOptions::default().pretty())
}

/// Serialize `value` with custom output options.
pub fn to_string_with_options(
    mapper: &Mapper,
    value: &dyn Introspected,
    options: SerializeOptions,
) -> Result<String> {
    let mut sink = JsonSink::with_options(options);
    mapper.serialize(value, &mut sink)?;
    debug!(len = sink.as_str().len(), "wrote json");
    Ok(sink.finish())
}

/// Serialize `value` as a member of the polymorphic family `declared`.
pub fn to_string_as(mapper: &Mapper, value: &dyn Introspected, declared: TypeKey) -> Result<String> {
    let mut sink = JsonSink::new();
    mapper.serialize_as(value, declared, &mut sink)?;
    Ok(sink.finish())
}

/// Serialize an untyped [`Value`] tree.
pub fn value_to_string(mapper: &Mapper, value: &Value) -> Result<String> {
    let mut sink = JsonSink::new();
    mapper.serialize_value(value, &mut sink)?;
    Ok(sink.finish())
}

/// Deserialize a `T` from JSON text.
///
/// ```ignore
/// let point: Point = tessel_json::from_str(&mapper, "[2,1]")?;
/// ```
pub fn from_str<T: HasSchema>(mapper: &Mapper, input: &str) -> Result<T> {
    mapper.deserialize(&mut JsonSource::new(input))
}

/// Deserialize a shared `T`, so that back-references to the root resolve.
pub fn from_str_shared<T: HasSchema>(mapper: &Mapper, input: &str) -> Result<Arc<T>> {
    mapper.deserialize_shared(&mut JsonSource::new(input))
}

/// Deserialize a value of the registered type `key`.
pub fn from_str_dyn(mapper: &Mapper, key: TypeKey, input: &str) -> Result<Box<dyn Introspected>> {
    mapper.deserialize_dyn(key, &mut JsonSource::new(input))
}

/// Parse JSON text into an untyped [`Value`] tree.
pub fn value_from_str(mapper: &Mapper, input: &str) -> Result<Value> {
    mapper.deserialize_value(&mut JsonSource::new(input))
}
