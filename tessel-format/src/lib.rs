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

mod buffer;
mod codec;
mod config;
mod de;
pub mod decoder;
pub mod encoder;
mod error;
mod mapper;
pub mod polymorphic;
pub mod reference;
mod ser;
mod stream;
mod token;
mod value;

pub use buffer::TokenBuffer;
pub use codec::{Codec, CodecRegistry};
pub use config::{CycleMode, SerdeConfig};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Result, SerdeError, SerdeErrorKind};
pub use mapper::Mapper;
pub use stream::{FormatError, TokenSink, TokenSource};
pub use token::{ScalarValue, Token, TokenKind};
pub use value::Value;

pub use tessel_path::{Path, PathStep};
