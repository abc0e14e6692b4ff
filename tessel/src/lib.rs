#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use tessel_core::*;
pub use tessel_format::*;

/// JSON adapter.
#[cfg(feature = "json")]
pub use tessel_json as json;

/// Logical paths used in error messages.
pub use tessel_path as path;
