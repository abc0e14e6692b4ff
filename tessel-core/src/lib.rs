#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

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
pub(crate) use debug;

mod bind;
mod inclusion;
mod introspect;
pub mod naming;
mod registry;
mod schema;
mod slot;

pub use bind::{Arguments, BindError, Bound, FromBound, downcast_ref};
pub use inclusion::{Inclusion, PropertyFilter};
pub use introspect::{AsAny, HasSchema, Introspected, PropertyValue, ToProperty};
pub use naming::NamingStrategy;
pub use registry::{
    DiscriminatorIndex, SchemaError, SchemaProvider, SchemaRegistry, SchemaRegistryBuilder,
};
pub use schema::{
    DiscriminatorPlacement, Instantiator, ResolvedProperty, SchemaKind, SubtypeInfo, TypeKey,
    TypeSchema,
};
pub use slot::{Binding, IgnorePolicy, PropertySlot, PropertyType};
