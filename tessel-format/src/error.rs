use alloc::string::String;
use core::fmt;

use tessel_core::{BindError, TypeKey};
use tessel_path::Path;

use crate::FormatError;

/// What went wrong during a serialize or deserialize call.
#[derive(Debug, Clone, PartialEq)]
pub enum SerdeErrorKind {
    /// The token stream violates structure rules, or the format adapter
    /// rejected its input.
    MalformedInput {
        /// Description of the problem
        message: String,
    },
    /// The next token does not fit the requested type.
    TypeMismatch {
        /// What the engine asked for
        expected: &'static str,
        /// What it found
        got: String,
    },
    /// A number does not fit the target type.
    NumberOutOfRange {
        /// The number, rendered
        value: String,
        /// Target type
        target: &'static str,
    },
    /// A number would lose information when converted.
    PrecisionLoss {
        /// The number, rendered
        value: String,
        /// Target type
        target: &'static str,
    },
    /// The discriminator names no registered subtype, or a runtime type is
    /// not a member of the declared family.
    UnknownSubtype {
        /// The polymorphic family
        family: TypeKey,
        /// The discriminator value or runtime type
        value: String,
    },
    /// A polymorphic value carries no discriminator.
    MissingDiscriminator {
        /// The polymorphic family
        family: TypeKey,
        /// The expected discriminator key
        name: &'static str,
    },
    /// A required property is absent or null.
    MissingRequiredProperty {
        /// Type being built
        type_name: &'static str,
        /// Logical property name
        property: &'static str,
        /// Slot index in the type's schema
        index: usize,
    },
    /// Strict mode: the input has a key the type does not declare.
    UnknownProperty {
        /// Type being built
        type_name: &'static str,
        /// The unknown key
        key: String,
        /// Closest declared wire name, if any is close enough
        suggestion: Option<String>,
    },
    /// A back-reference points at nothing decoded so far.
    UnresolvableReference {
        /// The reference target as written
        target: String,
    },
    /// The graph contains a cycle and back-references are disabled.
    CircularReference {
        /// Path where the object was first entered
        first: String,
    },
    /// Nesting exceeds the configured maximum.
    DepthLimitExceeded {
        /// The configured maximum
        max_depth: usize,
    },
    /// A buffering window grew past its bound.
    LookaheadExceeded {
        /// The configured bound
        max_tokens: usize,
    },
    /// A type refers to a schema the registry does not have.
    UnknownType(TypeKey),
    /// A custom codec failed, or no codec is registered under the name.
    Codec {
        /// Codec name
        name: &'static str,
        /// Description of the problem
        message: String,
    },
    /// Generated binding code rejected a value.
    Bind(BindError),
    /// The sink failed to write.
    Sink(FormatError),
}

impl fmt::Display for SerdeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerdeErrorKind::MalformedInput { message } => write!(f, "malformed input: {message}"),
            SerdeErrorKind::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            SerdeErrorKind::NumberOutOfRange { value, target } => {
                write!(f, "number {value} out of range for {target}")
            }
            SerdeErrorKind::PrecisionLoss { value, target } => {
                write!(f, "number {value} cannot be represented exactly as {target}")
            }
            SerdeErrorKind::UnknownSubtype { family, value } => {
                write!(f, "`{value}` is not a known subtype of `{family}`")
            }
            SerdeErrorKind::MissingDiscriminator { family, name } => {
                write!(f, "missing discriminator `{name}` for `{family}`")
            }
            SerdeErrorKind::MissingRequiredProperty {
                type_name,
                property,
                index,
            } => write!(
                f,
                "missing required property `{property}` (slot {index}) of `{type_name}`"
            ),
            SerdeErrorKind::UnknownProperty {
                type_name,
                key,
                suggestion,
            } => {
                write!(f, "unknown property `{key}` for `{type_name}`")?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean `{suggestion}`?)")?;
                }
                Ok(())
            }
            SerdeErrorKind::UnresolvableReference { target } => {
                write!(f, "reference to `{target}` cannot be resolved")
            }
            SerdeErrorKind::CircularReference { first } => {
                write!(f, "circular reference to the object at `{first}`")
            }
            SerdeErrorKind::DepthLimitExceeded { max_depth } => {
                write!(f, "nesting deeper than {max_depth}")
            }
            SerdeErrorKind::LookaheadExceeded { max_tokens } => {
                write!(f, "lookahead exceeded {max_tokens} tokens")
            }
            SerdeErrorKind::UnknownType(key) => write!(f, "no schema registered for `{key}`"),
            SerdeErrorKind::Codec { name, message } => write!(f, "codec `{name}`: {message}"),
            SerdeErrorKind::Bind(err) => write!(f, "{err}"),
            SerdeErrorKind::Sink(err) => write!(f, "write failed: {err}"),
        }
    }
}

/// Error returned by the engine, with the logical path where it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct SerdeError {
    /// What went wrong.
    pub kind: SerdeErrorKind,
    /// Where it went wrong.
    pub path: Path,
}

impl SerdeError {
    /// Attach a path to an error kind.
    pub fn new(kind: SerdeErrorKind, path: Path) -> Self {
        Self { kind, path }
    }

    /// Shorthand for [`SerdeErrorKind::MalformedInput`].
    pub fn malformed(message: impl Into<String>, path: Path) -> Self {
        Self::new(
            SerdeErrorKind::MalformedInput {
                message: message.into(),
            },
            path,
        )
    }

    /// Shorthand for [`SerdeErrorKind::TypeMismatch`].
    pub fn mismatch(expected: &'static str, got: impl Into<String>, path: Path) -> Self {
        Self::new(
            SerdeErrorKind::TypeMismatch {
                expected,
                got: got.into(),
            },
            path,
        )
    }

    /// Shorthand for [`SerdeErrorKind::Codec`], for use inside custom codecs.
    pub fn codec(name: &'static str, message: impl Into<String>, path: Path) -> Self {
        Self::new(
            SerdeErrorKind::Codec {
                name,
                message: message.into(),
            },
            path,
        )
    }
}

impl fmt::Display for SerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.path)
    }
}

impl core::error::Error for SerdeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            SerdeErrorKind::Bind(err) => Some(err),
            SerdeErrorKind::Sink(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T, E = SerdeError> = core::result::Result<T, E>;
