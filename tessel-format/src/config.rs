use tessel_core::{Inclusion, NamingStrategy};

/// What the encoder does when it meets an object it is already writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMode {
    /// Re-entering an active ancestor is a
    /// [`CircularReference`](crate::SerdeErrorKind::CircularReference).
    /// Shared but acyclic objects are written in full each time.
    #[default]
    Fail,
    /// Every repeat visit of a shared object is written as a back-reference
    /// to the path where it was first written.
    BackReference,
}

/// Engine configuration, fixed for the lifetime of a [`Mapper`](crate::Mapper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerdeConfig {
    /// Maximum nesting of objects and arrays, on both sides.
    pub max_depth: usize,
    /// Reject unknown properties instead of skipping them.
    pub strict: bool,
    /// Treat an absent or `null` primitive as a missing required property
    /// instead of filling in its zero value.
    pub fail_on_null_for_primitives: bool,
    /// Naming strategy for types that do not declare one. `None` keeps the
    /// strategy the registry was built with.
    pub naming: Option<NamingStrategy>,
    /// Cycle handling on encode, and whether back-references are accepted on
    /// decode.
    pub cycles: CycleMode,
    /// Inclusion for properties that do not declare one.
    pub inclusion: Inclusion,
    /// Bound on tokens held by one buffering window.
    pub max_lookahead_tokens: usize,
    /// Key of the single-entry object that marks a back-reference.
    pub reference_key: &'static str,
}

impl SerdeConfig {
    /// Default maximum nesting depth.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;
    /// Default lookahead bound.
    pub const DEFAULT_MAX_LOOKAHEAD: usize = 4096;
    /// Default back-reference key.
    pub const DEFAULT_REFERENCE_KEY: &'static str = "@ref";

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reject unknown properties.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Fail instead of zero-filling missing primitives.
    pub fn with_fail_on_null_for_primitives(mut self, fail: bool) -> Self {
        self.fail_on_null_for_primitives = fail;
        self
    }

    /// Set the default naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Set the cycle mode.
    pub fn with_cycles(mut self, cycles: CycleMode) -> Self {
        self.cycles = cycles;
        self
    }

    /// Set the default inclusion.
    pub fn with_inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = inclusion;
        self
    }

    /// Set the lookahead bound.
    pub fn with_max_lookahead_tokens(mut self, max: usize) -> Self {
        self.max_lookahead_tokens = max;
        self
    }

    /// Set the back-reference key.
    pub fn with_reference_key(mut self, key: &'static str) -> Self {
        self.reference_key = key;
        self
    }
}

impl Default for SerdeConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            strict: false,
            fail_on_null_for_primitives: false,
            naming: None,
            cycles: CycleMode::Fail,
            inclusion: Inclusion::Always,
            max_lookahead_tokens: Self::DEFAULT_MAX_LOOKAHEAD,
            reference_key: Self::DEFAULT_REFERENCE_KEY,
        }
    }
}
