#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

/// A single step in a logical path through an object graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    /// Navigate to a named property (logical name, not wire name)
    Property(String),
    /// Navigate to an array element by index
    Index(usize),
    /// Navigate to a map entry by key
    Key(String),
}

/// A logical path such as `root.items[2].name`.
///
/// Paths are built incrementally while the engine descends into a value and
/// cloned into errors when something fails. They are also used as the
/// identifier of back-references, so two paths compare equal exactly when
/// they render to the same text.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The root path, rendered as `root`.
    pub const fn root() -> Self {
        Self { steps: Vec::new() }
    }

    /// Push a step onto the path.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Push a property step.
    pub fn push_property(&mut self, name: impl Into<String>) {
        self.steps.push(PathStep::Property(name.into()));
    }

    /// Push an index step.
    pub fn push_index(&mut self, index: usize) {
        self.steps.push(PathStep::Index(index));
    }

    /// Pop the last step from the path.
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Replace the index of a trailing [`PathStep::Index`], pushing one if absent.
    pub fn set_last_index(&mut self, index: usize) {
        match self.steps.last_mut() {
            Some(PathStep::Index(i)) => *i = index,
            _ => self.steps.push(PathStep::Index(index)),
        }
    }

    /// Get the steps in this path.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps below the root.
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if this path is the root.
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a new path extended by `step`.
    pub fn join(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.push(step);
        path
    }

    /// Parse a rendered path back into steps.
    ///
    /// This is the inverse of [`Display`](fmt::Display) and is used to resolve
    /// back-references read from the wire. Property names containing `.`, `[`
    /// or `]` cannot be represented and yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix("root")?;
        let mut path = Path::root();
        let mut chars = rest.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            match c {
                '.' => {
                    let mut end = rest.len();
                    while let Some(&(i, c)) = chars.peek() {
                        if c == '.' || c == '[' {
                            end = i;
                            break;
                        }
                        chars.next();
                    }
                    let name = &rest[start + 1..end];
                    if name.is_empty() {
                        return None;
                    }
                    path.push_property(name);
                }
                '[' => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, ']')) => break,
                            Some((_, d)) if d.is_ascii_digit() => digits.push(d),
                            _ => return None,
                        }
                    }
                    path.push_index(digits.parse().ok()?);
                }
                _ => return None,
            }
        }
        Some(path)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for step in &self.steps {
            match step {
                PathStep::Property(name) => {
                    f.write_char('.')?;
                    f.write_str(name)?;
                }
                PathStep::Index(idx) => write!(f, "[{idx}]")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}
