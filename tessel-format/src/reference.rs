//! Object identity tracking for shared and cyclic graphs.
//!
//! Identity is the address of the value behind a `&dyn Introspected`, which
//! for an `Arc` is the address of its allocation. Only the root and values
//! held through [`PropertyType::Shared`](tessel_core::PropertyType::Shared)
//! slots are tracked: values owned by their parent cannot be reached twice.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::{HashMap, HashSet};

use tessel_core::Introspected;
use tessel_path::Path;

use crate::CycleMode;

/// Identity of a value for the duration of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(usize);

impl Identity {
    /// Identity of the value behind `value`.
    pub fn of(value: &dyn Introspected) -> Self {
        Self(core::ptr::from_ref(value).cast::<()>().addr())
    }
}

/// Outcome of [`ReferenceTable::enter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracked {
    /// First visit: write the value in full, then call
    /// [`leave`](ReferenceTable::leave).
    New,
    /// Already written at this path: write a back-reference.
    Seen(Path),
    /// The value is one of its own ancestors and back-references are off.
    Cycle(Path),
}

/// Encode-side identity table, scoped to one root call.
#[derive(Debug)]
pub struct ReferenceTable {
    mode: CycleMode,
    first_seen: HashMap<Identity, Path>,
    active: Vec<(Identity, Path)>,
}

impl ReferenceTable {
    /// An empty table.
    pub fn new(mode: CycleMode) -> Self {
        Self {
            mode,
            first_seen: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Record a visit of `id` at `path`.
    pub fn enter(&mut self, id: Identity, path: &Path) -> Tracked {
        match self.mode {
            CycleMode::BackReference => {
                if let Some(first) = self.first_seen.get(&id) {
                    return Tracked::Seen(first.clone());
                }
                self.first_seen.insert(id, path.clone());
            }
            CycleMode::Fail => {
                if let Some((_, first)) = self.active.iter().find(|(active, _)| *active == id) {
                    return Tracked::Cycle(first.clone());
                }
            }
        }
        self.active.push((id, path.clone()));
        Tracked::New
    }

    /// Finish a visit started with [`Tracked::New`].
    pub fn leave(&mut self, id: Identity) {
        if let Some(pos) = self.active.iter().rposition(|(active, _)| *active == id) {
            self.active.remove(pos);
        }
    }

    /// Number of distinct values written so far (back-reference mode only).
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty() && self.active.is_empty()
    }

    /// Forget everything. Called when the root call returns.
    pub fn release(&mut self) {
        self.first_seen.clear();
        self.active.clear();
    }
}

/// A back-reference to an object still being decoded, to be linked once the
/// whole graph is complete.
#[derive(Debug, Clone)]
pub(crate) struct PendingLink {
    pub owner: String,
    pub slot: usize,
    pub target: String,
}

/// Decode-side table of shared objects, keyed by the rendered path where
/// they were read.
#[derive(Default)]
pub(crate) struct ResolvedReferences {
    completed: HashMap<String, Arc<dyn Introspected>>,
    in_progress: HashSet<String>,
    pending: Vec<PendingLink>,
}

impl ResolvedReferences {
    pub fn start(&mut self, path: &Path) {
        self.in_progress.insert(alloc::string::ToString::to_string(path));
    }

    pub fn complete(&mut self, path: &Path, value: Arc<dyn Introspected>) {
        let key = alloc::string::ToString::to_string(path);
        self.in_progress.remove(&key);
        self.completed.insert(key, value);
    }

    pub fn abandon(&mut self, path: &Path) {
        self.in_progress.remove(&alloc::string::ToString::to_string(path));
    }

    pub fn get(&self, target: &str) -> Option<Arc<dyn Introspected>> {
        self.completed.get(target).cloned()
    }

    pub fn is_in_progress(&self, target: &str) -> bool {
        self.in_progress.contains(target)
    }

    pub fn defer(&mut self, link: PendingLink) {
        self.pending.push(link);
    }

    pub fn take_pending(&mut self) -> Vec<PendingLink> {
        core::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    fn at(name: &str) -> Path {
        let mut path = Path::root();
        path.push_property(name);
        path
    }

    #[test]
    fn back_reference_mode_reports_first_path() {
        let mut table = ReferenceTable::new(CycleMode::BackReference);
        let id = Identity(0x1000);
        assert_eq!(table.enter(id, &at("left")), Tracked::New);
        table.leave(id);
        assert_eq!(table.enter(id, &at("right")), Tracked::Seen(at("left")));
        assert_eq!(table.len(), 1);
        table.release();
        assert!(table.is_empty());
    }

    #[test]
    fn fail_mode_allows_shared_but_acyclic() {
        let mut table = ReferenceTable::new(CycleMode::Fail);
        let id = Identity(0x2000);
        assert_eq!(table.enter(id, &at("left")), Tracked::New);
        table.leave(id);
        assert_eq!(table.enter(id, &at("right")), Tracked::New);
        assert_eq!(
            table.enter(id, &at("right.child")),
            Tracked::Cycle(at("right"))
        );
    }
}
