//! Identifier interning.
//!
//! Identifiers are deduplicated process-wide into `Atom`s so that name
//! comparison everywhere in the compiler is a `u32` comparison. The tables
//! are append-only and safe to share across the analysis pipeline.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Interned identifier handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(pub u32);

/// String interner with `&self` interning.
pub struct Interner {
    map: DashMap<Arc<str>, Atom, FxBuildHasher>,
    strings: DashMap<Atom, Arc<str>, FxBuildHasher>,
    next: AtomicU32,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(FxBuildHasher),
            strings: DashMap::with_hasher(FxBuildHasher),
            next: AtomicU32::new(0),
        }
    }

    pub fn intern(&self, text: &str) -> Atom {
        if let Some(existing) = self.map.get(text) {
            return *existing;
        }
        let arc: Arc<str> = Arc::from(text);
        match self.map.entry(arc.clone()) {
            Entry::Occupied(occupied) => *occupied.get(),
            Entry::Vacant(vacant) => {
                let atom = Atom(self.next.fetch_add(1, Ordering::SeqCst));
                self.strings.insert(atom, arc);
                vacant.insert(atom);
                atom
            }
        }
    }

    /// Resolve an atom back to its text. Atoms only come from `intern`, so a
    /// miss is an internal invariant violation.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        debug_assert!(self.strings.contains_key(&atom), "unknown atom {atom:?}");
        self.strings
            .get(&atom)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| Arc::from(""))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
