//! Module cache and resolver.
//!
//! Annotations are cached per uri and revalidated on the "shallow identity,
//! deep validity" rule: a cached annotation is reusable when its own source
//! version is unchanged and every import still resolves to the identical
//! annotation object it was built against, transitively. Anything else is
//! recomputed; unchanged modules keep their `Arc` identity so importers can
//! revalidate by pointer comparison alone.

use crate::annotate::annotate_module;
use crate::annotation::Annotation;
use crate::host::AnnotationHost;
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, trace};
use yal_types::{ModuleKey, TypeStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The uri does not exist on the host.
    NotFound(String),
    /// The uri is already being annotated somewhere up the import stack.
    Recursive(String),
}

pub struct ModuleCache<'h> {
    host: &'h dyn AnnotationHost,
    types: &'h TypeStore,
    entries: DashMap<String, Arc<Annotation>>,
    /// `ModuleKey` registry; `TypeData::Module` values point here.
    registry: DashMap<ModuleKey, Arc<Annotation>>,
    next_key: AtomicU32,
}

impl<'h> ModuleCache<'h> {
    pub fn new(host: &'h dyn AnnotationHost, types: &'h TypeStore) -> Self {
        Self {
            host,
            types,
            entries: DashMap::new(),
            registry: DashMap::new(),
            next_key: AtomicU32::new(0),
        }
    }

    pub fn host(&self) -> &'h dyn AnnotationHost {
        self.host
    }

    pub fn types(&self) -> &'h TypeStore {
        self.types
    }

    pub(crate) fn alloc_module_key(&self) -> ModuleKey {
        ModuleKey(self.next_key.fetch_add(1, Ordering::SeqCst))
    }

    /// Annotation behind a `TypeData::Module` type.
    pub fn lookup_module(&self, key: ModuleKey) -> Option<Arc<Annotation>> {
        self.registry.get(&key).map(|entry| entry.clone())
    }

    /// Cached annotation for a uri, if any, valid or not.
    pub fn cached(&self, uri: &str) -> Option<Arc<Annotation>> {
        self.entries.get(uri).map(|entry| entry.clone())
    }

    /// Annotate a module, reusing the cache when valid. `stack` is the chain
    /// of uris currently being annotated; a uri already on it means a
    /// recursive import, reported to the caller rather than recursed into.
    pub fn get_annotation(
        &self,
        uri: &str,
        stack: &mut Vec<String>,
    ) -> Result<Arc<Annotation>, ImportError> {
        if stack.iter().any(|entry| entry == uri) {
            return Err(ImportError::Recursive(uri.to_string()));
        }
        if let Some(cached) = self.cached(uri) {
            let mut visited = FxHashSet::default();
            if self.is_valid(&cached, &mut visited) {
                trace!(uri, "annotation cache hit");
                return Ok(cached);
            }
        }

        let module = self
            .host
            .load(uri)
            .ok_or_else(|| ImportError::NotFound(uri.to_string()))?;
        debug!(uri, version = module.version, "annotating module");
        stack.push(uri.to_string());
        let annotation = annotate_module(self, &module, stack);
        stack.pop();

        let annotation = Arc::new(annotation);
        self.registry.insert(annotation.module_key, annotation.clone());
        self.entries.insert(uri.to_string(), annotation.clone());
        Ok(annotation)
    }

    /// Shallow identity, deep validity: own version unchanged, and every
    /// import still the identical object and itself valid. Cycles in the
    /// walk are treated as valid; the member that actually changed fails
    /// the check on its own version.
    fn is_valid(&self, annotation: &Arc<Annotation>, visited: &mut FxHashSet<String>) -> bool {
        if !visited.insert(annotation.uri.clone()) {
            return true;
        }
        if self.host.version(&annotation.uri) != Some(annotation.version) {
            return false;
        }
        for (dep_uri, dep_annotation) in &annotation.imports {
            let current = match self.cached(dep_uri) {
                Some(current) => current,
                None => return false,
            };
            if !Arc::ptr_eq(&current, dep_annotation) {
                return false;
            }
            if !self.is_valid(&current, visited) {
                return false;
            }
        }
        true
    }

    /// Drop every cached annotation. Callers clearing the `TypeStore` as
    /// well must do so before re-annotating, never between.
    pub fn clear(&self) {
        self.entries.clear();
        self.registry.clear();
    }

    /// Annotate a batch of modules, checking the cancellation flag between
    /// files. Returns how many were processed before completion or
    /// cancellation. Unresolvable uris are counted and skipped.
    pub fn index_workspace(&self, uris: &[String], cancel: &AtomicBool) -> usize {
        let mut processed = 0;
        for uri in uris {
            if cancel.load(Ordering::Relaxed) {
                debug!(processed, "workspace index cancelled");
                break;
            }
            let mut stack = Vec::new();
            if let Err(err) = self.get_annotation(uri, &mut stack) {
                debug!(uri, ?err, "skipping unresolvable module");
            }
            processed += 1;
        }
        processed
    }
}
