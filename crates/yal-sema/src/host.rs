//! Host boundary: where modules come from.
//!
//! The annotator never touches the filesystem. Everything it needs from the
//! outside world goes through `AnnotationHost`: existence checks, parsed
//! sources, and version numbers for cache validation. `MemoryHost` is the
//! in-process implementation used by tooling and tests.

use dashmap::DashMap;
use yal_ast::SourceModule;

pub trait AnnotationHost: Send + Sync {
    fn exists(&self, uri: &str) -> bool;

    /// Parsed source for a uri; `None` when the module does not exist.
    fn load(&self, uri: &str) -> Option<SourceModule>;

    /// Monotonic per-module version; bumps whenever the source changes.
    fn version(&self, uri: &str) -> Option<i32>;

    /// Root directory for `@/` imports.
    fn workspace_root(&self) -> String {
        String::new()
    }

    /// Search roots for bare (library) imports, in priority order.
    fn library_roots(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NotFound { raw: String, tried: Vec<String> },
}

/// Resolve an import string from `source_uri` to a host uri.
///
/// Three forms: `./x` (and `../x`) are relative to the importing module's
/// directory, `@/x` is relative to the workspace root, and a bare name is
/// searched through the library roots in order. A `.yal` suffix is appended
/// when missing. Every candidate is checked against the host; resolution
/// fails only when none exists.
pub fn resolve_import_path(
    host: &dyn AnnotationHost,
    source_uri: &str,
    raw: &str,
) -> Result<String, ResolveError> {
    let with_ext = |path: String| {
        if path.ends_with(".yal") {
            path
        } else {
            format!("{path}.yal")
        }
    };

    let mut tried = Vec::new();
    let candidates: Vec<String> = if raw.starts_with("./") || raw.starts_with("../") {
        let dir = parent_dir(source_uri);
        vec![with_ext(normalize(&join(&dir, raw)))]
    } else if let Some(rest) = raw.strip_prefix("@/") {
        vec![with_ext(normalize(&join(&host.workspace_root(), rest)))]
    } else {
        host.library_roots()
            .iter()
            .map(|root| with_ext(normalize(&join(root, raw))))
            .collect()
    };

    for candidate in candidates {
        if host.exists(&candidate) {
            return Ok(candidate);
        }
        tried.push(candidate);
    }
    Err(ResolveError::NotFound {
        raw: raw.to_string(),
        tried,
    })
}

fn parent_dir(uri: &str) -> String {
    match uri.rfind('/') {
        Some(idx) => uri[..idx].to_string(),
        None => String::new(),
    }
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else {
        format!("{base}/{rest}")
    }
}

/// Collapse `.` and `..` segments. Leading `..` that would escape the root
/// is dropped rather than preserved; uris never leave the host namespace.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// In-memory host keyed by uri. Concurrent map so tooling threads can
/// update sources while an index pass reads them.
#[derive(Default)]
pub struct MemoryHost {
    modules: DashMap<String, SourceModule>,
    workspace_root: String,
    library_roots: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(workspace_root: impl Into<String>, library_roots: Vec<String>) -> Self {
        Self {
            modules: DashMap::new(),
            workspace_root: workspace_root.into(),
            library_roots,
        }
    }

    /// Insert or replace a module. The caller owns version bumps; replacing
    /// with an unchanged version keeps downstream caches valid.
    pub fn insert(&self, module: SourceModule) {
        self.modules.insert(module.uri.clone(), module);
    }

    pub fn remove(&self, uri: &str) {
        self.modules.remove(uri);
    }

    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        uris.sort();
        uris
    }
}

impl AnnotationHost for MemoryHost {
    fn exists(&self, uri: &str) -> bool {
        self.modules.contains_key(uri)
    }

    fn load(&self, uri: &str) -> Option<SourceModule> {
        self.modules.get(uri).map(|entry| entry.value().clone())
    }

    fn version(&self, uri: &str) -> Option<i32> {
        self.modules.get(uri).map(|entry| entry.value().version)
    }

    fn workspace_root(&self) -> String {
        self.workspace_root.clone()
    }

    fn library_roots(&self) -> Vec<String> {
        self.library_roots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use yal_common::Interner;
    use yal_ast::TreeBuilder;

    fn host_with(uris: &[&str]) -> MemoryHost {
        let interner = Arc::new(Interner::new());
        let host = MemoryHost::with_roots("app", vec!["lib".to_string(), "vendor".to_string()]);
        for uri in uris {
            let builder = TreeBuilder::new(&interner);
            host.insert(builder.module(uri, 1, vec![]));
        }
        host
    }

    #[test]
    fn relative_import_resolves_against_source_dir() {
        let host = host_with(&["app/util/math.yal"]);
        let resolved = resolve_import_path(&host, "app/util/main.yal", "./math");
        assert_eq!(resolved, Ok("app/util/math.yal".to_string()));
    }

    #[test]
    fn dotdot_walks_up() {
        let host = host_with(&["app/shared.yal"]);
        let resolved = resolve_import_path(&host, "app/util/main.yal", "../shared");
        assert_eq!(resolved, Ok("app/shared.yal".to_string()));
    }

    #[test]
    fn workspace_prefix_uses_root() {
        let host = host_with(&["app/core/types.yal"]);
        let resolved = resolve_import_path(&host, "app/deep/nested/mod.yal", "@/core/types");
        assert_eq!(resolved, Ok("app/core/types.yal".to_string()));
    }

    #[test]
    fn bare_import_searches_library_roots_in_order() {
        let host = host_with(&["vendor/json.yal", "lib/json.yal"]);
        let resolved = resolve_import_path(&host, "app/main.yal", "json");
        assert_eq!(resolved, Ok("lib/json.yal".to_string()));
    }

    #[test]
    fn explicit_extension_is_not_doubled() {
        let host = host_with(&["app/util/math.yal"]);
        let resolved = resolve_import_path(&host, "app/util/main.yal", "./math.yal");
        assert_eq!(resolved, Ok("app/util/math.yal".to_string()));
    }

    #[test]
    fn missing_module_reports_candidates() {
        let host = host_with(&[]);
        let err = resolve_import_path(&host, "app/main.yal", "nope");
        match err {
            Err(ResolveError::NotFound { raw, tried }) => {
                assert_eq!(raw, "nope");
                assert_eq!(tried, vec!["lib/nope.yal".to_string(), "vendor/nope.yal".to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
