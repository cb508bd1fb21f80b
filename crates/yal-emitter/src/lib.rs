//! JavaScript code generation for annotated yal programs.
//!
//! [`Emitter::emit`] takes the root module's [`Annotation`] and renders it
//! plus every transitively imported module into one self-contained script.
//! Each module becomes a lazily-evaluated thunk keyed by uri and runs at
//! most once; modules are deduplicated by annotation identity, so a module
//! imported along two paths is emitted a single time. When the root's
//! `__target` is `html`, the script is wrapped in a minimal HTML document.

mod expr;
mod printer;

use crate::printer::Printer;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;
use yal_sema::{Annotation, ModuleCache, Target, resolve_import_path};

/// The runtime helpers every emitted program carries. User identifiers are
/// `$`-mangled and can never collide with these.
const PRELUDE: &str = r#""use strict";
const __yal_modules = new Map();
const __yal_instances = new Map();
function __yal_require(uri) {
    let exports = __yal_instances.get(uri);
    if (exports !== undefined) {
        return exports;
    }
    exports = {};
    __yal_instances.set(uri, exports);
    __yal_modules.get(uri)(exports);
    return exports;
}
function __yal_print(value) {
    console.log(value);
}
function __yal_eq(a, b) {
    if (Array.isArray(a) && Array.isArray(b)) {
        if (a.length !== b.length) {
            return false;
        }
        for (let i = 0; i < a.length; i++) {
            if (!__yal_eq(a[i], b[i])) {
                return false;
            }
        }
        return true;
    }
    return a === b;
}
"#;

pub struct Emitter<'a, 'h> {
    cache: &'a ModuleCache<'h>,
}

impl<'a, 'h> Emitter<'a, 'h> {
    pub fn new(cache: &'a ModuleCache<'h>) -> Self {
        Self { cache }
    }

    /// Render the program rooted at `root` to JavaScript (or an HTML page
    /// carrying it, per the root's compile config).
    pub fn emit(&self, root: &Arc<Annotation>) -> String {
        let mut seen: FxHashSet<*const Annotation> = FxHashSet::default();
        let mut ordered: Vec<Arc<Annotation>> = Vec::new();

        // `__lib` entries join the emit set and run before the root.
        let mut lib_uris = Vec::new();
        for lib in &root.config.libs {
            match resolve_import_path(self.cache.host(), &root.uri, lib) {
                Ok(uri) => match self.cache.get_annotation(&uri, &mut Vec::new()) {
                    Ok(ann) => {
                        collect(&ann, &mut seen, &mut ordered);
                        lib_uris.push(uri);
                    }
                    Err(err) => debug!(lib, ?err, "skipping unloadable library module"),
                },
                Err(err) => debug!(lib, ?err, "skipping unresolvable library module"),
            }
        }
        collect(root, &mut seen, &mut ordered);
        debug!(root = %root.uri, modules = ordered.len(), "emitting program");

        let mut printer = Printer::new(self.cache.types().interner());
        printer.write(PRELUDE);
        for module in &ordered {
            printer.module(module);
        }
        for uri in &lib_uris {
            printer.require_line(uri);
        }
        printer.require_line(&root.uri);
        let script = printer.finish();

        match root.config.target {
            Target::Script => script,
            Target::Html => wrap_html(&script),
        }
    }
}

/// Dependencies-first walk over the annotation graph, deduplicated by
/// annotation identity.
fn collect(
    ann: &Arc<Annotation>,
    seen: &mut FxHashSet<*const Annotation>,
    ordered: &mut Vec<Arc<Annotation>>,
) {
    if !seen.insert(Arc::as_ptr(ann)) {
        return;
    }
    for (_, dep) in &ann.imports {
        collect(dep, seen, ordered);
    }
    ordered.push(ann.clone());
}

fn wrap_html(script: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n\
         <script type=\"module\">\n{script}</script>\n</body>\n</html>\n"
    )
}
