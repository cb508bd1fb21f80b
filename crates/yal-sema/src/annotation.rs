//! The per-module analysis product.
//!
//! An `Annotation` is immutable once built and shared by `Arc`; cache
//! revalidation leans on that, treating pointer identity of a dependency's
//! annotation as proof the dependency is unchanged.

use crate::consteval::ConstValue;
use crate::ir::{CompileConfig, IrStmt};
use indexmap::IndexMap;
use std::sync::Arc;
use yal_common::{Atom, Diagnostic, Span};
use yal_types::{ModuleKey, TypeId};

/// One entry in a module's export table.
#[derive(Clone, Debug)]
pub struct ExportInfo {
    /// Name of the underlying local binding (differs from the export name
    /// for `export ... as` aliases).
    pub local: Atom,
    pub ty: TypeId,
    pub mutable: bool,
    pub value: Option<ConstValue>,
    pub doc: Option<String>,
    pub decl_span: Span,
}

/// A resolved use of a named symbol, for go-to-definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolReference {
    pub span: Span,
    pub decl_uri: String,
    pub decl_span: Span,
}

/// A member-access position and the type of its owner expression; editors
/// derive completion lists from the owner type's member set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionAnchor {
    pub span: Span,
    pub owner_ty: TypeId,
}

/// A resolved call site, enough to render signature help.
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub span: Span,
    pub method: Atom,
    pub param_names: Vec<Option<Atom>>,
    pub param_types: Vec<TypeId>,
    pub arg_spans: Vec<Span>,
}

/// A `print` call and the statically-known value of its argument, if any.
#[derive(Clone, Debug)]
pub struct PrintRecord {
    pub span: Span,
    pub value: Option<ConstValue>,
}

/// Everything the annotator learned about one module.
#[derive(Debug)]
pub struct Annotation {
    pub uri: String,
    /// Host version of the source this annotation was computed from.
    pub version: i32,
    pub module_key: ModuleKey,
    pub diagnostics: Vec<Diagnostic>,
    /// Export table in declaration order.
    pub exports: IndexMap<Atom, ExportInfo>,
    /// Direct dependencies in import order, with the exact annotation
    /// object each import resolved to.
    pub imports: Vec<(String, Arc<Annotation>)>,
    pub references: Vec<SymbolReference>,
    pub completions: Vec<CompletionAnchor>,
    pub calls: Vec<CallRecord>,
    pub prints: Vec<PrintRecord>,
    pub ir: Vec<IrStmt>,
    pub config: CompileConfig,
    pub has_errors: bool,
}

impl Annotation {
    pub fn export(&self, name: Atom) -> Option<&ExportInfo> {
        self.exports.get(&name)
    }
}
