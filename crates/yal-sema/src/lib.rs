//! Semantic analysis for yal modules.
//!
//! The entry point is [`ModuleCache::get_annotation`]: given a host that
//! serves parsed sources, it produces one immutable [`Annotation`] per
//! module — diagnostics, export table, symbol references, completion
//! anchors, call and print records, and the lowered IR the emitter
//! consumes. Annotations are cached per uri and revalidated cheaply; see
//! the `modules` module for the rules.

mod annotate;
mod expr;
mod forward;

pub mod annotation;
pub mod consteval;
pub mod host;
pub mod ir;
pub mod modules;
pub mod scope;

pub use annotate::RunStatus;
pub use annotation::{
    Annotation, CallRecord, CompletionAnchor, ExportInfo, PrintRecord, SymbolReference,
};
pub use consteval::{ConstValue, eval_const};
pub use host::{AnnotationHost, MemoryHost, ResolveError, resolve_import_path};
pub use ir::{CompileConfig, IrExpr, IrFunc, IrStmt, RecvKind, Target};
pub use modules::{ImportError, ModuleCache};
pub use scope::{FrameId, ScopeArena, VarId, Variable};
