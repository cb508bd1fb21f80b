//! Common types and utilities for the yal compiler.
//!
//! This crate provides foundational types used across all yal crates:
//! - Source spans (`Span`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`)
//! - Identifier interning (`Atom`, `Interner`)

pub mod diagnostics;
pub mod interner;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticCategory};
pub use interner::{Atom, Interner};
pub use span::Span;
