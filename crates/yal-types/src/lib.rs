//! Type model for the yal compiler.
//!
//! Types live in a structurally-deduplicated universe: composite types are
//! interned by structural key, so two structurally identical types share one
//! `TypeId` and identity comparison is the equality fast path. Nominal types
//! (classes, interfaces, enums) are compared by declaration identity
//! (`DefId`), never structurally.
//!
//! The `TypeStore` owns every table: the interning maps, the definition
//! store, the builtin method tables, and the interface-conformance memo. It
//! is shared by reference across one analysis pipeline; all mutation happens
//! through `&self` (single-writer discipline, wholesale `clear` on
//! workspace re-index).

mod builtins;
mod def;
mod infer;
mod intern;
mod relate;
mod types;

pub use def::{DefInfo, DefKind, EnumConst, FieldInfo};
pub use infer::{
    BindingSnapshot, BindingState, GenericCallError, GenericInstance, SubstError, Variance,
};
pub use intern::TypeStore;
pub use types::{
    DefId, FunctionShape, FunctionShapeId, LitValue, Method, MethodId, MethodParam, ModuleKey,
    ParamInfo, TypeData, TypeId, TypeListId, TypeParamId,
};
