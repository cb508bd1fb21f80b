//! Core type representation.

use std::sync::Arc;
use yal_common::Atom;

/// Interned type handle. Identity equality implies structural equality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const ANY: Self = Self(0);
    pub const NEVER: Self = Self(1);
    pub const NULL: Self = Self(2);
    pub const BOOL: Self = Self(3);
    pub const NUMBER: Self = Self(4);
    pub const STRING: Self = Self(5);

    pub(crate) const FIRST_COMPOSITE: u32 = 6;
}

/// Interned ordered list of types (union members, function parameter rows).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeListId(pub u32);

/// Interned positional function shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShapeId(pub u32);

/// Handle to a `Method` record in the store. Lambda types are compared by
/// method identity, not shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

/// Declaration identity for nominal types (class/interface/enum).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DefId(pub u32);

/// Generic type-parameter placeholder. Every declaration site gets a fresh id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamId(pub u32);

/// Opaque key tying a `TypeData::Module` to an annotation in the resolver
/// layer's registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleKey(pub u32);

/// Structural key of a type. Composite variants reference other interned
/// handles, so `TypeData` equality is structural equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Any,
    Never,
    Null,
    Bool,
    Number,
    String,
    List(TypeId),
    Nullable(TypeId),
    Union(TypeListId),
    Function(FunctionShapeId),
    /// A function plus named/defaulted parameters and possibly unbound type
    /// parameters; see `Method`.
    Lambda(MethodId),
    Class(DefId),
    Interface(DefId),
    Enum(DefId),
    /// The type of a type: a class/interface/enum name referenced as a value.
    Meta(DefId),
    Module(ModuleKey),
    TypeParam(TypeParamId),
    /// Transparent rename; every relation sees through it.
    Alias { name: Atom, target: TypeId },
}

/// Positional view of a function parameter, for interned function shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: Option<Atom>,
    pub ty: TypeId,
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    pub params: Vec<ParamInfo>,
    pub ret: TypeId,
}

impl FunctionShape {
    /// Parameter count range accepted at a call site: trailing defaulted
    /// parameters may be omitted.
    pub fn min_arity(&self) -> usize {
        self.params.iter().filter(|p| !p.has_default).count()
    }
}

/// A literal value a call can always be replaced by.
#[derive(Clone, Debug, PartialEq)]
pub enum LitValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
}

/// Parameter of a method, with the optional default-value expression the
/// annotator splices in at call sites that omit it.
#[derive(Clone, Debug)]
pub struct MethodParam {
    pub name: Atom,
    pub ty: TypeId,
    pub default: Option<Arc<yal_ast::Expr>>,
}

/// A callable member: free function, class/interface method, synthesized
/// field accessor, or builtin operation.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: Atom,
    pub params: Vec<MethodParam>,
    pub return_type: TypeId,
    pub type_params: Vec<TypeParamId>,
    /// Declaring variable, when one exists. Lets go-to-definition land on the
    /// declaration and collapses a getter/setter pair to one symbol.
    /// The index is a `VarId` in the annotator's variable table.
    pub source_var: Option<u32>,
    /// Redirect target for interface methods that re-expose another member.
    pub alias_for: Option<Atom>,
    /// A literal the call can always be replaced by.
    pub inline_value: Option<LitValue>,
}

impl Method {
    pub fn new(name: Atom, params: Vec<MethodParam>, return_type: TypeId) -> Self {
        Self {
            name,
            params,
            return_type,
            type_params: Vec::new(),
            source_var: None,
            alias_for: None,
            inline_value: None,
        }
    }

    pub fn min_arity(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    /// Whether a call with `argc` arguments can resolve to this method once
    /// trailing defaults are spliced in.
    pub fn accepts_arity(&self, argc: usize) -> bool {
        argc >= self.min_arity() && argc <= self.params.len()
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}
