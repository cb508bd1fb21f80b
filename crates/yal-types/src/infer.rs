//! Generic method resolution: variance-aware unification and substitution.
//!
//! A call on a generic method binds its type parameters by unifying the
//! call's type hint against the return type (covariant) and each argument
//! type against the corresponding parameter type (contravariant), walking
//! into `Nullable`/`List`/`Union`/`Function` structure with variance flipped
//! across function-parameter boundaries. Union templates are tried member by
//! member with the whole binding state saved and restored around each
//! attempt. Everything is explicit `Result`/boolean returns; there is no
//! non-local control flow to unwind.

use crate::intern::TypeStore;
use crate::types::{Method, TypeData, TypeId, TypeParamId};
use rustc_hash::FxHashMap;
use tracing::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variance {
    Covariant,
    Contravariant,
    Invariant,
}

impl Variance {
    pub const fn flip(self) -> Self {
        match self {
            Variance::Covariant => Variance::Contravariant,
            Variance::Contravariant => Variance::Covariant,
            Variance::Invariant => Variance::Invariant,
        }
    }
}

/// Tentative type-parameter bindings, with snapshot support for union
/// backtracking.
#[derive(Default, Debug, Clone)]
pub struct BindingState {
    bindings: FxHashMap<TypeParamId, TypeId>,
}

pub type BindingSnapshot = FxHashMap<TypeParamId, TypeId>;

impl BindingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, param: TypeParamId) -> Option<TypeId> {
        self.bindings.get(&param).copied()
    }

    pub fn save(&self) -> BindingSnapshot {
        self.bindings.clone()
    }

    pub fn restore(&mut self, snapshot: BindingSnapshot) {
        self.bindings = snapshot;
    }

    /// Bind or reconcile with an existing tentative bound: the wider of the
    /// two survives; unrelated bounds fail the attempt.
    fn bind(&mut self, store: &TypeStore, param: TypeParamId, actual: TypeId) -> bool {
        match self.bindings.get(&param).copied() {
            None => {
                self.bindings.insert(param, actual);
                true
            }
            Some(existing) if existing == actual => true,
            Some(existing) if store.is_assignable_to(actual, existing) => true,
            Some(existing) if store.is_assignable_to(existing, actual) => {
                self.bindings.insert(param, actual);
                true
            }
            Some(_) => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubstError {
    /// A type parameter with invariant usage was never bound.
    Unresolved(TypeParamId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenericCallError {
    /// Unification failed for the argument at this index.
    ArgBinding { index: usize },
    Unresolved(TypeParamId),
}

/// A generic method with its parameters and return type fully substituted
/// for one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericInstance {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Copy, Clone, Default)]
struct Polarity {
    co: bool,
    contra: bool,
}

impl TypeStore {
    /// Structural unification of a template type against a concrete type.
    pub fn unify(
        &self,
        template: TypeId,
        actual: TypeId,
        variance: Variance,
        state: &mut BindingState,
    ) -> bool {
        let template = self.resolve_alias(template);
        let actual = self.resolve_alias(actual);

        if let Some(TypeData::TypeParam(param)) = self.lookup(template) {
            return state.bind(self, param, actual);
        }
        if template == actual || template == TypeId::ANY || actual == TypeId::ANY {
            return true;
        }

        match self.lookup(template) {
            Some(TypeData::Nullable(template_inner)) => {
                if actual == TypeId::NULL {
                    return true;
                }
                if let Some(TypeData::Nullable(actual_inner)) = self.lookup(actual) {
                    return self.unify(template_inner, actual_inner, variance, state);
                }
                self.unify(template_inner, actual, variance, state)
            }
            Some(TypeData::List(template_item)) => match self.lookup(actual) {
                Some(TypeData::List(actual_item)) => {
                    self.unify(template_item, actual_item, variance, state)
                }
                _ => false,
            },
            Some(TypeData::Union(members)) => {
                // First member that unifies wins; each attempt runs against a
                // clean copy of the binding state.
                for &member in self.type_list(members).iter() {
                    let snapshot = state.save();
                    if self.unify(member, actual, variance, state) {
                        return true;
                    }
                    state.restore(snapshot);
                }
                false
            }
            Some(TypeData::Function(_) | TypeData::Lambda(_)) => {
                let (Some(template_shape), Some(actual_shape)) =
                    (self.callable_shape(template), self.callable_shape(actual))
                else {
                    return false;
                };
                if template_shape.params.len() != actual_shape.params.len() {
                    return false;
                }
                for (template_param, actual_param) in
                    template_shape.params.iter().zip(&actual_shape.params)
                {
                    if !self.unify(template_param.ty, actual_param.ty, variance.flip(), state) {
                        return false;
                    }
                }
                self.unify(template_shape.ret, actual_shape.ret, variance, state)
            }
            _ => match variance {
                Variance::Covariant => self.is_assignable_to(template, actual),
                Variance::Contravariant => self.is_assignable_to(actual, template),
                Variance::Invariant => false,
            },
        }
    }

    /// Replace bound type parameters; unbound ones fall back to the
    /// variance-appropriate extreme from `defaults`.
    pub fn substitute(
        &self,
        ty: TypeId,
        state: &BindingState,
        defaults: &FxHashMap<TypeParamId, TypeId>,
    ) -> Result<TypeId, SubstError> {
        match self.lookup(ty) {
            Some(TypeData::TypeParam(param)) => state
                .get(param)
                .or_else(|| defaults.get(&param).copied())
                .ok_or(SubstError::Unresolved(param)),
            Some(TypeData::List(item)) => {
                let item = self.substitute(item, state, defaults)?;
                Ok(self.list(item))
            }
            Some(TypeData::Nullable(inner)) => {
                let inner = self.substitute(inner, state, defaults)?;
                Ok(self.nullable(inner))
            }
            Some(TypeData::Union(members)) => {
                let mut substituted = Vec::new();
                for &member in self.type_list(members).iter() {
                    substituted.push(self.substitute(member, state, defaults)?);
                }
                Ok(self.union(substituted))
            }
            Some(TypeData::Function(_) | TypeData::Lambda(_)) => {
                let Some(shape) = self.callable_shape(ty) else {
                    return Ok(ty);
                };
                let mut params = Vec::with_capacity(shape.params.len());
                for param in &shape.params {
                    let mut substituted = param.clone();
                    substituted.ty = self.substitute(param.ty, state, defaults)?;
                    params.push(substituted);
                }
                let ret = self.substitute(shape.ret, state, defaults)?;
                Ok(self.function(params, ret))
            }
            Some(TypeData::Alias { target, .. }) => self.substitute(target, state, defaults),
            _ => Ok(ty),
        }
    }

    fn collect_polarity(
        &self,
        ty: TypeId,
        variance: Variance,
        map: &mut FxHashMap<TypeParamId, Polarity>,
    ) {
        match self.lookup(self.resolve_alias(ty)) {
            Some(TypeData::TypeParam(param)) => {
                let entry = map.entry(param).or_default();
                match variance {
                    Variance::Covariant => entry.co = true,
                    Variance::Contravariant => entry.contra = true,
                    Variance::Invariant => {
                        entry.co = true;
                        entry.contra = true;
                    }
                }
            }
            Some(TypeData::List(item)) | Some(TypeData::Nullable(item)) => {
                self.collect_polarity(item, variance, map);
            }
            Some(TypeData::Union(members)) => {
                for &member in self.type_list(members).iter() {
                    self.collect_polarity(member, variance, map);
                }
            }
            Some(TypeData::Function(_) | TypeData::Lambda(_)) => {
                if let Some(shape) = self.callable_shape(ty) {
                    for param in &shape.params {
                        self.collect_polarity(param.ty, variance.flip(), map);
                    }
                    self.collect_polarity(shape.ret, variance, map);
                }
            }
            _ => {}
        }
    }

    /// Bind and substitute a generic method for one call site. `args` holds
    /// the call's effective argument types after default splicing; `hint` is
    /// the top-down expected type, if any.
    pub fn resolve_generic_call(
        &self,
        method: &Method,
        hint: Option<TypeId>,
        args: &[TypeId],
    ) -> Result<GenericInstance, GenericCallError> {
        let mut state = BindingState::new();

        // The hint is advisory: a failed hint unification rolls back rather
        // than failing the call; a real mismatch surfaces later as an
        // ordinary assignability diagnostic.
        if let Some(hint) = hint
            && hint != TypeId::ANY
        {
            let snapshot = state.save();
            if !self.unify(method.return_type, hint, Variance::Covariant, &mut state) {
                state.restore(snapshot);
            }
        }

        for (index, (&arg, param)) in args.iter().zip(&method.params).enumerate() {
            if !self.unify(param.ty, arg, Variance::Contravariant, &mut state) {
                trace!(index, "generic argument binding failed");
                return Err(GenericCallError::ArgBinding { index });
            }
        }

        // Unbound parameters default to the optimistic extreme their usage
        // polarity allows; invariant usage with no binding is a hard failure.
        let mut polarity: FxHashMap<TypeParamId, Polarity> = FxHashMap::default();
        for param in &method.params {
            self.collect_polarity(param.ty, Variance::Contravariant, &mut polarity);
        }
        self.collect_polarity(method.return_type, Variance::Covariant, &mut polarity);

        let mut defaults: FxHashMap<TypeParamId, TypeId> = FxHashMap::default();
        for &param in &method.type_params {
            if state.get(param).is_some() {
                continue;
            }
            let usage = polarity.get(&param).copied().unwrap_or_default();
            let fallback = match (usage.co, usage.contra) {
                (true, false) | (false, false) => TypeId::NEVER,
                (false, true) => TypeId::ANY,
                (true, true) => return Err(GenericCallError::Unresolved(param)),
            };
            defaults.insert(param, fallback);
        }

        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            let ty = self
                .substitute(param.ty, &state, &defaults)
                .map_err(|SubstError::Unresolved(p)| GenericCallError::Unresolved(p))?;
            params.push(ty);
        }
        let ret = self
            .substitute(method.return_type, &state, &defaults)
            .map_err(|SubstError::Unresolved(p)| GenericCallError::Unresolved(p))?;

        Ok(GenericInstance { params, ret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MethodParam;
    use std::sync::Arc;
    use yal_common::Interner;

    fn store() -> TypeStore {
        TypeStore::new(Arc::new(Interner::new()))
    }

    /// `identity[T](x: T): T`
    fn identity_method(store: &TypeStore) -> (Method, TypeParamId) {
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("fresh_type_param returns a type parameter");
        };
        let mut method = Method::new(
            store.interner().intern("identity"),
            vec![MethodParam {
                name: store.interner().intern("x"),
                ty: t,
                default: None,
            }],
            t,
        );
        method.type_params = vec![t_id];
        (method, t_id)
    }

    #[test]
    fn identity_binds_from_argument() {
        let store = store();
        let (method, t_id) = identity_method(&store);
        let instance = store
            .resolve_generic_call(&method, None, &[TypeId::NUMBER])
            .expect("binding succeeds");
        assert_eq!(instance.ret, TypeId::NUMBER);
        assert_eq!(instance.params, vec![TypeId::NUMBER]);
        let _ = t_id;
    }

    #[test]
    fn identity_binds_from_hint_and_argument_agree() {
        let store = store();
        let (method, _) = identity_method(&store);
        let instance = store
            .resolve_generic_call(&method, Some(TypeId::NUMBER), &[TypeId::NUMBER])
            .expect("binding succeeds");
        assert_eq!(instance.ret, TypeId::NUMBER);
    }

    #[test]
    fn list_structure_binds_item_type() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        // first[T](xs: List[T]): T
        let mut method = Method::new(
            store.interner().intern("first"),
            vec![MethodParam {
                name: store.interner().intern("xs"),
                ty: store.list(t),
                default: None,
            }],
            t,
        );
        method.type_params = vec![t_id];

        let list_str = store.list(TypeId::STRING);
        let instance = store
            .resolve_generic_call(&method, None, &[list_str])
            .expect("binding succeeds");
        assert_eq!(instance.ret, TypeId::STRING);
    }

    #[test]
    fn union_template_backtracks() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let template = store.union(vec![store.list(t), TypeId::STRING]);
        let mut state = BindingState::new();
        // String matches the second member; the failed List attempt must not
        // leave a partial binding behind.
        assert!(store.unify(template, TypeId::STRING, Variance::Contravariant, &mut state));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        assert_eq!(state.get(t_id), None);

        let mut state = BindingState::new();
        let list_num = store.list(TypeId::NUMBER);
        assert!(store.unify(template, list_num, Variance::Contravariant, &mut state));
        assert_eq!(state.get(t_id), Some(TypeId::NUMBER));
    }

    #[test]
    fn unbound_covariant_defaults_to_never() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        // empty[T](): List[T] — T only appears covariantly.
        let mut method = Method::new(store.interner().intern("empty"), Vec::new(), store.list(t));
        method.type_params = vec![t_id];

        let instance = store
            .resolve_generic_call(&method, None, &[])
            .expect("unbound covariant parameter defaults");
        assert_eq!(instance.ret, store.list(TypeId::NEVER));
    }

    #[test]
    fn unbound_contravariant_defaults_to_any() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        // sink[T](): (T) => Null — T appears contravariantly inside the
        // returned function's parameter row.
        let callback = store.function_of(&[t], TypeId::NULL);
        let mut method = Method::new(store.interner().intern("sink"), Vec::new(), callback);
        method.type_params = vec![t_id];

        let instance = store
            .resolve_generic_call(&method, None, &[])
            .expect("unbound contravariant parameter defaults");
        assert_eq!(instance.ret, store.function_of(&[TypeId::ANY], TypeId::NULL));
    }

    #[test]
    fn unbound_invariant_is_hard_failure() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        // pipe[T](): (T) => T — T is used both co- and contravariantly.
        let both = store.function_of(&[t], t);
        let mut method = Method::new(store.interner().intern("pipe"), Vec::new(), both);
        method.type_params = vec![t_id];

        assert_eq!(
            store.resolve_generic_call(&method, None, &[]),
            Err(GenericCallError::Unresolved(t_id))
        );
    }

    #[test]
    fn incompatible_rebinding_fails_argument() {
        let store = store();
        let t = store.fresh_type_param(store.interner().intern("T"));
        let Some(TypeData::TypeParam(t_id)) = store.lookup(t) else {
            panic!("type parameter expected");
        };
        // pair[T](a: T, b: T): T with unrelated argument types.
        let mut method = Method::new(
            store.interner().intern("pair"),
            vec![
                MethodParam {
                    name: store.interner().intern("a"),
                    ty: t,
                    default: None,
                },
                MethodParam {
                    name: store.interner().intern("b"),
                    ty: t,
                    default: None,
                },
            ],
            t,
        );
        method.type_params = vec![t_id];

        assert_eq!(
            store.resolve_generic_call(&method, None, &[TypeId::NUMBER, TypeId::STRING]),
            Err(GenericCallError::ArgBinding { index: 1 })
        );

        // Widening rebinding is allowed: Number then Number? lands on Number?.
        let opt_num = store.nullable(TypeId::NUMBER);
        let instance = store
            .resolve_generic_call(&method, None, &[TypeId::NUMBER, opt_num])
            .expect("widening rebinding succeeds");
        assert_eq!(instance.ret, opt_num);
    }
}
