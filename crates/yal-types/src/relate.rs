//! Assignability, the two-point join, and interface conformance.

use crate::intern::TypeStore;
use crate::types::{DefId, FunctionShape, TypeData, TypeId};
use std::sync::Arc;
use tracing::trace;

impl TypeStore {
    /// `source <: target`. Reflexive; `T <: Any` always; `Never <: T` always;
    /// `Any <: T` only for `T = Any`. Nominal targets compare by declaration,
    /// interface targets structurally (memoized), function targets with
    /// contravariant parameters and covariant returns. List item types are
    /// covariant: a deliberate soundness relaxation, preserved as observed
    /// behavior rather than corrected.
    pub fn is_assignable_to(&self, source: TypeId, target: TypeId) -> bool {
        let source = self.resolve_alias(source);
        let target = self.resolve_alias(target);
        if source == target || target == TypeId::ANY || source == TypeId::NEVER {
            return true;
        }
        if source == TypeId::ANY {
            return false;
        }

        // A union source fits only if every member fits.
        if let Some(TypeData::Union(list)) = self.lookup(source) {
            return self
                .type_list(list)
                .iter()
                .all(|&member| self.is_assignable_to(member, target));
        }

        match self.lookup(target) {
            Some(TypeData::Nullable(inner)) => {
                if source == TypeId::NULL {
                    return true;
                }
                if let Some(TypeData::Nullable(source_inner)) = self.lookup(source) {
                    return self.is_assignable_to(source_inner, inner);
                }
                self.is_assignable_to(source, inner)
            }
            Some(TypeData::Union(list)) => self
                .type_list(list)
                .iter()
                .any(|&member| self.is_assignable_to(source, member)),
            Some(TypeData::List(target_item)) => match self.lookup(source) {
                Some(TypeData::List(source_item)) => {
                    self.is_assignable_to(source_item, target_item)
                }
                _ => false,
            },
            Some(TypeData::Interface(def)) => self.interface_satisfied_by(def, source),
            Some(TypeData::Class(def)) => match self.lookup(source) {
                Some(TypeData::Class(source_def)) => self.is_subclass_of(source_def, def),
                _ => false,
            },
            Some(TypeData::Function(_) | TypeData::Lambda(_)) => {
                match (self.callable_shape(source), self.callable_shape(target)) {
                    (Some(source_shape), Some(target_shape)) => {
                        self.shapes_assignable(&source_shape, &target_shape)
                    }
                    _ => false,
                }
            }
            // Enum instances flow into their underlying representation.
            Some(TypeData::Number | TypeData::String | TypeData::Bool) => {
                match self.lookup(source) {
                    Some(TypeData::Enum(def)) => {
                        self.is_assignable_to(self.enum_underlying(def), target)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Positional shape of any callable type.
    pub fn callable_shape(&self, ty: TypeId) -> Option<Arc<FunctionShape>> {
        match self.lookup(self.resolve_alias(ty)) {
            Some(TypeData::Function(shape_id)) => self.shape(shape_id),
            Some(TypeData::Lambda(method_id)) => self.shape_of_lambda(method_id),
            _ => None,
        }
    }

    /// Function subtyping: arities match, parameters contravariant, returns
    /// covariant.
    fn shapes_assignable(&self, source: &FunctionShape, target: &FunctionShape) -> bool {
        if source.params.len() != target.params.len() {
            return false;
        }
        for (source_param, target_param) in source.params.iter().zip(&target.params) {
            if !self.is_assignable_to(target_param.ty, source_param.ty) {
                return false;
            }
        }
        self.is_assignable_to(source.ret, target.ret)
    }

    /// Join on the two-point lattice: the more general side when one side is
    /// assignable to the other, `Any` otherwise. Callers needing real unions
    /// must construct `Union` types explicitly.
    pub fn common_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if self.is_assignable_to(a, b) {
            return b;
        }
        if self.is_assignable_to(b, a) {
            return a;
        }
        TypeId::ANY
    }

    /// Memoized structural conformance: does `candidate` implement every
    /// method in the interface's full (inherited included) method set?
    /// In-progress pairs answer optimistically so recursive shapes terminate.
    pub fn interface_satisfied_by(&self, iface: DefId, candidate: TypeId) -> bool {
        let candidate = self.resolve_alias(candidate);
        if let Some(TypeData::Interface(candidate_def)) = self.lookup(candidate)
            && self.interface_extends(candidate_def, iface)
        {
            return true;
        }
        let key = (iface, candidate);
        if let Some(hit) = self.conformance.get(&key) {
            return *hit;
        }
        if self.conformance_in_progress.contains_key(&key) {
            return true;
        }
        self.conformance_in_progress.insert(key, ());
        let result = self.conformance_fresh(iface, candidate);
        self.conformance_in_progress.remove(&key);
        trace!(?iface, ?candidate, result, "interface conformance");
        self.conformance.insert(key, result);
        result
    }

    /// The unmemoized check. Exposed so the memo can be validated against a
    /// fresh computation.
    pub fn conformance_fresh(&self, iface: DefId, candidate: TypeId) -> bool {
        let Some(info) = self.def_info(iface) else {
            return false;
        };
        for required in &info.methods {
            // Alias methods re-expose another member; the candidate must
            // provide the redirect target.
            let name = required.alias_for.unwrap_or(required.name);
            let Some(actual) = self.get_method(candidate, name, required.params.len()) else {
                return false;
            };
            for (required_param, actual_param) in required.params.iter().zip(&actual.params) {
                if !self.is_assignable_to(required_param.ty, actual_param.ty) {
                    return false;
                }
            }
            if !self.is_assignable_to(actual.return_type, required.return_type) {
                return false;
            }
        }
        true
    }

    fn interface_extends(&self, sub: DefId, target: DefId) -> bool {
        if sub == target {
            return true;
        }
        let Some(info) = self.def_info(sub) else {
            return false;
        };
        info.interfaces
            .iter()
            .any(|&parent| self.interface_extends(parent, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::DefKind;
    use crate::types::{Method, MethodParam};
    use std::sync::Arc;
    use yal_common::Interner;

    fn store() -> TypeStore {
        TypeStore::new(Arc::new(Interner::new()))
    }

    fn method(store: &TypeStore, name: &str, params: &[TypeId], ret: TypeId) -> Arc<Method> {
        let params = params
            .iter()
            .enumerate()
            .map(|(i, &ty)| MethodParam {
                name: store.interner().intern(&format!("p{i}")),
                ty,
                default: None,
            })
            .collect();
        Arc::new(Method::new(store.interner().intern(name), params, ret))
    }

    #[test]
    fn assignability_axioms() {
        let store = store();
        let all = [
            TypeId::ANY,
            TypeId::NEVER,
            TypeId::NULL,
            TypeId::BOOL,
            TypeId::NUMBER,
            TypeId::STRING,
            store.list(TypeId::NUMBER),
            store.nullable(TypeId::STRING),
        ];
        for &ty in &all {
            assert!(store.is_assignable_to(ty, ty), "reflexive");
            assert!(store.is_assignable_to(TypeId::NEVER, ty), "Never <: T");
            assert!(store.is_assignable_to(ty, TypeId::ANY), "T <: Any");
            if ty != TypeId::ANY {
                assert!(!store.is_assignable_to(TypeId::ANY, ty), "Any only into Any");
            }
        }
    }

    #[test]
    fn nullable_accepts_null_and_inner() {
        let store = store();
        let opt = store.nullable(TypeId::NUMBER);
        assert!(store.is_assignable_to(TypeId::NULL, opt));
        assert!(store.is_assignable_to(TypeId::NUMBER, opt));
        assert!(!store.is_assignable_to(opt, TypeId::NUMBER));
        assert!(!store.is_assignable_to(TypeId::STRING, opt));
    }

    #[test]
    fn union_source_and_target() {
        let store = store();
        let num_or_str = store.union(vec![TypeId::NUMBER, TypeId::STRING]);
        assert!(store.is_assignable_to(TypeId::NUMBER, num_or_str));
        assert!(store.is_assignable_to(num_or_str, num_or_str));
        assert!(!store.is_assignable_to(num_or_str, TypeId::NUMBER));
        let wider = store.union(vec![TypeId::NUMBER, TypeId::STRING, TypeId::BOOL]);
        assert!(store.is_assignable_to(num_or_str, wider));
        assert!(!store.is_assignable_to(wider, num_or_str));
    }

    #[test]
    fn list_items_are_covariant() {
        // Documented soundness relaxation: no separate read-only list
        // position exists, yet item types relate covariantly.
        let store = store();
        let animal = store.nullable(TypeId::NUMBER);
        let list_num = store.list(TypeId::NUMBER);
        let list_opt_num = store.list(animal);
        assert!(store.is_assignable_to(list_num, list_opt_num));
        assert!(!store.is_assignable_to(list_opt_num, list_num));
    }

    #[test]
    fn function_params_contravariant_returns_covariant() {
        let store = store();
        let opt_num = store.nullable(TypeId::NUMBER);
        // (Number?) => Number  <:  (Number) => Number?
        let source = store.function_of(&[opt_num], TypeId::NUMBER);
        let target = store.function_of(&[TypeId::NUMBER], opt_num);
        assert!(store.is_assignable_to(source, target));
        assert!(!store.is_assignable_to(target, source));
        // Arity must match.
        let nullary = store.function_of(&[], TypeId::NUMBER);
        assert!(!store.is_assignable_to(nullary, source));
    }

    #[test]
    fn join_is_idempotent_and_commutative() {
        let store = store();
        let opt_num = store.nullable(TypeId::NUMBER);
        let pairs = [
            (TypeId::NUMBER, TypeId::NUMBER),
            (TypeId::NUMBER, TypeId::STRING),
            (TypeId::NUMBER, opt_num),
            (TypeId::NEVER, TypeId::STRING),
        ];
        for &(a, b) in &pairs {
            assert_eq!(store.common_type(a, a), a);
            assert_eq!(store.common_type(a, b), store.common_type(b, a));
        }
        assert_eq!(store.common_type(TypeId::NUMBER, opt_num), opt_num);
        assert_eq!(store.common_type(TypeId::NUMBER, TypeId::STRING), TypeId::ANY);
        assert_eq!(store.common_type(TypeId::NEVER, TypeId::STRING), TypeId::STRING);
    }

    #[test]
    fn class_assignability_is_nominal() {
        let store = store();
        let base = store.register_def(DefKind::Class, store.interner().intern("Base"));
        let derived = store.register_def(DefKind::Class, store.interner().intern("Derived"));
        let other = store.register_def(DefKind::Class, store.interner().intern("Other"));
        store.set_def_extends(derived, base);
        let base_ty = store.class_type(base);
        let derived_ty = store.class_type(derived);
        let other_ty = store.class_type(other);
        assert!(store.is_assignable_to(derived_ty, base_ty));
        assert!(!store.is_assignable_to(base_ty, derived_ty));
        assert!(!store.is_assignable_to(other_ty, base_ty));
    }

    #[test]
    fn enum_flows_into_underlying() {
        let store = store();
        let def = store.register_def(DefKind::Enum, store.interner().intern("Color"));
        store.set_enum_info(def, TypeId::STRING, Vec::new());
        let color = store.enum_type(def);
        assert!(store.is_assignable_to(color, TypeId::STRING));
        assert!(!store.is_assignable_to(color, TypeId::NUMBER));
        assert!(!store.is_assignable_to(TypeId::STRING, color));
    }

    fn sized_interface(store: &TypeStore) -> DefId {
        let iface = store.register_def(DefKind::Interface, store.interner().intern("Sized"));
        let size = method(store, "size", &[], TypeId::NUMBER);
        store.set_def_methods(iface, vec![size]);
        iface
    }

    #[test]
    fn interface_conformance_is_structural() {
        let store = store();
        let iface = sized_interface(&store);
        let good = store.register_def(DefKind::Class, store.interner().intern("Box"));
        store.set_def_methods(good, vec![method(&store, "size", &[], TypeId::NUMBER)]);
        let bad = store.register_def(DefKind::Class, store.interner().intern("Blob"));
        store.set_def_methods(bad, vec![method(&store, "size", &[], TypeId::STRING)]);

        let iface_ty = store.interface_type(iface);
        assert!(store.is_assignable_to(store.class_type(good), iface_ty));
        assert!(!store.is_assignable_to(store.class_type(bad), iface_ty));
    }

    #[test]
    fn conformance_memo_matches_fresh_recomputation() {
        let store = store();
        let iface = sized_interface(&store);
        let good = store.register_def(DefKind::Class, store.interner().intern("Box"));
        store.set_def_methods(good, vec![method(&store, "size", &[], TypeId::NUMBER)]);
        let bad = store.register_def(DefKind::Class, store.interner().intern("Blob"));
        store.set_def_methods(bad, vec![method(&store, "grow", &[], TypeId::NUMBER)]);

        for candidate in [store.class_type(good), store.class_type(bad)] {
            // Query twice so the second answer comes from the memo.
            let first = store.interface_satisfied_by(iface, candidate);
            let memoized = store.interface_satisfied_by(iface, candidate);
            let fresh = store.conformance_fresh(iface, candidate);
            assert_eq!(first, memoized);
            assert_eq!(memoized, fresh);
        }
    }

    #[test]
    fn sub_interface_satisfies_super() {
        let store = store();
        let base = sized_interface(&store);
        let sub = store.register_def(DefKind::Interface, store.interner().intern("Collection"));
        store.set_def_interfaces(sub, vec![base]);
        store.set_def_methods(
            sub,
            vec![
                method(&store, "size", &[], TypeId::NUMBER),
                method(&store, "clear", &[], TypeId::NULL),
            ],
        );
        assert!(store.is_assignable_to(store.interface_type(sub), store.interface_type(base)));
        assert!(!store.is_assignable_to(store.interface_type(base), store.interface_type(sub)));
    }
}
