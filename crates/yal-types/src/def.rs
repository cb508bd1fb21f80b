//! Definition store for nominal types.
//!
//! Classes, interfaces and enums are registered in two phases to support
//! mutual recursion: the forward-declaration pass registers a skeleton
//! (name plus supertype links), a second sweep fills in the method set.
//! Method sets are stored inherited-first with own declarations appended,
//! so reverse lookup order gives declared-first shadowing.

use crate::intern::TypeStore;
use crate::types::{DefId, LitValue, Method, TypeData, TypeId};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use yal_common::Atom;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DefKind {
    Class,
    Interface,
    Enum,
}

/// One enum constant and its literal value.
#[derive(Clone, Debug)]
pub struct EnumConst {
    pub name: Atom,
    pub value: LitValue,
}

/// One class field, for member access and constructor synthesis. Inherited
/// fields are copied into subclasses ahead of their own.
#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Atom,
    pub ty: TypeId,
    pub mutable: bool,
}

#[derive(Clone, Debug)]
pub struct DefInfo {
    pub kind: DefKind,
    pub name: Atom,
    /// Class superclass (single inheritance).
    pub extends: Option<DefId>,
    /// Interface super-interfaces.
    pub interfaces: Vec<DefId>,
    /// Full method set: ancestor methods copied first, own declarations last.
    pub methods: Vec<Arc<Method>>,
    /// Class fields in constructor order, inherited first.
    pub fields: Vec<FieldInfo>,
    /// Synthesized field-wise constructor, for classes.
    pub constructor: Option<Arc<Method>>,
    /// Join of all member literal types, for enums.
    pub enum_underlying: TypeId,
    pub enum_members: Vec<EnumConst>,
}

impl DefInfo {
    fn skeleton(kind: DefKind, name: Atom) -> Self {
        Self {
            kind,
            name,
            extends: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constructor: None,
            enum_underlying: TypeId::ANY,
            enum_members: Vec::new(),
        }
    }
}

impl TypeStore {
    /// Register a skeleton definition (phase one of forward declaration).
    pub fn register_def(&self, kind: DefKind, name: Atom) -> DefId {
        let id = DefId(self.next_def.fetch_add(1, Ordering::SeqCst));
        self.defs.insert(id, DefInfo::skeleton(kind, name));
        id
    }

    pub fn def_info(&self, def: DefId) -> Option<DefInfo> {
        self.defs.get(&def).map(|entry| entry.clone())
    }

    pub fn def_kind(&self, def: DefId) -> Option<DefKind> {
        self.defs.get(&def).map(|entry| entry.kind)
    }

    pub fn def_name(&self, def: DefId) -> Option<Atom> {
        self.defs.get(&def).map(|entry| entry.name)
    }

    pub fn set_def_extends(&self, def: DefId, parent: DefId) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.extends = Some(parent);
        }
    }

    pub fn set_def_interfaces(&self, def: DefId, interfaces: Vec<DefId>) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.interfaces = interfaces;
        }
    }

    /// Fill the method set (phase two). Invalidates memoized conformance
    /// answers that involved this definition.
    pub fn set_def_methods(&self, def: DefId, methods: Vec<Arc<Method>>) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.methods = methods;
        }
        self.conformance.retain(|&(iface, _), _| iface != def);
    }

    pub fn set_def_fields(&self, def: DefId, fields: Vec<FieldInfo>) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.fields = fields;
        }
    }

    pub fn def_fields(&self, def: DefId) -> Vec<FieldInfo> {
        self.defs
            .get(&def)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default()
    }

    pub fn field_of(&self, def: DefId, name: Atom) -> Option<FieldInfo> {
        self.defs
            .get(&def)
            .and_then(|entry| entry.fields.iter().find(|f| f.name == name).cloned())
    }

    pub fn set_def_constructor(&self, def: DefId, constructor: Arc<Method>) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.constructor = Some(constructor);
        }
    }

    pub fn def_constructor(&self, def: DefId) -> Option<Arc<Method>> {
        self.defs.get(&def).and_then(|entry| entry.constructor.clone())
    }

    pub fn set_enum_info(&self, def: DefId, underlying: TypeId, members: Vec<EnumConst>) {
        if let Some(mut entry) = self.defs.get_mut(&def) {
            entry.enum_underlying = underlying;
            entry.enum_members = members;
        }
    }

    pub fn enum_underlying(&self, def: DefId) -> TypeId {
        self.defs
            .get(&def)
            .map(|entry| entry.enum_underlying)
            .unwrap_or(TypeId::ANY)
    }

    pub fn enum_const_variables(&self, def: DefId) -> Vec<EnumConst> {
        self.defs
            .get(&def)
            .map(|entry| entry.enum_members.clone())
            .unwrap_or_default()
    }

    /// Match a literal value against the enum's constants, so bare literals
    /// type-check against the enum without an explicit cast.
    pub fn enum_const_by_value(&self, def: DefId, value: &LitValue) -> Option<EnumConst> {
        let entry = self.defs.get(&def)?;
        entry
            .enum_members
            .iter()
            .find(|member| match (&member.value, value) {
                (LitValue::Number(a), LitValue::Number(b)) => a == b,
                (LitValue::Str(a), LitValue::Str(b)) => a == b,
                _ => false,
            })
            .cloned()
    }

    /// Walk the single-inheritance chain, `sub` included.
    pub fn is_subclass_of(&self, sub: DefId, ancestor: DefId) -> bool {
        let mut current = Some(sub);
        while let Some(def) = current {
            if def == ancestor {
                return true;
            }
            current = self.defs.get(&def).and_then(|entry| entry.extends);
        }
        false
    }

    /// Full method set of a type, in declaration order (inherited first).
    pub fn get_all_methods(&self, ty: TypeId) -> Vec<Arc<Method>> {
        let ty = self.resolve_alias(ty);
        match self.lookup(ty) {
            Some(TypeData::Number) => self.builtins.number.clone(),
            Some(TypeData::String) => {
                // `split` needs the store to intern List[String], so it joins
                // the fixed table here.
                let mut methods = self.builtins.string.clone();
                methods.push(self.string_split_method());
                methods
            }
            Some(TypeData::Bool) => self.builtins.boolean.clone(),
            Some(TypeData::Null) | Some(TypeData::Nullable(_)) => self.builtins.null.clone(),
            Some(TypeData::List(item)) => self.list_methods(item).as_ref().clone(),
            Some(TypeData::Class(def) | TypeData::Interface(def)) => self
                .def_info(def)
                .map(|info| info.methods)
                .unwrap_or_default(),
            // Enum instances expose their underlying representation's methods.
            Some(TypeData::Enum(def)) => self.get_all_methods(self.enum_underlying(def)),
            _ => Vec::new(),
        }
    }

    /// Look up a method overload accepting the given argument count. Method
    /// sets may contain several same-name overloads with different arities;
    /// later declarations shadow earlier (inherited) ones.
    pub fn get_method(&self, ty: TypeId, name: Atom, argc: usize) -> Option<Arc<Method>> {
        self.get_all_methods(ty)
            .into_iter()
            .rev()
            .find(|m| m.name == name && m.accepts_arity(argc))
    }

    /// Latest method with the given name regardless of arity, for
    /// arity-mismatch reporting and member navigation.
    pub fn find_method(&self, ty: TypeId, name: Atom) -> Option<Arc<Method>> {
        self.get_all_methods(ty)
            .into_iter()
            .rev()
            .find(|m| m.name == name)
    }

    pub(crate) fn list_methods(&self, item: TypeId) -> Arc<Vec<Arc<Method>>> {
        if let Some(cached) = self.list_method_cache.get(&item) {
            return cached.clone();
        }
        let methods = Arc::new(self.build_list_methods(item));
        self.list_method_cache.insert(item, methods.clone());
        methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MethodParam;
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
    fn class_method_shadowing_is_declared_first() {
        let store = store();
        let base = store.register_def(DefKind::Class, store.interner().intern("Base"));
        let derived = store.register_def(DefKind::Class, store.interner().intern("Derived"));
        store.set_def_extends(derived, base);

        let inherited = method(&store, "size", &[], TypeId::NUMBER);
        let own = method(&store, "size", &[], TypeId::STRING);
        store.set_def_methods(derived, vec![inherited, own]);

        let ty = store.class_type(derived);
        let name = store.interner().intern("size");
        let found = store.get_method(ty, name, 0).expect("method resolves");
        assert_eq!(found.return_type, TypeId::STRING);
    }

    #[test]
    fn overloads_resolve_by_arity() {
        let store = store();
        let def = store.register_def(DefKind::Class, store.interner().intern("C"));
        let unary = method(&store, "m", &[TypeId::NUMBER], TypeId::NUMBER);
        let binary = method(&store, "m", &[TypeId::NUMBER, TypeId::NUMBER], TypeId::STRING);
        store.set_def_methods(def, vec![unary, binary]);

        let ty = store.class_type(def);
        let name = store.interner().intern("m");
        assert_eq!(
            store.get_method(ty, name, 1).map(|m| m.return_type),
            Some(TypeId::NUMBER)
        );
        assert_eq!(
            store.get_method(ty, name, 2).map(|m| m.return_type),
            Some(TypeId::STRING)
        );
        assert!(store.get_method(ty, name, 3).is_none());
    }

    #[test]
    fn subclass_chain_walk() {
        let store = store();
        let a = store.register_def(DefKind::Class, store.interner().intern("A"));
        let b = store.register_def(DefKind::Class, store.interner().intern("B"));
        let c = store.register_def(DefKind::Class, store.interner().intern("C"));
        store.set_def_extends(b, a);
        store.set_def_extends(c, b);
        assert!(store.is_subclass_of(c, a));
        assert!(store.is_subclass_of(c, c));
        assert!(!store.is_subclass_of(a, c));
    }

    #[test]
    fn enum_const_lookup_by_value() {
        let store = store();
        let def = store.register_def(DefKind::Enum, store.interner().intern("Color"));
        store.set_enum_info(
            def,
            TypeId::STRING,
            vec![
                EnumConst {
                    name: store.interner().intern("Red"),
                    value: LitValue::Str(Arc::from("red")),
                },
                EnumConst {
                    name: store.interner().intern("Green"),
                    value: LitValue::Str(Arc::from("green")),
                },
            ],
        );
        let hit = store.enum_const_by_value(def, &LitValue::Str(Arc::from("green")));
        assert_eq!(
            hit.map(|c| c.name),
            Some(store.interner().intern("Green"))
        );
        assert!(
            store
                .enum_const_by_value(def, &LitValue::Str(Arc::from("blue")))
                .is_none()
        );
        assert_eq!(store.enum_underlying(def), TypeId::STRING);
    }
}
