//! The `TypeStore`: interning tables and canonical type construction.
//!
//! Composite constructors (`list`, `nullable`, `union`, `function`, ...)
//! intern by structural key: calling one twice with structurally equal
//! arguments returns the identical `TypeId`. Subtyping and join rely on this
//! identity fast path.

use crate::builtins::BuiltinMethods;
use crate::types::{
    DefId, FunctionShape, FunctionShapeId, Method, MethodId, ModuleKey, ParamInfo, TypeData,
    TypeId, TypeListId, TypeParamId,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;
use yal_common::{Atom, Interner};

pub struct TypeStore {
    pub(crate) names: Arc<Interner>,

    type_by_key: DashMap<TypeData, TypeId>,
    type_data: DashMap<TypeId, TypeData>,
    next_type: AtomicU32,

    lists: DashMap<Vec<TypeId>, TypeListId>,
    list_data: DashMap<TypeListId, Arc<Vec<TypeId>>>,
    next_list: AtomicU32,

    shapes: DashMap<FunctionShape, FunctionShapeId>,
    shape_data: DashMap<FunctionShapeId, Arc<FunctionShape>>,
    next_shape: AtomicU32,

    methods: DashMap<MethodId, Arc<Method>>,
    next_method: AtomicU32,

    pub(crate) defs: DashMap<DefId, crate::def::DefInfo>,
    pub(crate) next_def: AtomicU32,

    type_param_names: DashMap<TypeParamId, Atom>,
    next_type_param: AtomicU32,

    /// Memoized interface conformance: (interface def, candidate type).
    pub(crate) conformance: DashMap<(DefId, TypeId), bool>,
    /// Pairs currently being computed; recursive queries answer optimistically.
    pub(crate) conformance_in_progress: DashMap<(DefId, TypeId), ()>,

    /// List method sets instantiated per item type.
    pub(crate) list_method_cache: DashMap<TypeId, Arc<Vec<Arc<Method>>>>,

    pub(crate) builtins: BuiltinMethods,
}

impl TypeStore {
    pub fn new(names: Arc<Interner>) -> Self {
        let store = Self {
            builtins: BuiltinMethods::build(&names),
            names,
            type_by_key: DashMap::new(),
            type_data: DashMap::new(),
            next_type: AtomicU32::new(TypeId::FIRST_COMPOSITE),
            lists: DashMap::new(),
            list_data: DashMap::new(),
            next_list: AtomicU32::new(0),
            shapes: DashMap::new(),
            shape_data: DashMap::new(),
            next_shape: AtomicU32::new(0),
            methods: DashMap::new(),
            next_method: AtomicU32::new(0),
            defs: DashMap::new(),
            next_def: AtomicU32::new(0),
            type_param_names: DashMap::new(),
            next_type_param: AtomicU32::new(0),
            conformance: DashMap::new(),
            conformance_in_progress: DashMap::new(),
            list_method_cache: DashMap::new(),
        };
        store.register_intrinsic(TypeId::ANY, TypeData::Any);
        store.register_intrinsic(TypeId::NEVER, TypeData::Never);
        store.register_intrinsic(TypeId::NULL, TypeData::Null);
        store.register_intrinsic(TypeId::BOOL, TypeData::Bool);
        store.register_intrinsic(TypeId::NUMBER, TypeData::Number);
        store.register_intrinsic(TypeId::STRING, TypeData::String);
        store
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.names
    }

    fn register_intrinsic(&self, id: TypeId, data: TypeData) {
        self.type_by_key.insert(data.clone(), id);
        self.type_data.insert(id, data);
    }

    /// Drop every derived table. Used on whole-workspace re-index; callers
    /// must not hold `TypeId`s across this.
    pub fn clear(&self) {
        self.type_by_key.clear();
        self.type_data.clear();
        self.next_type.store(TypeId::FIRST_COMPOSITE, Ordering::SeqCst);
        self.lists.clear();
        self.list_data.clear();
        self.next_list.store(0, Ordering::SeqCst);
        self.shapes.clear();
        self.shape_data.clear();
        self.next_shape.store(0, Ordering::SeqCst);
        self.methods.clear();
        self.next_method.store(0, Ordering::SeqCst);
        self.defs.clear();
        self.next_def.store(0, Ordering::SeqCst);
        self.type_param_names.clear();
        self.next_type_param.store(0, Ordering::SeqCst);
        self.conformance.clear();
        self.conformance_in_progress.clear();
        self.list_method_cache.clear();
        self.register_intrinsic(TypeId::ANY, TypeData::Any);
        self.register_intrinsic(TypeId::NEVER, TypeData::Never);
        self.register_intrinsic(TypeId::NULL, TypeData::Null);
        self.register_intrinsic(TypeId::BOOL, TypeData::Bool);
        self.register_intrinsic(TypeId::NUMBER, TypeData::Number);
        self.register_intrinsic(TypeId::STRING, TypeData::String);
    }

    fn intern_type(&self, data: TypeData) -> TypeId {
        if let Some(existing) = self.type_by_key.get(&data) {
            return *existing;
        }
        match self.type_by_key.entry(data.clone()) {
            Entry::Occupied(occupied) => *occupied.get(),
            Entry::Vacant(vacant) => {
                let id = TypeId(self.next_type.fetch_add(1, Ordering::SeqCst));
                trace!(?id, ?data, "intern type");
                self.type_data.insert(id, data);
                vacant.insert(id);
                id
            }
        }
    }

    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        self.type_data.get(&id).map(|entry| entry.clone())
    }

    fn intern_list(&self, members: Vec<TypeId>) -> TypeListId {
        if let Some(existing) = self.lists.get(&members) {
            return *existing;
        }
        match self.lists.entry(members.clone()) {
            Entry::Occupied(occupied) => *occupied.get(),
            Entry::Vacant(vacant) => {
                let id = TypeListId(self.next_list.fetch_add(1, Ordering::SeqCst));
                self.list_data.insert(id, Arc::new(members));
                vacant.insert(id);
                id
            }
        }
    }

    pub fn type_list(&self, id: TypeListId) -> Arc<Vec<TypeId>> {
        self.list_data
            .get(&id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    fn intern_shape(&self, shape: FunctionShape) -> FunctionShapeId {
        if let Some(existing) = self.shapes.get(&shape) {
            return *existing;
        }
        match self.shapes.entry(shape.clone()) {
            Entry::Occupied(occupied) => *occupied.get(),
            Entry::Vacant(vacant) => {
                let id = FunctionShapeId(self.next_shape.fetch_add(1, Ordering::SeqCst));
                self.shape_data.insert(id, Arc::new(shape));
                vacant.insert(id);
                id
            }
        }
    }

    pub fn shape(&self, id: FunctionShapeId) -> Option<Arc<FunctionShape>> {
        self.shape_data.get(&id).map(|entry| entry.clone())
    }

    pub fn register_method(&self, method: Arc<Method>) -> MethodId {
        let id = MethodId(self.next_method.fetch_add(1, Ordering::SeqCst));
        self.methods.insert(id, method);
        id
    }

    pub fn method(&self, id: MethodId) -> Option<Arc<Method>> {
        self.methods.get(&id).map(|entry| entry.clone())
    }

    // ----- constructors -----

    pub fn list(&self, item: TypeId) -> TypeId {
        self.intern_type(TypeData::List(item))
    }

    pub fn nullable(&self, inner: TypeId) -> TypeId {
        if inner == TypeId::ANY || inner == TypeId::NULL {
            return inner;
        }
        if inner == TypeId::NEVER {
            return TypeId::NULL;
        }
        if let Some(TypeData::Nullable(_)) = self.lookup(inner) {
            return inner;
        }
        self.intern_type(TypeData::Nullable(inner))
    }

    /// Normalized union: flattens nested unions, drops `Never`, collapses to
    /// `Any` when `Any` appears, and sorts members so member order never
    /// affects identity.
    pub fn union(&self, members: Vec<TypeId>) -> TypeId {
        let mut flat: SmallVec<[TypeId; 8]> = SmallVec::with_capacity(members.len());
        for member in members {
            match self.lookup(member) {
                Some(TypeData::Union(list)) => flat.extend(self.type_list(list).iter().copied()),
                _ => flat.push(member),
            }
        }
        if flat.iter().any(|&m| m == TypeId::ANY) {
            return TypeId::ANY;
        }
        flat.retain(|m| *m != TypeId::NEVER);
        flat.sort_unstable();
        flat.dedup();
        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => {
                let list = self.intern_list(flat.into_vec());
                self.intern_type(TypeData::Union(list))
            }
        }
    }

    pub fn function(&self, params: Vec<ParamInfo>, ret: TypeId) -> TypeId {
        let shape = self.intern_shape(FunctionShape { params, ret });
        self.intern_type(TypeData::Function(shape))
    }

    /// Positional function type from bare parameter types.
    pub fn function_of(&self, params: &[TypeId], ret: TypeId) -> TypeId {
        let params = params
            .iter()
            .map(|&ty| ParamInfo {
                name: None,
                ty,
                has_default: false,
            })
            .collect();
        self.function(params, ret)
    }

    pub fn lambda(&self, method: Arc<Method>) -> TypeId {
        let id = self.register_method(method);
        self.intern_type(TypeData::Lambda(id))
    }

    pub fn alias(&self, name: Atom, target: TypeId) -> TypeId {
        self.intern_type(TypeData::Alias { name, target })
    }

    pub fn fresh_type_param(&self, name: Atom) -> TypeId {
        let id = TypeParamId(self.next_type_param.fetch_add(1, Ordering::SeqCst));
        self.type_param_names.insert(id, name);
        self.intern_type(TypeData::TypeParam(id))
    }

    pub fn type_param_name(&self, id: TypeParamId) -> Option<Atom> {
        self.type_param_names.get(&id).map(|entry| *entry)
    }

    pub fn class_type(&self, def: DefId) -> TypeId {
        self.intern_type(TypeData::Class(def))
    }

    pub fn interface_type(&self, def: DefId) -> TypeId {
        self.intern_type(TypeData::Interface(def))
    }

    pub fn enum_type(&self, def: DefId) -> TypeId {
        self.intern_type(TypeData::Enum(def))
    }

    pub fn meta_type(&self, def: DefId) -> TypeId {
        self.intern_type(TypeData::Meta(def))
    }

    pub fn module_type(&self, key: ModuleKey) -> TypeId {
        self.intern_type(TypeData::Module(key))
    }

    /// The positional shape of a lambda, for assignability against function
    /// targets.
    pub fn shape_of_lambda(&self, id: MethodId) -> Option<Arc<FunctionShape>> {
        let method = self.method(id)?;
        let params = method
            .params
            .iter()
            .map(|p| ParamInfo {
                name: Some(p.name),
                ty: p.ty,
                has_default: p.default.is_some(),
            })
            .collect();
        let shape_id = self.intern_shape(FunctionShape {
            params,
            ret: method.return_type,
        });
        self.shape(shape_id)
    }

    /// Strip transparent aliases.
    pub fn resolve_alias(&self, mut ty: TypeId) -> TypeId {
        while let Some(TypeData::Alias { target, .. }) = self.lookup(ty) {
            ty = target;
        }
        ty
    }

    /// Human-readable type name for diagnostics.
    pub fn display(&self, ty: TypeId) -> String {
        match self.lookup(ty) {
            None => "<unknown>".to_string(),
            Some(TypeData::Any) => "Any".to_string(),
            Some(TypeData::Never) => "Never".to_string(),
            Some(TypeData::Null) => "Null".to_string(),
            Some(TypeData::Bool) => "Bool".to_string(),
            Some(TypeData::Number) => "Number".to_string(),
            Some(TypeData::String) => "String".to_string(),
            Some(TypeData::List(item)) => format!("List[{}]", self.display(item)),
            Some(TypeData::Nullable(inner)) => format!("{}?", self.display(inner)),
            Some(TypeData::Union(list)) => {
                let members = self.type_list(list);
                let parts: Vec<String> = members.iter().map(|&m| self.display(m)).collect();
                parts.join(" | ")
            }
            Some(TypeData::Function(shape_id)) => match self.shape(shape_id) {
                Some(shape) => {
                    let params: Vec<String> =
                        shape.params.iter().map(|p| self.display(p.ty)).collect();
                    format!("({}) => {}", params.join(", "), self.display(shape.ret))
                }
                None => "<function>".to_string(),
            },
            Some(TypeData::Lambda(method_id)) => match self.method(method_id) {
                Some(method) => {
                    let params: Vec<String> =
                        method.params.iter().map(|p| self.display(p.ty)).collect();
                    format!(
                        "({}) => {}",
                        params.join(", "),
                        self.display(method.return_type)
                    )
                }
                None => "<lambda>".to_string(),
            },
            Some(
                TypeData::Class(def) | TypeData::Interface(def) | TypeData::Enum(def),
            ) => self
                .def_name(def)
                .map(|name| self.names.resolve(name).to_string())
                .unwrap_or_else(|| "<def>".to_string()),
            Some(TypeData::Meta(def)) => {
                let name = self
                    .def_name(def)
                    .map(|name| self.names.resolve(name).to_string())
                    .unwrap_or_else(|| "<def>".to_string());
                format!("type[{name}]")
            }
            Some(TypeData::Module(_)) => "Module".to_string(),
            Some(TypeData::TypeParam(id)) => self
                .type_param_name(id)
                .map(|name| self.names.resolve(name).to_string())
                .unwrap_or_else(|| "<T>".to_string()),
            Some(TypeData::Alias { name, .. }) => self.names.resolve(name).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TypeStore {
        TypeStore::new(Arc::new(Interner::new()))
    }

    #[test]
    fn intrinsics_are_preregistered() {
        let store = store();
        assert_eq!(store.lookup(TypeId::ANY), Some(TypeData::Any));
        assert_eq!(store.lookup(TypeId::NUMBER), Some(TypeData::Number));
        assert_eq!(store.lookup(TypeId::STRING), Some(TypeData::String));
    }

    #[test]
    fn list_constructor_is_identity_cached() {
        let store = store();
        assert_eq!(store.list(TypeId::NUMBER), store.list(TypeId::NUMBER));
        assert_ne!(store.list(TypeId::NUMBER), store.list(TypeId::STRING));
        // Repeated and order-independent calls keep the same identity.
        let nested_a = store.list(store.list(TypeId::STRING));
        let _ = store.list(TypeId::BOOL);
        let nested_b = store.list(store.list(TypeId::STRING));
        assert_eq!(nested_a, nested_b);
    }

    #[test]
    fn function_constructor_is_identity_cached() {
        let store = store();
        let a = store.function_of(&[TypeId::NUMBER, TypeId::STRING], TypeId::BOOL);
        let b = store.function_of(&[TypeId::NUMBER, TypeId::STRING], TypeId::BOOL);
        let c = store.function_of(&[TypeId::STRING, TypeId::NUMBER], TypeId::BOOL);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn nullable_normalizes() {
        let store = store();
        let opt_num = store.nullable(TypeId::NUMBER);
        assert_eq!(store.nullable(opt_num), opt_num);
        assert_eq!(store.nullable(TypeId::NULL), TypeId::NULL);
        assert_eq!(store.nullable(TypeId::ANY), TypeId::ANY);
        assert_eq!(store.nullable(TypeId::NEVER), TypeId::NULL);
    }

    #[test]
    fn union_normalizes_and_is_order_independent() {
        let store = store();
        let a = store.union(vec![TypeId::NUMBER, TypeId::STRING]);
        let b = store.union(vec![TypeId::STRING, TypeId::NUMBER]);
        assert_eq!(a, b);
        assert_eq!(store.union(vec![TypeId::NUMBER]), TypeId::NUMBER);
        assert_eq!(store.union(vec![]), TypeId::NEVER);
        assert_eq!(
            store.union(vec![TypeId::NUMBER, TypeId::ANY]),
            TypeId::ANY
        );
        assert_eq!(
            store.union(vec![TypeId::NUMBER, TypeId::NEVER]),
            TypeId::NUMBER
        );
        let nested = store.union(vec![TypeId::NUMBER, a]);
        assert_eq!(nested, a);
    }

    #[test]
    fn aliases_are_transparent() {
        let store = store();
        let name = store.names.intern("Id");
        let alias = store.alias(name, TypeId::NUMBER);
        assert_ne!(alias, TypeId::NUMBER);
        assert_eq!(store.resolve_alias(alias), TypeId::NUMBER);
        assert_eq!(store.display(alias), "Id");
    }

    #[test]
    fn display_covers_composites() {
        let store = store();
        let list = store.list(TypeId::NUMBER);
        assert_eq!(store.display(list), "List[Number]");
        let opt = store.nullable(TypeId::STRING);
        assert_eq!(store.display(opt), "String?");
        let func = store.function_of(&[TypeId::NUMBER], TypeId::STRING);
        assert_eq!(store.display(func), "(Number) => String");
    }
}
