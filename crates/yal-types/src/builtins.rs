//! Builtin method tables for primitive types.
//!
//! A closed table per primitive kind; the same tables back method-call
//! resolution and the constant evaluator, so the two can never disagree on
//! what exists. List methods are generic over the item type and get
//! instantiated per item `TypeId` (cached in the store).

use crate::intern::TypeStore;
use crate::types::{Method, MethodParam, TypeId};
use std::sync::Arc;
use yal_common::Interner;

pub(crate) struct BuiltinMethods {
    pub number: Vec<Arc<Method>>,
    pub string: Vec<Arc<Method>>,
    pub boolean: Vec<Arc<Method>>,
    pub null: Vec<Arc<Method>>,
}

fn entry(names: &Interner, name: &str, params: &[(&str, TypeId)], ret: TypeId) -> Arc<Method> {
    let params = params
        .iter()
        .map(|&(pname, ty)| MethodParam {
            name: names.intern(pname),
            ty,
            default: None,
        })
        .collect();
    Arc::new(Method::new(names.intern(name), params, ret))
}

impl BuiltinMethods {
    pub fn build(names: &Interner) -> Self {
        const ANY: TypeId = TypeId::ANY;
        const BOOL: TypeId = TypeId::BOOL;
        const NUMBER: TypeId = TypeId::NUMBER;
        const STRING: TypeId = TypeId::STRING;

        let number = vec![
            entry(names, "__op_add__", &[("other", NUMBER)], NUMBER),
            entry(names, "__op_sub__", &[("other", NUMBER)], NUMBER),
            entry(names, "__op_mul__", &[("other", NUMBER)], NUMBER),
            entry(names, "__op_div__", &[("other", NUMBER)], NUMBER),
            entry(names, "__op_mod__", &[("other", NUMBER)], NUMBER),
            entry(names, "__op_neg__", &[], NUMBER),
            entry(names, "__op_eq__", &[("other", ANY)], BOOL),
            entry(names, "__op_ne__", &[("other", ANY)], BOOL),
            entry(names, "__op_lt__", &[("other", NUMBER)], BOOL),
            entry(names, "__op_le__", &[("other", NUMBER)], BOOL),
            entry(names, "__op_gt__", &[("other", NUMBER)], BOOL),
            entry(names, "__op_ge__", &[("other", NUMBER)], BOOL),
            entry(names, "floor", &[], NUMBER),
            entry(names, "abs", &[], NUMBER),
            entry(names, "toString", &[], STRING),
        ];

        let string = vec![
            entry(names, "__op_add__", &[("other", STRING)], STRING),
            entry(names, "__op_eq__", &[("other", ANY)], BOOL),
            entry(names, "__op_ne__", &[("other", ANY)], BOOL),
            entry(names, "__op_lt__", &[("other", STRING)], BOOL),
            entry(names, "__op_le__", &[("other", STRING)], BOOL),
            entry(names, "__op_gt__", &[("other", STRING)], BOOL),
            entry(names, "__op_ge__", &[("other", STRING)], BOOL),
            entry(names, "__op_index__", &[("index", NUMBER)], STRING),
            entry(names, "length", &[], NUMBER),
            entry(names, "substring", &[("start", NUMBER), ("end", NUMBER)], STRING),
            entry(names, "indexOf", &[("needle", STRING)], NUMBER),
            entry(names, "toString", &[], STRING),
        ];

        let boolean = vec![
            entry(names, "__op_eq__", &[("other", ANY)], BOOL),
            entry(names, "__op_ne__", &[("other", ANY)], BOOL),
            entry(names, "__op_not__", &[], BOOL),
            entry(names, "toString", &[], STRING),
        ];

        let null = vec![
            entry(names, "__op_eq__", &[("other", ANY)], BOOL),
            entry(names, "__op_ne__", &[("other", ANY)], BOOL),
        ];

        Self {
            number,
            string,
            boolean,
            null,
        }
    }
}

impl TypeStore {
    /// Instantiate the list method set with a concrete item type.
    pub(crate) fn build_list_methods(&self, item: TypeId) -> Vec<Arc<Method>> {
        const ANY: TypeId = TypeId::ANY;
        const BOOL: TypeId = TypeId::BOOL;
        const NUMBER: TypeId = TypeId::NUMBER;
        const STRING: TypeId = TypeId::STRING;
        let names = self.interner();
        let list_ty = self.list(item);
        vec![
            entry(names, "length", &[], NUMBER),
            entry(names, "__op_index__", &[("index", NUMBER)], item),
            entry(names, "__op_add__", &[("other", list_ty)], list_ty),
            entry(names, "__op_eq__", &[("other", ANY)], BOOL),
            entry(names, "__op_ne__", &[("other", ANY)], BOOL),
            entry(names, "push", &[("value", item)], TypeId::NULL),
            entry(names, "pop", &[], self.nullable(item)),
            entry(names, "join", &[("separator", STRING)], STRING),
        ]
    }
}

// String literal types do not exist in this type system; a `split` result is
// always a plain List[String].
impl TypeStore {
    pub(crate) fn string_split_method(&self) -> Arc<Method> {
        let names = self.interner();
        let list_string = self.list(TypeId::STRING);
        entry(names, "split", &[("separator", TypeId::STRING)], list_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TypeStore {
        TypeStore::new(Arc::new(Interner::new()))
    }

    #[test]
    fn number_operators_exist() {
        let store = store();
        let add = store.interner().intern("__op_add__");
        let m = store
            .get_method(TypeId::NUMBER, add, 1)
            .expect("Number has __op_add__");
        assert_eq!(m.return_type, TypeId::NUMBER);
        assert_eq!(m.params[0].ty, TypeId::NUMBER);
    }

    #[test]
    fn list_methods_are_instantiated_per_item() {
        let store = store();
        let index = store.interner().intern("__op_index__");
        let list_num = store.list(TypeId::NUMBER);
        let m = store
            .get_method(list_num, index, 1)
            .expect("List has __op_index__");
        assert_eq!(m.return_type, TypeId::NUMBER);

        let list_str = store.list(TypeId::STRING);
        let m = store
            .get_method(list_str, index, 1)
            .expect("List has __op_index__");
        assert_eq!(m.return_type, TypeId::STRING);
    }

    #[test]
    fn list_pop_is_nullable() {
        let store = store();
        let pop = store.interner().intern("pop");
        let list_num = store.list(TypeId::NUMBER);
        let m = store.get_method(list_num, pop, 0).expect("pop resolves");
        assert_eq!(m.return_type, store.nullable(TypeId::NUMBER));
    }
}
