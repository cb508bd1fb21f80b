//! Forward declaration of module-level names.
//!
//! Bodies may reference declarations that appear later in the file, so the
//! annotator sweeps the module before checking statements: enums first
//! (their constants are plain literals), then class and interface skeletons,
//! then supertype links, then method sets, then free functions with
//! provisional signatures. Filling runs parents-first along the extends
//! links so inherited method sets are complete when copied.

use crate::annotate::{Annotator, PreparedFn};
use crate::annotation::SymbolReference;
use crate::scope::{VarId, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::trace;
use yal_ast::{
    ClassDecl, EnumDecl, ExprKind, FuncDecl, Ident, InterfaceDecl, Param, Stmt, StmtKind, TypeExpr,
    TypeExprKind,
};
use yal_common::Atom;
use yal_types::{
    DefId, DefKind, EnumConst, FieldInfo, LitValue, Method, MethodParam, TypeData, TypeId,
};

impl Annotator<'_> {
    pub(crate) fn forward_declare(&mut self, statements: &[Stmt]) {
        // Phase one: every nominal name gets a definition and a meta binding
        // before any type expression is resolved.
        for stmt in statements {
            match &stmt.kind {
                StmtKind::Enum(decl) => self.forward_enum(decl),
                StmtKind::Class(decl) => {
                    self.register_nominal(DefKind::Class, decl.name);
                }
                StmtKind::Interface(decl) => {
                    self.register_nominal(DefKind::Interface, decl.name);
                }
                _ => {}
            }
        }

        // Phase two: supertype links.
        let mut classes: Vec<(DefId, &ClassDecl)> = Vec::new();
        let mut interfaces: Vec<(DefId, &InterfaceDecl)> = Vec::new();
        for stmt in statements {
            match &stmt.kind {
                StmtKind::Class(decl) => {
                    let Some(&def) = self.local_defs.get(&decl.name.name) else {
                        continue;
                    };
                    if let Some(parent) = decl.extends {
                        match self.lookup_def(parent) {
                            Some(parent_def)
                                if self.types.def_kind(parent_def) == Some(DefKind::Class) =>
                            {
                                self.types.set_def_extends(def, parent_def);
                            }
                            Some(_) => {
                                self.error(parent.span, "a class can only extend a class");
                            }
                            None => {
                                let shown =
                                    self.types.interner().resolve(parent.name).to_string();
                                self.error(parent.span, format!("unknown base class '{shown}'"));
                            }
                        }
                    }
                    classes.push((def, decl));
                }
                StmtKind::Interface(decl) => {
                    let Some(&def) = self.local_defs.get(&decl.name.name) else {
                        continue;
                    };
                    let mut supers = Vec::new();
                    for parent in &decl.extends {
                        match self.lookup_def(*parent) {
                            Some(parent_def)
                                if self.types.def_kind(parent_def)
                                    == Some(DefKind::Interface) =>
                            {
                                supers.push(parent_def);
                            }
                            Some(_) => {
                                self.error(
                                    parent.span,
                                    "an interface can only extend interfaces",
                                );
                            }
                            None => {
                                let shown =
                                    self.types.interner().resolve(parent.name).to_string();
                                self.error(
                                    parent.span,
                                    format!("unknown base interface '{shown}'"),
                                );
                            }
                        }
                    }
                    self.types.set_def_interfaces(def, supers);
                    interfaces.push((def, decl));
                }
                _ => {}
            }
        }

        // Phase three: fill method sets, parents first.
        let mut filled = FxHashSet::default();
        let mut in_progress = FxHashSet::default();
        let class_index: FxHashMap<DefId, &ClassDecl> = classes.iter().copied().collect();
        for &(def, _) in &classes {
            self.fill_class(def, &class_index, &mut filled, &mut in_progress);
        }
        let iface_index: FxHashMap<DefId, &InterfaceDecl> = interfaces.iter().copied().collect();
        for &(def, _) in &interfaces {
            self.fill_interface(def, &iface_index, &mut filled, &mut in_progress);
        }

        // Phase four: free functions get provisional signatures.
        for stmt in statements {
            if let StmtKind::Func(decl) = &stmt.kind {
                let (method, declared_ret, type_params, var) = self.prepare_function(decl, true);
                if let Some(var) = var {
                    self.fn_sigs.insert(
                        decl.name.name,
                        PreparedFn {
                            var,
                            method,
                            declared_ret,
                            type_params,
                        },
                    );
                }
            }
        }
    }

    fn register_nominal(&mut self, kind: DefKind, name: Ident) {
        let def = self.types.register_def(kind, name.name);
        let ty = self.types.meta_type(def);
        let var = Variable::new(name.name, ty, false, self.uri.clone(), name.span);
        if self.declare_or_diag(var, name.span).is_some() {
            self.local_defs.insert(name.name, def);
        }
        trace!(?kind, ?def, "registered nominal definition");
    }

    fn forward_enum(&mut self, decl: &EnumDecl) {
        let def = self.types.register_def(DefKind::Enum, decl.name.name);
        let mut members = Vec::new();
        let mut seen = FxHashSet::default();
        let mut underlying = TypeId::NEVER;
        for member in &decl.members {
            if !seen.insert(member.name.name) {
                let shown = self.types.interner().resolve(member.name.name).to_string();
                self.error(
                    member.name.span,
                    format!("duplicate enum member '{shown}'"),
                );
                continue;
            }
            match &member.value.kind {
                ExprKind::Number(n) => {
                    members.push(EnumConst {
                        name: member.name.name,
                        value: LitValue::Number(*n),
                    });
                    underlying = self.types.common_type(underlying, TypeId::NUMBER);
                }
                ExprKind::Str(s) => {
                    members.push(EnumConst {
                        name: member.name.name,
                        value: LitValue::Str(Arc::from(s.as_str())),
                    });
                    underlying = self.types.common_type(underlying, TypeId::STRING);
                }
                _ => {
                    self.error(
                        member.value.span,
                        "enum member value must be a number or string literal",
                    );
                }
            }
        }
        if members.is_empty() {
            underlying = TypeId::ANY;
        }
        self.types.set_enum_info(def, underlying, members);

        let ty = self.types.meta_type(def);
        let var = Variable::new(decl.name.name, ty, false, self.uri.clone(), decl.name.span);
        if self.declare_or_diag(var, decl.name.span).is_some() {
            self.local_defs.insert(decl.name.name, def);
        }
    }

    /// Resolve a name to a nominal definition: locally declared, or an
    /// imported meta binding.
    fn lookup_def(&mut self, name: Ident) -> Option<DefId> {
        if let Some(&def) = self.local_defs.get(&name.name) {
            return Some(def);
        }
        let var_id = self.scopes.lookup(self.frame, name.name)?;
        let var = self.scopes.var(var_id);
        let (decl_uri, decl_span, ty) = (var.decl_uri.clone(), var.decl_span, var.ty);
        match self.types.lookup(self.types.resolve_alias(ty)) {
            Some(TypeData::Meta(def)) => {
                self.references.push(SymbolReference {
                    span: name.span,
                    decl_uri,
                    decl_span,
                });
                Some(def)
            }
            _ => None,
        }
    }

    fn fill_class(
        &mut self,
        def: DefId,
        index: &FxHashMap<DefId, &ClassDecl>,
        filled: &mut FxHashSet<DefId>,
        in_progress: &mut FxHashSet<DefId>,
    ) {
        if filled.contains(&def) {
            return;
        }
        let Some(&decl) = index.get(&def) else {
            return;
        };
        if !in_progress.insert(def) {
            self.error(decl.name.span, "inheritance cycle");
            return;
        }

        let parent = self.types.def_info(def).and_then(|info| info.extends);
        let (mut methods, mut fields, mut ctor_params) = match parent {
            Some(parent_def) => {
                if index.contains_key(&parent_def) {
                    self.fill_class(parent_def, index, filled, in_progress);
                }
                let info = self.types.def_info(parent_def);
                let methods = info.as_ref().map(|i| i.methods.clone()).unwrap_or_default();
                let fields = info.as_ref().map(|i| i.fields.clone()).unwrap_or_default();
                let ctor_params = self
                    .types
                    .def_constructor(parent_def)
                    .map(|ctor| ctor.params.clone())
                    .unwrap_or_default();
                (methods, fields, ctor_params)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        for field in &decl.fields {
            let ty = self.resolve_type_expr(&field.ty);
            if fields.iter().any(|f| f.name == field.name.name) {
                let shown = self.types.interner().resolve(field.name.name).to_string();
                self.error(field.name.span, format!("duplicate field '{shown}'"));
                continue;
            }
            let field_var = self.scopes.alloc_unbound(Variable::new(
                field.name.name,
                ty,
                field.mutable,
                self.uri.clone(),
                field.name.span,
            ));
            fields.push(FieldInfo {
                name: field.name.name,
                ty,
                mutable: field.mutable,
            });
            ctor_params.push(MethodParam {
                name: field.name.name,
                ty,
                default: field.init.clone().map(Arc::new),
            });

            // Field access goes through a synthesized accessor pair; both
            // halves share the field's variable so navigation and rename
            // see one symbol.
            let mut getter = Method::new(field.name.name, Vec::new(), ty);
            getter.source_var = Some(field_var.0);
            methods.push(Arc::new(getter));
            if field.mutable {
                let mut setter = Method::new(
                    field.name.name,
                    vec![MethodParam {
                        name: self.wk.value,
                        ty,
                        default: None,
                    }],
                    TypeId::NULL,
                );
                setter.source_var = Some(field_var.0);
                methods.push(Arc::new(setter));
            }
        }

        for m in &decl.methods {
            if !m.type_params.is_empty() {
                self.error(m.name.span, "methods cannot declare type parameters");
            }
            let method = self.build_method_record(m);
            methods.push(method);
        }

        self.types.set_def_methods(def, methods);
        self.types.set_def_fields(def, fields.clone());
        let mut ctor = Method::new(decl.name.name, ctor_params, self.types.class_type(def));
        ctor.source_var = self
            .scopes
            .lookup_local(self.scopes.root(), decl.name.name)
            .map(|v| v.0);
        self.types.set_def_constructor(def, Arc::new(ctor));

        in_progress.remove(&def);
        filled.insert(def);
    }

    fn build_method_record(&mut self, decl: &FuncDecl) -> Arc<Method> {
        let params = self.resolve_params(&decl.params);
        let ret = decl
            .return_type
            .as_ref()
            .map_or(TypeId::NULL, |te| self.resolve_type_expr(te));
        let var_id = self.scopes.alloc_unbound(Variable::new(
            decl.name.name,
            TypeId::ANY,
            false,
            self.uri.clone(),
            decl.name.span,
        ));
        let mut method = Method::new(decl.name.name, params, ret);
        method.source_var = Some(var_id.0);
        let method = Arc::new(method);
        self.scopes.var_mut(var_id).ty = self.types.lambda(method.clone());
        method
    }

    fn fill_interface(
        &mut self,
        def: DefId,
        index: &FxHashMap<DefId, &InterfaceDecl>,
        filled: &mut FxHashSet<DefId>,
        in_progress: &mut FxHashSet<DefId>,
    ) {
        if filled.contains(&def) {
            return;
        }
        let Some(&decl) = index.get(&def) else {
            return;
        };
        if !in_progress.insert(def) {
            self.error(decl.name.span, "inheritance cycle");
            return;
        }

        let supers = self
            .types
            .def_info(def)
            .map(|info| info.interfaces)
            .unwrap_or_default();
        let mut methods = Vec::new();
        for parent in supers {
            if index.contains_key(&parent) {
                self.fill_interface(parent, index, filled, in_progress);
            }
            if let Some(info) = self.types.def_info(parent) {
                methods.extend(info.methods);
            }
        }

        for m in &decl.methods {
            let params = self.resolve_params(&m.params);
            let ret = self.resolve_type_expr(&m.return_type);
            let var_id = self.scopes.alloc_unbound(Variable::new(
                m.name.name,
                TypeId::ANY,
                false,
                self.uri.clone(),
                m.name.span,
            ));
            let mut method = Method::new(m.name.name, params, ret);
            method.source_var = Some(var_id.0);
            method.alias_for = m.alias_for;
            let method = Arc::new(method);
            self.scopes.var_mut(var_id).ty = self.types.lambda(method.clone());
            methods.push(method);
        }

        self.types.set_def_methods(def, methods);
        in_progress.remove(&def);
        filled.insert(def);
    }

    fn resolve_params(&mut self, params: &[Param]) -> Vec<MethodParam> {
        params
            .iter()
            .map(|p| MethodParam {
                name: p.name.name,
                ty: p
                    .ty
                    .as_ref()
                    .map_or(TypeId::ANY, |te| self.resolve_type_expr(te)),
                default: p.default.clone().map(Arc::new),
            })
            .collect()
    }

    /// Resolve a free function's signature; the binding stays provisional
    /// until its statement is checked and the return type finalized.
    pub(crate) fn prepare_function(
        &mut self,
        decl: &FuncDecl,
        _top_level: bool,
    ) -> (
        Arc<Method>,
        Option<TypeId>,
        FxHashMap<Atom, TypeId>,
        Option<VarId>,
    ) {
        let mut scoped = self.type_params.clone();
        let mut param_ids = Vec::new();
        for tp in &decl.type_params {
            let ty = self.types.fresh_type_param(tp.name);
            if let Some(TypeData::TypeParam(id)) = self.types.lookup(ty) {
                param_ids.push(id);
            }
            scoped.insert(tp.name, ty);
        }

        let saved = std::mem::replace(&mut self.type_params, scoped.clone());
        let params = self.resolve_params(&decl.params);
        let declared_ret = decl
            .return_type
            .as_ref()
            .map(|te| self.resolve_type_expr(te));
        self.type_params = saved;

        let mut method = Method::new(decl.name.name, params, declared_ret.unwrap_or(TypeId::ANY));
        method.type_params = param_ids;
        let method = Arc::new(method);
        let ty = self.types.lambda(method.clone());

        let mut var = Variable::new(decl.name.name, ty, false, self.uri.clone(), decl.name.span);
        var.provisional = true;
        var.doc = decl.doc.clone();
        let var_id = self.declare_or_diag(var, decl.name.span);
        (method, declared_ret, scoped, var_id)
    }

    // ----- type expressions -----

    pub(crate) fn resolve_type_expr(&mut self, te: &TypeExpr) -> TypeId {
        match &te.kind {
            TypeExprKind::Name(atom) => {
                let text = self.types.interner().resolve(*atom);
                match &*text {
                    "Any" => return TypeId::ANY,
                    "Never" => return TypeId::NEVER,
                    "Null" => return TypeId::NULL,
                    "Bool" => return TypeId::BOOL,
                    "Number" => return TypeId::NUMBER,
                    "String" => return TypeId::STRING,
                    _ => {}
                }
                if let Some(&ty) = self.type_params.get(atom) {
                    return ty;
                }
                if let Some(&def) = self.local_defs.get(atom) {
                    return self.def_instance_type(def);
                }
                if let Some(var_id) = self.scopes.lookup(self.frame, *atom) {
                    let var = self.scopes.var(var_id);
                    let (decl_uri, decl_span, ty) =
                        (var.decl_uri.clone(), var.decl_span, var.ty);
                    if let Some(TypeData::Meta(def)) =
                        self.types.lookup(self.types.resolve_alias(ty))
                    {
                        self.references.push(SymbolReference {
                            span: te.span,
                            decl_uri,
                            decl_span,
                        });
                        return self.def_instance_type(def);
                    }
                }
                self.error(te.span, format!("unknown type '{text}'"));
                TypeId::ANY
            }
            TypeExprKind::List(inner) => {
                let item = self.resolve_type_expr(inner);
                self.types.list(item)
            }
            TypeExprKind::Nullable(inner) => {
                let inner = self.resolve_type_expr(inner);
                self.types.nullable(inner)
            }
            TypeExprKind::Union(members) => {
                let members = members.iter().map(|m| self.resolve_type_expr(m)).collect();
                self.types.union(members)
            }
            TypeExprKind::Function { params, ret } => {
                let params: Vec<TypeId> =
                    params.iter().map(|p| self.resolve_type_expr(p)).collect();
                let ret = self.resolve_type_expr(ret);
                self.types.function_of(&params, ret)
            }
        }
    }

    fn def_instance_type(&self, def: DefId) -> TypeId {
        match self.types.def_kind(def) {
            Some(DefKind::Class) => self.types.class_type(def),
            Some(DefKind::Interface) => self.types.interface_type(def),
            Some(DefKind::Enum) => self.types.enum_type(def),
            None => TypeId::ANY,
        }
    }
}
