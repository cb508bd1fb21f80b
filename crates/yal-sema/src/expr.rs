//! Expression checking and lowering.
//!
//! `check_expr` is bidirectional: the `hint` parameter threads the expected
//! type downward (`TypeId::ANY` means no expectation) and is what lets bare
//! literals match enum constants, empty lists adopt their declared item
//! type, and unannotated function-literal parameters borrow the target
//! shape. Every expression yields its type, its statically-known value when
//! constant evaluation succeeds, and its lowered IR.

use crate::annotate::Annotator;
use crate::annotation::{CallRecord, CompletionAnchor, PrintRecord, SymbolReference};
use crate::consteval::{self, ConstValue};
use crate::ir::{IrExpr, RecvKind};
use crate::scope::VarId;
use smallvec::SmallVec;
use std::sync::Arc;
use yal_ast::{Expr, ExprKind, FuncLit, Ident, LogicOp};
use yal_common::Span;
use yal_types::{
    DefKind, GenericCallError, LitValue, Method, MethodParam, TypeData, TypeId,
};

pub(crate) struct ExprInfo {
    pub ty: TypeId,
    pub value: Option<ConstValue>,
    pub ir: IrExpr,
}

impl ExprInfo {
    fn any(ir: IrExpr) -> Self {
        Self {
            ty: TypeId::ANY,
            value: None,
            ir,
        }
    }
}

/// Outcome of resolving one call against a method signature.
struct CallOutcome {
    ty: TypeId,
    value: Option<ConstValue>,
    args: Vec<IrExpr>,
}

impl Annotator<'_> {
    /// Mismatches where the source is already `Any` stay silent: `Any` is
    /// the error-recovery type and has produced a diagnostic upstream.
    pub(crate) fn check_assignable(&mut self, source: TypeId, target: TypeId, span: Span) {
        if source == TypeId::ANY {
            return;
        }
        if !self.types.is_assignable_to(source, target) {
            let source_shown = self.types.display(source);
            let target_shown = self.types.display(target);
            self.error(
                span,
                format!("type '{source_shown}' is not assignable to '{target_shown}'"),
            );
        }
    }

    fn recv_kind(&self, ty: TypeId) -> RecvKind {
        let mut resolved = self.types.resolve_alias(ty);
        if let Some(TypeData::Enum(def)) = self.types.lookup(resolved) {
            resolved = self.types.enum_underlying(def);
        }
        match self.types.lookup(resolved) {
            Some(TypeData::Number) => RecvKind::Number,
            Some(TypeData::String) => RecvKind::String,
            Some(TypeData::Bool) => RecvKind::Bool,
            Some(TypeData::Null | TypeData::Nullable(_)) => RecvKind::Null,
            Some(TypeData::List(_)) => RecvKind::List,
            _ => RecvKind::General,
        }
    }

    fn enum_hint(&self, hint: TypeId) -> Option<yal_types::DefId> {
        match self.types.lookup(self.types.resolve_alias(hint)) {
            Some(TypeData::Enum(def)) => Some(def),
            _ => None,
        }
    }

    pub(crate) fn check_expr(&mut self, expr: &Expr, hint: TypeId) -> ExprInfo {
        match &expr.kind {
            ExprKind::Null => ExprInfo {
                ty: TypeId::NULL,
                value: Some(ConstValue::Null),
                ir: IrExpr::Null,
            },
            ExprKind::Bool(b) => ExprInfo {
                ty: TypeId::BOOL,
                value: Some(ConstValue::Bool(*b)),
                ir: IrExpr::Bool(*b),
            },
            ExprKind::Number(n) => {
                let ty = self
                    .enum_hint(hint)
                    .and_then(|def| {
                        self.types
                            .enum_const_by_value(def, &LitValue::Number(*n))
                            .map(|_| self.types.enum_type(def))
                    })
                    .unwrap_or(TypeId::NUMBER);
                ExprInfo {
                    ty,
                    value: Some(ConstValue::Number(*n)),
                    ir: IrExpr::Number(*n),
                }
            }
            ExprKind::Str(s) => {
                let ty = self
                    .enum_hint(hint)
                    .and_then(|def| {
                        self.types
                            .enum_const_by_value(def, &LitValue::Str(Arc::from(s.as_str())))
                            .map(|_| self.types.enum_type(def))
                    })
                    .unwrap_or(TypeId::STRING);
                ExprInfo {
                    ty,
                    value: Some(ConstValue::Str(Arc::from(s.as_str()))),
                    ir: IrExpr::Str(s.clone()),
                }
            }
            ExprKind::ListLit(items) => self.check_list_lit(items, hint),
            ExprKind::Ident(name) => self.check_ident(*name, expr.span),
            ExprKind::Member { owner, name } => self.check_member(owner, *name),
            ExprKind::Index { owner, index } => self.check_index(owner, index),
            ExprKind::Call { callee, args } => self.check_call(expr.span, callee, args, hint),
            ExprKind::Binary { op, lhs, rhs } => {
                let owner = self.check_expr(lhs, TypeId::ANY);
                let name = Ident {
                    name: self.types.interner().intern(op.method_name()),
                    span: expr.span,
                };
                self.check_method_call(name, owner, std::slice::from_ref(rhs), hint)
            }
            ExprKind::Unary { op, operand } => {
                let owner = self.check_expr(operand, TypeId::ANY);
                let name = Ident {
                    name: self.types.interner().intern(op.method_name()),
                    span: expr.span,
                };
                self.check_method_call(name, owner, &[], hint)
            }
            ExprKind::Logic { op, lhs, rhs } => self.check_logic(*op, lhs, rhs),
            ExprKind::FunctionLit(lit) => self.check_function_lit(expr.span, lit, hint),
        }
    }

    fn check_list_lit(&mut self, items: &[Expr], hint: TypeId) -> ExprInfo {
        let hint_item = match self.types.lookup(self.types.resolve_alias(hint)) {
            Some(TypeData::List(item)) => Some(item),
            _ => None,
        };
        let mut infos = Vec::with_capacity(items.len());
        let item_ty = match hint_item {
            Some(item) => {
                for expr in items {
                    let info = self.check_expr(expr, item);
                    self.check_assignable(info.ty, item, expr.span);
                    infos.push(info);
                }
                item
            }
            None => {
                let mut joined = TypeId::NEVER;
                for expr in items {
                    let info = self.check_expr(expr, TypeId::ANY);
                    joined = self.types.common_type(joined, info.ty);
                    infos.push(info);
                }
                joined
            }
        };
        let value = infos
            .iter()
            .map(|info| info.value.clone())
            .collect::<Option<Vec<_>>>()
            .map(|values| ConstValue::List(Arc::new(values)));
        ExprInfo {
            ty: self.types.list(item_ty),
            value,
            ir: IrExpr::List(infos.into_iter().map(|info| info.ir).collect()),
        }
    }

    fn check_ident(&mut self, name: yal_common::Atom, span: Span) -> ExprInfo {
        let Some(var_id) = self.scopes.lookup(self.frame, name) else {
            let shown = self.types.interner().resolve(name).to_string();
            self.error(span, format!("unknown name '{shown}'"));
            return ExprInfo::any(IrExpr::Name(name));
        };
        let (ty, value, provisional, decl_uri, decl_span) = {
            let var = self.scopes.var(var_id);
            (
                var.ty,
                var.value.clone(),
                var.provisional,
                var.decl_uri.clone(),
                var.decl_span,
            )
        };
        if provisional {
            // The declaration has not been finalized yet; the reference is
            // retro-linked when it is.
            self.scopes.var_mut(var_id).pending_refs.push(span);
        } else {
            self.references.push(SymbolReference {
                span,
                decl_uri,
                decl_span,
            });
        }
        ExprInfo {
            ty,
            value,
            ir: IrExpr::Name(name),
        }
    }

    /// Member access on a module binding.
    fn module_member(&mut self, owner: ExprInfo, name: Ident) -> ExprInfo {
        let Some(TypeData::Module(key)) = self.types.lookup(self.types.resolve_alias(owner.ty))
        else {
            return ExprInfo::any(IrExpr::Member {
                owner: Box::new(owner.ir),
                name: name.name,
            });
        };
        let ir = IrExpr::Member {
            owner: Box::new(owner.ir),
            name: name.name,
        };
        let Some(dep) = self.cache.lookup_module(key) else {
            return ExprInfo::any(ir);
        };
        match dep.export(name.name) {
            Some(export) => {
                self.references.push(SymbolReference {
                    span: name.span,
                    decl_uri: dep.uri.clone(),
                    decl_span: export.decl_span,
                });
                ExprInfo {
                    ty: export.ty,
                    value: export.value.clone(),
                    ir,
                }
            }
            None => {
                let shown = self.types.interner().resolve(name.name).to_string();
                self.error(
                    name.span,
                    format!("module \"{}\" has no export named '{shown}'", dep.uri),
                );
                ExprInfo::any(ir)
            }
        }
    }

    fn check_member(&mut self, owner_expr: &Expr, name: Ident) -> ExprInfo {
        let owner = self.check_expr(owner_expr, TypeId::ANY);
        self.completions.push(CompletionAnchor {
            span: name.span,
            owner_ty: owner.ty,
        });
        let resolved = self.types.resolve_alias(owner.ty);
        match self.types.lookup(resolved) {
            Some(TypeData::Module(_)) => self.module_member(owner, name),
            Some(TypeData::Meta(def)) => match self.types.def_kind(def) {
                Some(DefKind::Enum) => {
                    let members = self.types.enum_const_variables(def);
                    match members.iter().find(|m| m.name == name.name) {
                        Some(constant) => ExprInfo {
                            ty: self.types.enum_type(def),
                            value: Some(ConstValue::from_lit(&constant.value)),
                            // Enum constants are erased; uses fold to their
                            // literal value.
                            ir: lit_to_ir(&constant.value),
                        },
                        None => {
                            let enum_shown = self.types.display(resolved);
                            let shown = self.types.interner().resolve(name.name).to_string();
                            self.error(
                                name.span,
                                format!("'{enum_shown}' has no member '{shown}'"),
                            );
                            ExprInfo::any(IrExpr::Null)
                        }
                    }
                }
                _ => {
                    self.error(name.span, "type names have no members");
                    ExprInfo::any(IrExpr::Member {
                        owner: Box::new(owner.ir),
                        name: name.name,
                    })
                }
            },
            Some(TypeData::Class(def)) => match self.types.field_of(def, name.name) {
                Some(field) => {
                    self.record_member_ref(resolved, name.name, name.span);
                    ExprInfo {
                        ty: field.ty,
                        value: None,
                        ir: IrExpr::Member {
                            owner: Box::new(owner.ir),
                            name: name.name,
                        },
                    }
                }
                None => self.member_read_error(resolved, owner, name),
            },
            Some(TypeData::Any) => ExprInfo::any(IrExpr::Member {
                owner: Box::new(owner.ir),
                name: name.name,
            }),
            _ => self.member_read_error(resolved, owner, name),
        }
    }

    fn member_read_error(&mut self, resolved: TypeId, owner: ExprInfo, name: Ident) -> ExprInfo {
        let shown = self.types.interner().resolve(name.name).to_string();
        if self.types.find_method(resolved, name.name).is_some() {
            self.error(name.span, format!("method '{shown}' must be called"));
        } else {
            let ty_shown = self.types.display(owner.ty);
            self.error(
                name.span,
                format!("no member '{shown}' on type '{ty_shown}'"),
            );
        }
        ExprInfo::any(IrExpr::Member {
            owner: Box::new(owner.ir),
            name: name.name,
        })
    }

    fn check_index(&mut self, owner_expr: &Expr, index_expr: &Expr) -> ExprInfo {
        let owner = self.check_expr(owner_expr, TypeId::ANY);
        let resolved = self.types.resolve_alias(owner.ty);
        match self.types.lookup(resolved) {
            Some(TypeData::List(item)) => {
                let index = self.check_expr(index_expr, TypeId::NUMBER);
                self.check_assignable(index.ty, TypeId::NUMBER, index_expr.span);
                let value = fold_call(&owner.value, "__op_index__", &[&index.value]);
                ExprInfo {
                    ty: item,
                    value,
                    ir: IrExpr::Index {
                        owner: Box::new(owner.ir),
                        index: Box::new(index.ir),
                    },
                }
            }
            Some(TypeData::String) => {
                let index = self.check_expr(index_expr, TypeId::NUMBER);
                self.check_assignable(index.ty, TypeId::NUMBER, index_expr.span);
                let value = fold_call(&owner.value, "__op_index__", &[&index.value]);
                ExprInfo {
                    ty: TypeId::STRING,
                    value,
                    ir: IrExpr::Index {
                        owner: Box::new(owner.ir),
                        index: Box::new(index.ir),
                    },
                }
            }
            Some(TypeData::Any) => {
                let index = self.check_expr(index_expr, TypeId::ANY);
                ExprInfo::any(IrExpr::Index {
                    owner: Box::new(owner.ir),
                    index: Box::new(index.ir),
                })
            }
            _ => {
                // Anything else goes through its `__op_index__` method.
                let name = Ident {
                    name: self.wk.op_index,
                    span: index_expr.span,
                };
                self.check_method_call(name, owner, std::slice::from_ref(index_expr), TypeId::ANY)
            }
        }
    }

    fn check_logic(&mut self, op: LogicOp, lhs: &Expr, rhs: &Expr) -> ExprInfo {
        let left = self.check_expr(lhs, TypeId::BOOL);
        self.check_assignable(left.ty, TypeId::BOOL, lhs.span);
        let right = self.check_expr(rhs, TypeId::BOOL);
        self.check_assignable(right.ty, TypeId::BOOL, rhs.span);
        let and = op == LogicOp::And;
        let value = match (&left.value, &right.value) {
            (Some(ConstValue::Bool(l)), _) if *l != and => Some(ConstValue::Bool(*l)),
            (Some(ConstValue::Bool(_)), Some(ConstValue::Bool(r))) => Some(ConstValue::Bool(*r)),
            _ => None,
        };
        ExprInfo {
            ty: TypeId::BOOL,
            value,
            ir: IrExpr::Logic {
                and,
                lhs: Box::new(left.ir),
                rhs: Box::new(right.ir),
            },
        }
    }

    fn check_function_lit(&mut self, span: Span, lit: &FuncLit, hint: TypeId) -> ExprInfo {
        let hint_shape = self.types.callable_shape(self.types.resolve_alias(hint));
        let params: Vec<MethodParam> = lit
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let ty = match &p.ty {
                    Some(te) => self.resolve_type_expr(te),
                    None => hint_shape
                        .as_ref()
                        .and_then(|shape| shape.params.get(i))
                        .map_or(TypeId::ANY, |param| param.ty),
                };
                MethodParam {
                    name: p.name.name,
                    ty,
                    default: p.default.clone().map(Arc::new),
                }
            })
            .collect();
        let declared_ret = lit
            .return_type
            .as_ref()
            .map(|te| self.resolve_type_expr(te))
            .or_else(|| {
                hint_shape
                    .as_ref()
                    .and_then(|shape| (shape.ret != TypeId::ANY).then_some(shape.ret))
            });

        let name = self.types.interner().intern("<lambda>");
        let method = Method::new(name, params, declared_ret.unwrap_or(TypeId::ANY));
        let (final_ret, body_ir) = self.check_callable_body(
            span,
            &method,
            &lit.params,
            declared_ret,
            &lit.body,
            None,
            self.type_params.clone(),
        );
        let mut final_method = method;
        final_method.return_type = final_ret;
        ExprInfo {
            ty: self.types.lambda(Arc::new(final_method)),
            value: None,
            ir: IrExpr::FunctionLit {
                params: lit.params.iter().map(|p| p.name.name).collect(),
                body: body_ir,
            },
        }
    }

    // ----- calls -----

    fn check_call(&mut self, span: Span, callee: &Expr, args: &[Expr], hint: TypeId) -> ExprInfo {
        if let ExprKind::Ident(name) = &callee.kind
            && self.scopes.lookup(self.frame, *name) == self.print_var
            && self.print_var.is_some()
        {
            return self.check_print(span, args);
        }
        if let ExprKind::Member { owner, name } = &callee.kind {
            let owner_info = self.check_expr(owner, TypeId::ANY);
            self.completions.push(CompletionAnchor {
                span: name.span,
                owner_ty: owner_info.ty,
            });
            let resolved = self.types.resolve_alias(owner_info.ty);
            if let Some(TypeData::Module(_)) = self.types.lookup(resolved) {
                let member = self.module_member(owner_info, *name);
                return self.check_call_value(member, name.span, args, hint);
            }
            return self.check_method_call(*name, owner_info, args, hint);
        }
        let callee_info = self.check_expr(callee, TypeId::ANY);
        self.check_call_value(callee_info, callee.span, args, hint)
    }

    fn check_print(&mut self, span: Span, args: &[Expr]) -> ExprInfo {
        if args.len() != 1 {
            self.error(span, "print takes exactly one argument");
        }
        let infos: Vec<ExprInfo> = args
            .iter()
            .map(|arg| self.check_expr(arg, TypeId::ANY))
            .collect();
        self.prints.push(PrintRecord {
            span,
            value: infos.first().and_then(|info| info.value.clone()),
        });
        ExprInfo {
            ty: TypeId::NULL,
            value: None,
            ir: IrExpr::Print(infos.into_iter().map(|info| info.ir).collect()),
        }
    }

    /// Call a first-class value: a function binding, a lambda, or a class
    /// name (construction).
    fn check_call_value(
        &mut self,
        callee: ExprInfo,
        callee_span: Span,
        args: &[Expr],
        hint: TypeId,
    ) -> ExprInfo {
        let resolved = self.types.resolve_alias(callee.ty);
        match self.types.lookup(resolved) {
            Some(TypeData::Lambda(method_id)) => {
                let Some(method) = self.types.method(method_id) else {
                    return self.check_args_loosely(args, IrExpr::Call {
                        callee: Box::new(callee.ir),
                        args: Vec::new(),
                    });
                };
                let outcome = self.resolve_call(None, &method, callee_span, args, hint);
                ExprInfo {
                    ty: outcome.ty,
                    value: outcome.value,
                    ir: IrExpr::Call {
                        callee: Box::new(callee.ir),
                        args: outcome.args,
                    },
                }
            }
            Some(TypeData::Function(shape_id)) => {
                let Some(shape) = self.types.shape(shape_id) else {
                    return ExprInfo::any(callee.ir);
                };
                if args.len() < shape.min_arity() || args.len() > shape.params.len() {
                    self.error(callee_span, "wrong number of arguments");
                    return self.check_args_loosely(args, IrExpr::Call {
                        callee: Box::new(callee.ir),
                        args: Vec::new(),
                    });
                }
                let mut arg_irs = Vec::with_capacity(args.len());
                for (arg, param) in args.iter().zip(&shape.params) {
                    let info = self.check_expr(arg, param.ty);
                    self.check_assignable(info.ty, param.ty, arg.span);
                    arg_irs.push(info.ir);
                }
                ExprInfo {
                    ty: shape.ret,
                    value: None,
                    ir: IrExpr::Call {
                        callee: Box::new(callee.ir),
                        args: arg_irs,
                    },
                }
            }
            Some(TypeData::Meta(def)) => match self.types.def_kind(def) {
                Some(DefKind::Class) => {
                    let Some(ctor) = self.types.def_constructor(def) else {
                        return self.check_args_loosely(args, IrExpr::Construct {
                            callee: Box::new(callee.ir),
                            args: Vec::new(),
                        });
                    };
                    let outcome = self.resolve_call(None, &ctor, callee_span, args, hint);
                    ExprInfo {
                        ty: self.types.class_type(def),
                        value: None,
                        ir: IrExpr::Construct {
                            callee: Box::new(callee.ir),
                            args: outcome.args,
                        },
                    }
                }
                Some(DefKind::Interface) => {
                    self.error(callee_span, "interfaces cannot be constructed");
                    self.check_args_loosely(args, IrExpr::Null)
                }
                _ => {
                    self.error(callee_span, "enums cannot be constructed");
                    self.check_args_loosely(args, IrExpr::Null)
                }
            },
            Some(TypeData::Any) => self.check_args_loosely(
                args,
                IrExpr::Call {
                    callee: Box::new(callee.ir),
                    args: Vec::new(),
                },
            ),
            _ => {
                let shown = self.types.display(callee.ty);
                self.error(callee_span, format!("type '{shown}' is not callable"));
                self.check_args_loosely(args, IrExpr::Null)
            }
        }
    }

    fn check_method_call(
        &mut self,
        name: Ident,
        owner: ExprInfo,
        args: &[Expr],
        hint: TypeId,
    ) -> ExprInfo {
        if self.types.resolve_alias(owner.ty) == TypeId::ANY {
            let ir = IrExpr::MethodCall {
                owner: Box::new(owner.ir),
                method: name.name,
                args: Vec::new(),
                recv: RecvKind::General,
            };
            return self.check_args_loosely(args, ir);
        }
        let Some(method) = self.types.get_method(owner.ty, name.name, args.len()) else {
            let shown = self.types.interner().resolve(name.name).to_string();
            if self.types.find_method(owner.ty, name.name).is_some() {
                self.error(
                    name.span,
                    format!("wrong number of arguments to '{shown}'"),
                );
            } else {
                let ty_shown = self.types.display(owner.ty);
                self.error(
                    name.span,
                    format!("no method '{shown}' on type '{ty_shown}'"),
                );
            }
            let ir = IrExpr::MethodCall {
                owner: Box::new(owner.ir),
                method: name.name,
                args: Vec::new(),
                recv: RecvKind::General,
            };
            return self.check_args_loosely(args, ir);
        };

        self.record_member_ref(owner.ty, name.name, name.span);
        let recv = self.recv_kind(owner.ty);
        let outcome = self.resolve_call(Some(&owner.value), &method, name.span, args, hint);

        // Folded scalars replace the whole call in the IR.
        if let Some(value) = &outcome.value
            && let Some(ir) = const_to_ir(value)
        {
            return ExprInfo {
                ty: outcome.ty,
                value: outcome.value,
                ir,
            };
        }
        let emitted_name = method.alias_for.unwrap_or(method.name);
        ExprInfo {
            ty: outcome.ty,
            value: outcome.value,
            ir: IrExpr::MethodCall {
                owner: Box::new(owner.ir),
                method: emitted_name,
                args: outcome.args,
                recv,
            },
        }
    }

    /// Shared call resolution: default splicing, per-argument hints and
    /// checks, generic inference, signature-help record, constant folding.
    fn resolve_call(
        &mut self,
        owner_value: Option<&Option<ConstValue>>,
        method: &Method,
        name_span: Span,
        args: &[Expr],
        hint: TypeId,
    ) -> CallOutcome {
        if !method.accepts_arity(args.len()) {
            let shown = self.types.interner().resolve(method.name).to_string();
            self.error(name_span, format!("wrong number of arguments to '{shown}'"));
            let arg_irs = args
                .iter()
                .map(|arg| self.check_expr(arg, TypeId::ANY).ir)
                .collect();
            return CallOutcome {
                ty: TypeId::ANY,
                value: None,
                args: arg_irs,
            };
        }

        // Omitted trailing arguments are filled from the declaration's
        // default expressions, re-anchored to the call site so their
        // diagnostics and records point here.
        let mut checked: SmallVec<[(ExprInfo, Span); 4]> =
            SmallVec::with_capacity(method.params.len());
        for (i, param) in method.params.iter().enumerate() {
            let arg_hint = if method.is_generic() {
                TypeId::ANY
            } else {
                param.ty
            };
            if let Some(arg) = args.get(i) {
                let info = self.check_expr(arg, arg_hint);
                checked.push((info, arg.span));
            } else if let Some(default) = &param.default {
                let spliced = re_anchor(default, name_span);
                let info = self.check_expr(&spliced, arg_hint);
                checked.push((info, name_span));
            }
        }

        let ty = if method.is_generic() {
            let arg_tys: Vec<TypeId> = checked.iter().map(|(info, _)| info.ty).collect();
            let call_hint = (hint != TypeId::ANY).then_some(hint);
            match self.types.resolve_generic_call(method, call_hint, &arg_tys) {
                Ok(instance) => {
                    for ((info, span), &param_ty) in checked.iter().zip(&instance.params) {
                        self.check_assignable(info.ty, param_ty, *span);
                    }
                    instance.ret
                }
                Err(GenericCallError::ArgBinding { index }) => {
                    let span = checked.get(index).map_or(name_span, |(_, span)| *span);
                    self.error(span, "cannot infer type parameters from this argument");
                    TypeId::ANY
                }
                Err(GenericCallError::Unresolved(param)) => {
                    let shown = self
                        .types
                        .type_param_name(param)
                        .map(|atom| self.types.interner().resolve(atom).to_string())
                        .unwrap_or_else(|| "T".to_string());
                    self.error(name_span, format!("cannot infer type parameter '{shown}'"));
                    TypeId::ANY
                }
            }
        } else {
            for ((info, span), param) in checked.iter().zip(&method.params) {
                self.check_assignable(info.ty, param.ty, *span);
            }
            method.return_type
        };

        self.calls.push(CallRecord {
            span: name_span,
            method: method.name,
            param_names: method.params.iter().map(|p| Some(p.name)).collect(),
            param_types: method.params.iter().map(|p| p.ty).collect(),
            arg_spans: checked.iter().map(|(_, span)| *span).collect(),
        });

        let value = if let Some(lit) = &method.inline_value {
            Some(ConstValue::from_lit(lit))
        } else if let Some(Some(owner_value)) = owner_value {
            let fold_name = method.alias_for.unwrap_or(method.name);
            let fold_name = self.types.interner().resolve(fold_name);
            let arg_values: Option<Vec<ConstValue>> = checked
                .iter()
                .map(|(info, _)| info.value.clone())
                .collect();
            arg_values.and_then(|values| consteval::eval_const(owner_value, &fold_name, &values))
        } else {
            None
        };

        CallOutcome {
            ty,
            value,
            args: checked.into_iter().map(|(info, _)| info.ir).collect(),
        }
    }

    /// Error-recovery path: arguments are still visited (their diagnostics
    /// and records matter) but no signature constrains them.
    fn check_args_loosely(&mut self, args: &[Expr], ir: IrExpr) -> ExprInfo {
        let arg_irs: Vec<IrExpr> = args
            .iter()
            .map(|arg| self.check_expr(arg, TypeId::ANY).ir)
            .collect();
        let ir = match ir {
            IrExpr::Call { callee, .. } => IrExpr::Call {
                callee,
                args: arg_irs,
            },
            IrExpr::Construct { callee, .. } => IrExpr::Construct {
                callee,
                args: arg_irs,
            },
            IrExpr::MethodCall {
                owner,
                method,
                recv,
                ..
            } => IrExpr::MethodCall {
                owner,
                method,
                args: arg_irs,
                recv,
            },
            other => other,
        };
        ExprInfo::any(ir)
    }

    /// Go-to-definition for members of locally declared nominal types. The
    /// `source_var` index is only meaningful in the arena that declared the
    /// definition, so imported members are skipped.
    fn record_member_ref(&mut self, owner_ty: TypeId, name: yal_common::Atom, span: Span) {
        let resolved = self.types.resolve_alias(owner_ty);
        let def = match self.types.lookup(resolved) {
            Some(TypeData::Class(def) | TypeData::Interface(def) | TypeData::Enum(def)) => def,
            _ => return,
        };
        if !self.local_defs.values().any(|&local| local == def) {
            return;
        }
        let Some(method) = self.types.find_method(resolved, name) else {
            return;
        };
        if let Some(index) = method.source_var {
            let var = self.scopes.var(VarId(index));
            self.references.push(SymbolReference {
                span,
                decl_uri: var.decl_uri.clone(),
                decl_span: var.decl_span,
            });
        }
    }
}

fn fold_call(
    owner: &Option<ConstValue>,
    method: &str,
    args: &[&Option<ConstValue>],
) -> Option<ConstValue> {
    let owner = owner.as_ref()?;
    let args: Option<Vec<ConstValue>> = args.iter().map(|a| (*a).clone()).collect();
    consteval::eval_const(owner, method, &args?)
}

fn lit_to_ir(value: &LitValue) -> IrExpr {
    match value {
        LitValue::Null => IrExpr::Null,
        LitValue::Bool(b) => IrExpr::Bool(*b),
        LitValue::Number(n) => IrExpr::Number(*n),
        LitValue::Str(s) => IrExpr::Str(s.to_string()),
    }
}

fn const_to_ir(value: &ConstValue) -> Option<IrExpr> {
    match value {
        ConstValue::Null => Some(IrExpr::Null),
        ConstValue::Bool(b) => Some(IrExpr::Bool(*b)),
        ConstValue::Number(n) => Some(IrExpr::Number(*n)),
        ConstValue::Str(s) => Some(IrExpr::Str(s.to_string())),
        ConstValue::List(_) | ConstValue::Module(_) => None,
    }
}

/// Deep-copy an expression with every span replaced, used when a default
/// parameter expression is spliced into a call site.
fn re_anchor(expr: &Expr, span: Span) -> Expr {
    let mut cloned = expr.clone();
    rewrite_spans(&mut cloned, span);
    cloned
}

fn rewrite_spans(expr: &mut Expr, span: Span) {
    expr.span = span;
    match &mut expr.kind {
        ExprKind::ListLit(items) => {
            for item in items {
                rewrite_spans(item, span);
            }
        }
        ExprKind::Member { owner, name } => {
            rewrite_spans(owner, span);
            name.span = span;
        }
        ExprKind::Index { owner, index } => {
            rewrite_spans(owner, span);
            rewrite_spans(index, span);
        }
        ExprKind::Call { callee, args } => {
            rewrite_spans(callee, span);
            for arg in args {
                rewrite_spans(arg, span);
            }
        }
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logic { lhs, rhs, .. } => {
            rewrite_spans(lhs, span);
            rewrite_spans(rhs, span);
        }
        ExprKind::Unary { operand, .. } => rewrite_spans(operand, span),
        // Function-literal bodies keep their declaration spans; defaults
        // are scalar expressions in practice.
        ExprKind::FunctionLit(_) => {}
        ExprKind::Null
        | ExprKind::Bool(_)
        | ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Ident(_) => {}
    }
}
