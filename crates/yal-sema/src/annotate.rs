//! The annotator: one pass over a module that produces its `Annotation`.
//!
//! Order of operations: parse diagnostics are adopted, the header (imports
//! and re-exports) is processed, module-level declarations are forward
//! declared so bodies can reference later statements, then every statement
//! is checked and lowered in source order. Checks never abort; each failure
//! pushes a diagnostic and continues with `Any`.

use crate::annotation::{
    Annotation, CallRecord, CompletionAnchor, ExportInfo, PrintRecord, SymbolReference,
};
use crate::consteval::ConstValue;
use crate::host::{ResolveError, resolve_import_path};
use crate::ir::{CompileConfig, IrFunc, IrStmt, Target};
use crate::modules::{ImportError, ModuleCache};
use crate::scope::{FrameId, ScopeArena, VarId, Variable};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;
use yal_ast::{
    ClassDecl, ExportAsDecl, Expr, FromImportDecl, FuncDecl, ImportDecl, Param, SourceModule, Stmt,
    StmtKind, VarDecl,
};
use yal_common::{Atom, Diagnostic, Span};
use yal_types::{DefId, DefKind, Method, MethodParam, TypeData, TypeId, TypeStore};

/// Whether control flow can continue past a statement (or block).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStatus {
    Continues,
    /// Some paths jump away, some fall through.
    MaybeJumps,
    /// Every path returns.
    Jumps,
}

pub(crate) struct WellKnown {
    pub print: Atom,
    pub target: Atom,
    pub lib: Atom,
    pub self_: Atom,
    pub value: Atom,
    pub op_index: Atom,
}

impl WellKnown {
    fn build(types: &TypeStore) -> Self {
        let names = types.interner();
        Self {
            print: names.intern("print"),
            target: names.intern("__target"),
            lib: names.intern("__lib"),
            self_: names.intern("self"),
            value: names.intern("value"),
            op_index: names.intern("__op_index__"),
        }
    }
}

/// A forward-declared free function, pending body check.
pub(crate) struct PreparedFn {
    pub var: VarId,
    pub method: Arc<Method>,
    pub declared_ret: Option<TypeId>,
    pub type_params: FxHashMap<Atom, TypeId>,
}

pub(crate) struct ReturnCtx {
    pub declared: Option<TypeId>,
    pub observed: Vec<TypeId>,
}

pub(crate) struct Annotator<'a> {
    pub cache: &'a ModuleCache<'a>,
    pub types: &'a TypeStore,
    pub uri: String,
    pub scopes: ScopeArena,
    pub frame: FrameId,
    pub diags: Vec<Diagnostic>,
    pub exports: IndexMap<Atom, ExportInfo>,
    pub imports: Vec<(String, Arc<Annotation>)>,
    pub references: Vec<SymbolReference>,
    pub completions: Vec<CompletionAnchor>,
    pub calls: Vec<CallRecord>,
    pub prints: Vec<PrintRecord>,
    pub config: CompileConfig,
    pub wk: WellKnown,
    /// Module-level nominal definitions by name.
    pub local_defs: FxHashMap<Atom, DefId>,
    /// Forward-declared free functions by name.
    pub fn_sigs: FxHashMap<Atom, PreparedFn>,
    /// Generic type parameters currently in scope.
    pub type_params: FxHashMap<Atom, TypeId>,
    pub ret_stack: Vec<ReturnCtx>,
    pub print_var: Option<VarId>,
}

/// Annotate one module. `stack` is the chain of uris currently being
/// annotated, used to cut import cycles.
pub(crate) fn annotate_module(
    cache: &ModuleCache<'_>,
    module: &SourceModule,
    stack: &mut Vec<String>,
) -> Annotation {
    let types = cache.types();
    let scopes = ScopeArena::new();
    let root = scopes.root();
    let mut annotator = Annotator {
        cache,
        types,
        uri: module.uri.clone(),
        scopes,
        frame: root,
        diags: module.parse_diagnostics.clone(),
        exports: IndexMap::new(),
        imports: Vec::new(),
        references: Vec::new(),
        completions: Vec::new(),
        calls: Vec::new(),
        prints: Vec::new(),
        config: CompileConfig::default(),
        wk: WellKnown::build(types),
        local_defs: FxHashMap::default(),
        fn_sigs: FxHashMap::default(),
        type_params: FxHashMap::default(),
        ret_stack: Vec::new(),
        print_var: None,
    };
    annotator.declare_print();

    let mut ir = Vec::new();
    let export_aliases = annotator.process_header(&module.statements, stack, &mut ir);
    annotator.forward_declare(&module.statements);

    for stmt in &module.statements {
        match &stmt.kind {
            StmtKind::Comment(_)
            | StmtKind::Import(_)
            | StmtKind::FromImport(_)
            | StmtKind::ExportAs(_) => {}
            _ => {
                annotator.check_stmt(stmt, true, &mut ir);
            }
        }
    }

    annotator.apply_export_aliases(&export_aliases);

    let has_errors = annotator.diags.iter().any(Diagnostic::is_error);
    debug!(
        uri = %module.uri,
        diagnostics = annotator.diags.len(),
        exports = annotator.exports.len(),
        "module annotated"
    );
    Annotation {
        uri: module.uri.clone(),
        version: module.version,
        module_key: cache.alloc_module_key(),
        diagnostics: annotator.diags,
        exports: annotator.exports,
        imports: annotator.imports,
        references: annotator.references,
        completions: annotator.completions,
        calls: annotator.calls,
        prints: annotator.prints,
        ir,
        config: annotator.config,
        has_errors,
    }
}

impl<'a> Annotator<'a> {
    pub(crate) fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diags
            .push(Diagnostic::error(self.uri.clone(), span, message));
    }

    fn declare_print(&mut self) {
        let method = Method::new(
            self.wk.print,
            vec![MethodParam {
                name: self.wk.value,
                ty: TypeId::ANY,
                default: None,
            }],
            TypeId::NULL,
        );
        let ty = self.types.lambda(Arc::new(method));
        let var = Variable::new(self.wk.print, ty, false, self.uri.clone(), Span::default());
        if let Ok(id) = self.scopes.declare(self.frame, var) {
            self.print_var = Some(id);
        }
    }

    // ----- header -----

    /// Process imports and collect re-export aliases. Imports appearing
    /// after the first body statement still work but are diagnosed.
    fn process_header(
        &mut self,
        statements: &[Stmt],
        stack: &mut Vec<String>,
        ir: &mut Vec<IrStmt>,
    ) -> Vec<ExportAsDecl> {
        let mut aliases = Vec::new();
        let mut body_seen = false;
        for stmt in statements {
            match &stmt.kind {
                StmtKind::Comment(_) => {}
                StmtKind::Import(decl) => {
                    if body_seen {
                        self.error(stmt.span, "imports must appear at the top of the module");
                    }
                    self.process_import(decl, stack, ir);
                }
                StmtKind::FromImport(decl) => {
                    if body_seen {
                        self.error(stmt.span, "imports must appear at the top of the module");
                    }
                    self.process_from_import(decl, stack, ir);
                }
                StmtKind::ExportAs(decl) => {
                    if body_seen {
                        self.error(stmt.span, "re-exports must appear at the top of the module");
                    }
                    aliases.push(decl.clone());
                }
                _ => body_seen = true,
            }
        }
        aliases
    }

    fn load_dependency(
        &mut self,
        path: &str,
        path_span: Span,
        stack: &mut Vec<String>,
    ) -> Option<(String, Arc<Annotation>)> {
        let dep_uri = match resolve_import_path(self.cache.host(), &self.uri, path) {
            Ok(uri) => uri,
            Err(ResolveError::NotFound { raw, .. }) => {
                self.error(path_span, format!("cannot resolve import \"{raw}\""));
                return None;
            }
        };
        match self.cache.get_annotation(&dep_uri, stack) {
            Ok(dep) => {
                if dep.has_errors {
                    self.error(path_span, format!("imported module \"{path}\" has errors"));
                }
                self.imports.push((dep_uri.clone(), dep.clone()));
                Some((dep_uri, dep))
            }
            Err(ImportError::Recursive(_)) => {
                self.error(path_span, format!("recursive import of \"{path}\""));
                None
            }
            Err(ImportError::NotFound(_)) => {
                self.error(path_span, format!("cannot resolve import \"{path}\""));
                None
            }
        }
    }

    fn process_import(&mut self, decl: &ImportDecl, stack: &mut Vec<String>, ir: &mut Vec<IrStmt>) {
        let alias = decl.alias;
        match self.load_dependency(&decl.path, decl.path_span, stack) {
            Some((dep_uri, dep)) => {
                let ty = self.types.module_type(dep.module_key);
                let mut var = Variable::new(alias.name, ty, false, self.uri.clone(), alias.span);
                var.value = Some(ConstValue::Module(dep.module_key));
                self.declare_or_diag(var, alias.span);
                ir.push(IrStmt::Import {
                    uri: dep_uri,
                    binding: Some(alias.name),
                    names: Vec::new(),
                });
            }
            None => {
                // Placeholder binding so uses of the alias don't cascade.
                let var =
                    Variable::new(alias.name, TypeId::ANY, false, self.uri.clone(), alias.span);
                self.declare_or_diag(var, alias.span);
            }
        }
    }

    fn process_from_import(
        &mut self,
        decl: &FromImportDecl,
        stack: &mut Vec<String>,
        ir: &mut Vec<IrStmt>,
    ) {
        let dep = self.load_dependency(&decl.path, decl.path_span, stack);
        let mut bound = Vec::new();
        for name in &decl.names {
            let placeholder = |annotator: &mut Self| {
                let var =
                    Variable::new(name.name, TypeId::ANY, false, annotator.uri.clone(), name.span);
                annotator.declare_or_diag(var, name.span);
            };
            match &dep {
                Some((dep_uri, dep)) => match dep.export(name.name) {
                    Some(export) => {
                        let mut var = Variable::new(
                            name.name,
                            export.ty,
                            false,
                            dep_uri.clone(),
                            export.decl_span,
                        );
                        var.value = export.value.clone();
                        var.doc = export.doc.clone();
                        self.declare_or_diag(var, name.span);
                        self.references.push(SymbolReference {
                            span: name.span,
                            decl_uri: dep_uri.clone(),
                            decl_span: export.decl_span,
                        });
                        bound.push(name.name);
                    }
                    None => {
                        let shown = self.types.interner().resolve(name.name).to_string();
                        self.error(
                            name.span,
                            format!("module \"{}\" has no export named '{shown}'", decl.path),
                        );
                        placeholder(self);
                    }
                },
                None => placeholder(self),
            }
        }
        if let Some((dep_uri, _)) = dep {
            ir.push(IrStmt::Import {
                uri: dep_uri,
                binding: None,
                names: bound,
            });
        }
    }

    pub(crate) fn declare_or_diag(&mut self, var: Variable, span: Span) -> Option<VarId> {
        let shown = self.types.interner().resolve(var.name).to_string();
        match self.scopes.declare(self.frame, var) {
            Ok(id) => Some(id),
            Err(_) => {
                self.error(span, format!("duplicate declaration of '{shown}'"));
                None
            }
        }
    }

    fn apply_export_aliases(&mut self, aliases: &[ExportAsDecl]) {
        for decl in aliases {
            let Some(var_id) = self.scopes.lookup_local(self.scopes.root(), decl.name.name) else {
                let shown = self.types.interner().resolve(decl.name.name).to_string();
                self.error(decl.name.span, format!("cannot re-export unknown name '{shown}'"));
                continue;
            };
            let var = self.scopes.var(var_id).clone();
            self.references.push(SymbolReference {
                span: decl.name.span,
                decl_uri: var.decl_uri.clone(),
                decl_span: var.decl_span,
            });
            let info = ExportInfo {
                local: decl.name.name,
                ty: var.ty,
                mutable: var.mutable,
                value: var.value.clone(),
                doc: var.doc.clone(),
                decl_span: var.decl_span,
            };
            if self.exports.insert(decl.alias.name, info).is_some() {
                let shown = self.types.interner().resolve(decl.alias.name).to_string();
                self.error(decl.alias.span, format!("duplicate export '{shown}'"));
            }
        }
    }

    fn add_export(&mut self, name: Atom, info: ExportInfo, span: Span) {
        if self.exports.insert(name, info).is_some() {
            let shown = self.types.interner().resolve(name).to_string();
            self.error(span, format!("duplicate export '{shown}'"));
        }
    }

    // ----- statements -----

    pub(crate) fn check_block(&mut self, stmts: &[Stmt], ir: &mut Vec<IrStmt>) -> RunStatus {
        let mut status = RunStatus::Continues;
        for stmt in stmts {
            let stmt_status = self.check_stmt(stmt, false, ir);
            status = status.max(stmt_status);
        }
        status
    }

    fn check_block_in_child(&mut self, stmts: &[Stmt]) -> (Vec<IrStmt>, RunStatus) {
        let saved = self.frame;
        self.frame = self.scopes.push_child(saved);
        let mut ir = Vec::new();
        let status = self.check_block(stmts, &mut ir);
        self.frame = saved;
        (ir, status)
    }

    pub(crate) fn check_stmt(
        &mut self,
        stmt: &Stmt,
        top_level: bool,
        ir: &mut Vec<IrStmt>,
    ) -> RunStatus {
        match &stmt.kind {
            StmtKind::Comment(_) => RunStatus::Continues,
            StmtKind::Import(_) | StmtKind::FromImport(_) | StmtKind::ExportAs(_) => {
                // Top-level ones are consumed by the header scan.
                if !top_level {
                    self.error(stmt.span, "imports must appear at the top of the module");
                }
                RunStatus::Continues
            }
            StmtKind::VarDecl(decl) => {
                self.check_var_decl(decl, top_level, ir);
                RunStatus::Continues
            }
            StmtKind::Assign { target, value } => {
                self.check_assign_stmt(target, value, ir);
                RunStatus::Continues
            }
            StmtKind::Func(decl) => {
                if top_level {
                    self.check_top_level_func(decl, ir);
                } else {
                    self.check_local_func(decl, ir);
                }
                RunStatus::Continues
            }
            StmtKind::Class(decl) => {
                if top_level {
                    self.check_class_decl(decl, ir);
                } else {
                    self.error(stmt.span, "classes may only be declared at module level");
                }
                RunStatus::Continues
            }
            StmtKind::Interface(decl) => {
                if top_level {
                    self.export_nominal(decl.name.name, decl.name.span);
                } else {
                    self.error(stmt.span, "interfaces may only be declared at module level");
                }
                RunStatus::Continues
            }
            StmtKind::Enum(decl) => {
                if top_level {
                    self.export_nominal(decl.name.name, decl.name.span);
                } else {
                    self.error(stmt.span, "enums may only be declared at module level");
                }
                RunStatus::Continues
            }
            StmtKind::If(if_stmt) => {
                let cond = self.check_expr(&if_stmt.cond, TypeId::BOOL);
                self.check_assignable(cond.ty, TypeId::BOOL, if_stmt.cond.span);
                let (then_ir, then_status) = self.check_block_in_child(&if_stmt.then_body);
                let (else_ir, else_status) = match &if_stmt.else_body {
                    Some(body) => {
                        let (ir, status) = self.check_block_in_child(body);
                        (ir, Some(status))
                    }
                    None => (Vec::new(), None),
                };
                ir.push(IrStmt::If {
                    cond: cond.ir,
                    then_body: then_ir,
                    else_body: else_ir,
                });
                match else_status {
                    Some(RunStatus::Jumps) if then_status == RunStatus::Jumps => RunStatus::Jumps,
                    Some(else_status)
                        if then_status == RunStatus::Continues
                            && else_status == RunStatus::Continues =>
                    {
                        RunStatus::Continues
                    }
                    Some(_) => RunStatus::MaybeJumps,
                    None if then_status == RunStatus::Continues => RunStatus::Continues,
                    None => RunStatus::MaybeJumps,
                }
            }
            StmtKind::While { cond, body } => {
                let cond_info = self.check_expr(cond, TypeId::BOOL);
                self.check_assignable(cond_info.ty, TypeId::BOOL, cond.span);
                let (body_ir, body_status) = self.check_block_in_child(body);
                ir.push(IrStmt::While {
                    cond: cond_info.ir,
                    body: body_ir,
                });
                // The loop may run zero times, so a jumping body never
                // makes the loop itself jump.
                if body_status == RunStatus::Continues {
                    RunStatus::Continues
                } else {
                    RunStatus::MaybeJumps
                }
            }
            StmtKind::Return(value) => {
                self.check_return(value.as_ref(), stmt.span, ir);
                RunStatus::Jumps
            }
            StmtKind::Expr(expr) => {
                let info = self.check_expr(expr, TypeId::ANY);
                ir.push(IrStmt::Expr(info.ir));
                RunStatus::Continues
            }
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl, top_level: bool, ir: &mut Vec<IrStmt>) {
        let shown = self.types.interner().resolve(decl.name.name).to_string();
        if shown.starts_with("__") {
            if top_level && decl.name.name == self.wk.target {
                self.check_target_config(decl);
                return;
            }
            if top_level && decl.name.name == self.wk.lib {
                self.check_lib_config(decl);
                return;
            }
            self.error(
                decl.name.span,
                format!("names starting with '__' are reserved: '{shown}'"),
            );
        }

        let declared = decl
            .declared_type
            .as_ref()
            .map(|te| self.resolve_type_expr(te));
        let hint = declared.unwrap_or(TypeId::ANY);
        let info = self.check_expr(&decl.init, hint);
        let ty = match declared {
            Some(declared) => {
                self.check_assignable(info.ty, declared, decl.init.span);
                declared
            }
            None => info.ty,
        };

        let mut var = Variable::new(
            decl.name.name,
            ty,
            decl.mutable,
            self.uri.clone(),
            decl.name.span,
        );
        var.doc = decl.doc.clone();
        if !decl.mutable {
            var.value = info.value.clone();
        }
        let value = var.value.clone();
        let doc = var.doc.clone();
        self.declare_or_diag(var, decl.name.span);

        if top_level {
            self.add_export(
                decl.name.name,
                ExportInfo {
                    local: decl.name.name,
                    ty,
                    mutable: decl.mutable,
                    value,
                    doc,
                    decl_span: decl.name.span,
                },
                decl.name.span,
            );
        }
        ir.push(IrStmt::VarDecl {
            name: decl.name.name,
            mutable: decl.mutable,
            init: info.ir,
        });
    }

    fn check_target_config(&mut self, decl: &VarDecl) {
        let info = self.check_expr(&decl.init, TypeId::STRING);
        match info.value.as_ref() {
            Some(ConstValue::Str(s)) if s.as_ref() == "script" => {
                self.config.target = Target::Script;
            }
            Some(ConstValue::Str(s)) if s.as_ref() == "html" => {
                self.config.target = Target::Html;
            }
            _ => self.error(
                decl.init.span,
                "'__target' must be the literal \"script\" or \"html\"",
            ),
        }
        let mut var = Variable::new(
            decl.name.name,
            TypeId::STRING,
            false,
            self.uri.clone(),
            decl.name.span,
        );
        var.value = info.value;
        self.declare_or_diag(var, decl.name.span);
    }

    fn check_lib_config(&mut self, decl: &VarDecl) {
        let hint = self.types.list(TypeId::STRING);
        let info = self.check_expr(&decl.init, hint);
        let mut libs = None;
        if let Some(ConstValue::List(items)) = info.value.as_ref() {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    ConstValue::Str(s) => Some(s.to_string()),
                    _ => None,
                })
                .collect();
            libs = strings;
        }
        match libs {
            Some(libs) => self.config.libs = libs,
            None => self.error(decl.init.span, "'__lib' must be a list of string literals"),
        }
        let mut var = Variable::new(decl.name.name, hint, false, self.uri.clone(), decl.name.span);
        var.value = info.value;
        self.declare_or_diag(var, decl.name.span);
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span, ir: &mut Vec<IrStmt>) {
        if self.ret_stack.is_empty() {
            self.error(span, "return outside of a function");
        }
        let declared = self.ret_stack.last().and_then(|ctx| ctx.declared);
        match value {
            Some(expr) => {
                let info = self.check_expr(expr, declared.unwrap_or(TypeId::ANY));
                if let Some(declared) = declared {
                    self.check_assignable(info.ty, declared, expr.span);
                }
                if let Some(ctx) = self.ret_stack.last_mut() {
                    ctx.observed.push(info.ty);
                }
                ir.push(IrStmt::Return(Some(info.ir)));
            }
            None => {
                if let Some(declared) = declared {
                    self.check_assignable(TypeId::NULL, declared, span);
                }
                if let Some(ctx) = self.ret_stack.last_mut() {
                    ctx.observed.push(TypeId::NULL);
                }
                ir.push(IrStmt::Return(None));
            }
        }
    }

    // ----- functions -----

    /// Check a callable body against its resolved signature. Returns the
    /// final return type (inferred when not declared) and the lowered body.
    pub(crate) fn check_callable_body(
        &mut self,
        name_span: Span,
        method: &Method,
        decl_params: &[Param],
        declared_ret: Option<TypeId>,
        body: &[Stmt],
        self_ty: Option<TypeId>,
        type_params: FxHashMap<Atom, TypeId>,
    ) -> (TypeId, Vec<IrStmt>) {
        let saved_frame = self.frame;
        self.frame = self.scopes.push_child(saved_frame);
        let saved_tparams = std::mem::replace(&mut self.type_params, type_params);

        if let Some(self_ty) = self_ty {
            let var = Variable::new(self.wk.self_, self_ty, false, self.uri.clone(), name_span);
            let _ = self.scopes.declare(self.frame, var);
        }
        for (param, decl) in method.params.iter().zip(decl_params) {
            let var = Variable::new(
                param.name,
                param.ty,
                false,
                self.uri.clone(),
                decl.name.span,
            );
            self.declare_or_diag(var, decl.name.span);
        }

        self.ret_stack.push(ReturnCtx {
            declared: declared_ret,
            observed: Vec::new(),
        });
        let mut body_ir = Vec::new();
        let status = self.check_block(body, &mut body_ir);
        let ctx = match self.ret_stack.pop() {
            Some(ctx) => ctx,
            None => ReturnCtx {
                declared: declared_ret,
                observed: Vec::new(),
            },
        };

        self.type_params = saved_tparams;
        self.frame = saved_frame;

        let final_ret = match ctx.declared {
            Some(declared) => {
                if status != RunStatus::Jumps && !self.types.is_assignable_to(TypeId::NULL, declared)
                {
                    self.error(name_span, "function might not return");
                }
                declared
            }
            None => {
                let mut ret = TypeId::NEVER;
                for observed in &ctx.observed {
                    ret = self.types.common_type(ret, *observed);
                }
                if status != RunStatus::Jumps {
                    ret = self.types.common_type(ret, TypeId::NULL);
                }
                ret
            }
        };
        (final_ret, body_ir)
    }

    fn check_top_level_func(&mut self, decl: &FuncDecl, ir: &mut Vec<IrStmt>) {
        let Some(prepared) = self.fn_sigs.remove(&decl.name.name) else {
            // Duplicate declaration; the forward pass already diagnosed it.
            return;
        };
        let (final_ret, body_ir) = self.check_callable_body(
            decl.name.span,
            &prepared.method,
            &decl.params,
            prepared.declared_ret,
            &decl.body,
            None,
            prepared.type_params.clone(),
        );

        let mut final_method = (*prepared.method).clone();
        final_method.return_type = final_ret;
        final_method.source_var = Some(prepared.var.0);
        let ty = self.types.lambda(Arc::new(final_method));

        let pending = {
            let var = self.scopes.var_mut(prepared.var);
            var.ty = ty;
            var.provisional = false;
            std::mem::take(&mut var.pending_refs)
        };
        for span in pending {
            self.references.push(SymbolReference {
                span,
                decl_uri: self.uri.clone(),
                decl_span: decl.name.span,
            });
        }

        self.add_export(
            decl.name.name,
            ExportInfo {
                local: decl.name.name,
                ty,
                mutable: false,
                value: None,
                doc: decl.doc.clone(),
                decl_span: decl.name.span,
            },
            decl.name.span,
        );
        ir.push(IrStmt::Func(IrFunc {
            name: decl.name.name,
            params: decl.params.iter().map(|p| p.name.name).collect(),
            body: body_ir,
        }));
    }

    fn check_local_func(&mut self, decl: &FuncDecl, ir: &mut Vec<IrStmt>) {
        let (method, declared_ret, type_params, var_id) = self.prepare_function(decl, false);
        let (final_ret, body_ir) = self.check_callable_body(
            decl.name.span,
            &method,
            &decl.params,
            declared_ret,
            &decl.body,
            None,
            type_params,
        );
        if let Some(var_id) = var_id {
            let mut final_method = (*method).clone();
            final_method.return_type = final_ret;
            final_method.source_var = Some(var_id.0);
            let ty = self.types.lambda(Arc::new(final_method));
            let pending = {
                let var = self.scopes.var_mut(var_id);
                var.ty = ty;
                var.provisional = false;
                std::mem::take(&mut var.pending_refs)
            };
            for span in pending {
                self.references.push(SymbolReference {
                    span,
                    decl_uri: self.uri.clone(),
                    decl_span: decl.name.span,
                });
            }
        }
        ir.push(IrStmt::Func(IrFunc {
            name: decl.name.name,
            params: decl.params.iter().map(|p| p.name.name).collect(),
            body: body_ir,
        }));
    }

    fn check_class_decl(&mut self, decl: &ClassDecl, ir: &mut Vec<IrStmt>) {
        let Some(&def) = self.local_defs.get(&decl.name.name) else {
            return;
        };
        if self.types.def_kind(def) != Some(DefKind::Class) {
            return;
        }
        let class_ty = self.types.class_type(def);

        for field in &decl.fields {
            if let Some(init) = &field.init {
                let field_ty = self
                    .types
                    .field_of(def, field.name.name)
                    .map_or(TypeId::ANY, |f| f.ty);
                let info = self.check_expr(init, field_ty);
                self.check_assignable(info.ty, field_ty, init.span);
            }
        }

        let def_methods = self
            .types
            .def_info(def)
            .map(|info| info.methods)
            .unwrap_or_default();
        let mut method_irs = Vec::new();
        for m in &decl.methods {
            let Some(method) = def_methods
                .iter()
                .rev()
                .find(|cand| cand.name == m.name.name && cand.params.len() == m.params.len())
            else {
                continue;
            };
            let (_, body_ir) = self.check_callable_body(
                m.name.span,
                method,
                &m.params,
                Some(method.return_type),
                &m.body,
                Some(class_ty),
                FxHashMap::default(),
            );
            method_irs.push(IrFunc {
                name: m.name.name,
                params: m.params.iter().map(|p| p.name.name).collect(),
                body: body_ir,
            });
        }

        self.export_nominal(decl.name.name, decl.name.span);
        ir.push(IrStmt::Class {
            name: decl.name.name,
            extends: decl.extends.map(|e| e.name),
            fields: self
                .types
                .def_fields(def)
                .iter()
                .map(|f| f.name)
                .collect(),
            methods: method_irs,
        });
    }

    fn export_nominal(&mut self, name: Atom, span: Span) {
        let Some(var_id) = self.scopes.lookup_local(self.scopes.root(), name) else {
            return;
        };
        let var = self.scopes.var(var_id).clone();
        self.add_export(
            name,
            ExportInfo {
                local: name,
                ty: var.ty,
                mutable: false,
                value: None,
                doc: var.doc.clone(),
                decl_span: span,
            },
            span,
        );
    }

    // ----- assignment -----

    fn check_assign_stmt(&mut self, target: &Expr, value: &Expr, ir: &mut Vec<IrStmt>) {
        use yal_ast::ExprKind;
        match &target.kind {
            ExprKind::Ident(name) => {
                let Some(var_id) = self.scopes.lookup(self.frame, *name) else {
                    let shown = self.types.interner().resolve(*name).to_string();
                    self.error(target.span, format!("unknown name '{shown}'"));
                    self.check_expr(value, TypeId::ANY);
                    return;
                };
                let (ty, mutable, decl_uri, decl_span) = {
                    let var = self.scopes.var(var_id);
                    (var.ty, var.mutable, var.decl_uri.clone(), var.decl_span)
                };
                if !mutable {
                    let shown = self.types.interner().resolve(*name).to_string();
                    self.error(
                        target.span,
                        format!("cannot assign to immutable binding '{shown}'"),
                    );
                }
                self.references.push(SymbolReference {
                    span: target.span,
                    decl_uri,
                    decl_span,
                });
                let info = self.check_expr(value, ty);
                self.check_assignable(info.ty, ty, value.span);
                ir.push(IrStmt::Assign {
                    target: crate::ir::IrExpr::Name(*name),
                    value: info.ir,
                });
            }
            ExprKind::Member { owner, name } => {
                let owner_info = self.check_expr(owner, TypeId::ANY);
                let owner_ty = self.types.resolve_alias(owner_info.ty);
                match self.types.lookup(owner_ty) {
                    Some(TypeData::Class(def)) => {
                        match self.types.field_of(def, name.name) {
                            Some(field) => {
                                if !field.mutable {
                                    let shown =
                                        self.types.interner().resolve(name.name).to_string();
                                    self.error(
                                        name.span,
                                        format!("field '{shown}' is not mutable"),
                                    );
                                }
                                let info = self.check_expr(value, field.ty);
                                self.check_assignable(info.ty, field.ty, value.span);
                                ir.push(IrStmt::Assign {
                                    target: crate::ir::IrExpr::Member {
                                        owner: Box::new(owner_info.ir),
                                        name: name.name,
                                    },
                                    value: info.ir,
                                });
                            }
                            None => {
                                let shown = self.types.interner().resolve(name.name).to_string();
                                let ty_shown = self.types.display(owner_info.ty);
                                self.error(
                                    name.span,
                                    format!("no field '{shown}' on type '{ty_shown}'"),
                                );
                                self.check_expr(value, TypeId::ANY);
                            }
                        }
                    }
                    Some(TypeData::Any) => {
                        let info = self.check_expr(value, TypeId::ANY);
                        ir.push(IrStmt::Assign {
                            target: crate::ir::IrExpr::Member {
                                owner: Box::new(owner_info.ir),
                                name: name.name,
                            },
                            value: info.ir,
                        });
                    }
                    _ => {
                        self.error(target.span, "cannot assign to this expression");
                        self.check_expr(value, TypeId::ANY);
                    }
                }
            }
            ExprKind::Index { owner, index } => {
                let owner_info = self.check_expr(owner, TypeId::ANY);
                let owner_ty = self.types.resolve_alias(owner_info.ty);
                match self.types.lookup(owner_ty) {
                    Some(TypeData::List(item)) => {
                        let index_info = self.check_expr(index, TypeId::NUMBER);
                        self.check_assignable(index_info.ty, TypeId::NUMBER, index.span);
                        let info = self.check_expr(value, item);
                        self.check_assignable(info.ty, item, value.span);
                        ir.push(IrStmt::Assign {
                            target: crate::ir::IrExpr::Index {
                                owner: Box::new(owner_info.ir),
                                index: Box::new(index_info.ir),
                            },
                            value: info.ir,
                        });
                    }
                    Some(TypeData::Any) => {
                        let index_info = self.check_expr(index, TypeId::ANY);
                        let info = self.check_expr(value, TypeId::ANY);
                        ir.push(IrStmt::Assign {
                            target: crate::ir::IrExpr::Index {
                                owner: Box::new(owner_info.ir),
                                index: Box::new(index_info.ir),
                            },
                            value: info.ir,
                        });
                    }
                    _ => {
                        self.error(target.span, "only list elements can be assigned by index");
                        self.check_expr(index, TypeId::ANY);
                        self.check_expr(value, TypeId::ANY);
                    }
                }
            }
            _ => {
                self.error(target.span, "invalid assignment target");
                self.check_expr(value, TypeId::ANY);
            }
        }
    }
}
