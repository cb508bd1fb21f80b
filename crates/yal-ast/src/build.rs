//! Programmatic tree construction.
//!
//! Hosts that synthesize modules (library shims, editor scratch buffers) and
//! the test suites build trees through this instead of a parser. Each node
//! gets a fresh synthetic span so location-keyed tables stay distinct.

use crate::{
    BinaryOp, ClassDecl, EnumDecl, EnumMember, Expr, ExprKind, FieldDecl, FromImportDecl, FuncDecl,
    FuncLit, Ident, IfStmt, ImportDecl, InterfaceDecl, InterfaceMethod, LogicOp, Param,
    SourceModule, Stmt, StmtKind, TypeExpr, TypeExprKind, UnaryOp, VarDecl,
};
use std::cell::Cell;
use yal_common::{Interner, Span};

pub struct TreeBuilder<'i> {
    pub interner: &'i Interner,
    next_offset: Cell<u32>,
}

impl<'i> TreeBuilder<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        Self {
            interner,
            next_offset: Cell::new(0),
        }
    }

    fn span(&self) -> Span {
        let start = self.next_offset.get();
        self.next_offset.set(start + 2);
        Span::new(start, start + 1)
    }

    pub fn ident(&self, name: &str) -> Ident {
        Ident {
            name: self.interner.intern(name),
            span: self.span(),
        }
    }

    pub fn module(&self, uri: &str, version: i32, statements: Vec<Stmt>) -> SourceModule {
        SourceModule {
            uri: uri.to_string(),
            version,
            statements,
            parse_diagnostics: Vec::new(),
        }
    }

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            span: self.span(),
        }
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            kind,
            span: self.span(),
        }
    }

    // ----- statements -----

    pub fn comment(&self, text: &str) -> Stmt {
        self.stmt(StmtKind::Comment(text.to_string()))
    }

    pub fn import(&self, path: &str, alias: &str) -> Stmt {
        let decl = ImportDecl {
            path: path.to_string(),
            path_span: self.span(),
            alias: self.ident(alias),
        };
        self.stmt(StmtKind::Import(decl))
    }

    pub fn from_import(&self, path: &str, names: &[&str]) -> Stmt {
        let decl = FromImportDecl {
            path: path.to_string(),
            path_span: self.span(),
            names: names.iter().map(|n| self.ident(n)).collect(),
        };
        self.stmt(StmtKind::FromImport(decl))
    }

    pub fn export_as(&self, name: &str, alias: &str) -> Stmt {
        let decl = crate::ExportAsDecl {
            name: self.ident(name),
            alias: self.ident(alias),
        };
        self.stmt(StmtKind::ExportAs(decl))
    }

    pub fn const_decl(&self, name: &str, init: Expr) -> Stmt {
        self.var_decl(false, name, None, init)
    }

    pub fn let_decl(&self, name: &str, init: Expr) -> Stmt {
        self.var_decl(true, name, None, init)
    }

    pub fn var_decl(
        &self,
        mutable: bool,
        name: &str,
        declared_type: Option<TypeExpr>,
        init: Expr,
    ) -> Stmt {
        self.stmt(StmtKind::VarDecl(VarDecl {
            mutable,
            name: self.ident(name),
            declared_type,
            init,
            doc: None,
        }))
    }

    pub fn assign(&self, target: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Assign { target, value })
    }

    pub fn func(
        &self,
        name: &str,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Stmt {
        self.generic_func(name, &[], params, return_type, body)
    }

    pub fn generic_func(
        &self,
        name: &str,
        type_params: &[&str],
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Stmt {
        self.stmt(StmtKind::Func(FuncDecl {
            name: self.ident(name),
            type_params: type_params.iter().map(|p| self.ident(p)).collect(),
            params,
            return_type,
            body,
            doc: None,
        }))
    }

    pub fn param(&self, name: &str, ty: TypeExpr) -> Param {
        Param {
            name: self.ident(name),
            ty: Some(ty),
            default: None,
        }
    }

    pub fn param_default(&self, name: &str, ty: TypeExpr, default: Expr) -> Param {
        Param {
            name: self.ident(name),
            ty: Some(ty),
            default: Some(default),
        }
    }

    pub fn untyped_param(&self, name: &str) -> Param {
        Param {
            name: self.ident(name),
            ty: None,
            default: None,
        }
    }

    pub fn class(
        &self,
        name: &str,
        extends: Option<&str>,
        fields: Vec<FieldDecl>,
        methods: Vec<FuncDecl>,
    ) -> Stmt {
        self.stmt(StmtKind::Class(ClassDecl {
            name: self.ident(name),
            extends: extends.map(|e| self.ident(e)),
            fields,
            methods,
        }))
    }

    pub fn field(&self, name: &str, ty: TypeExpr, mutable: bool) -> FieldDecl {
        FieldDecl {
            name: self.ident(name),
            ty,
            mutable,
            init: None,
        }
    }

    pub fn field_with_init(&self, name: &str, ty: TypeExpr, mutable: bool, init: Expr) -> FieldDecl {
        FieldDecl {
            name: self.ident(name),
            ty,
            mutable,
            init: Some(init),
        }
    }

    pub fn method(
        &self,
        name: &str,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> FuncDecl {
        FuncDecl {
            name: self.ident(name),
            type_params: Vec::new(),
            params,
            return_type,
            body,
            doc: None,
        }
    }

    pub fn interface(&self, name: &str, extends: &[&str], methods: Vec<InterfaceMethod>) -> Stmt {
        self.stmt(StmtKind::Interface(InterfaceDecl {
            name: self.ident(name),
            extends: extends.iter().map(|e| self.ident(e)).collect(),
            methods,
        }))
    }

    pub fn interface_method(
        &self,
        name: &str,
        params: Vec<Param>,
        return_type: TypeExpr,
    ) -> InterfaceMethod {
        InterfaceMethod {
            name: self.ident(name),
            params,
            return_type,
            alias_for: None,
        }
    }

    pub fn enum_decl(&self, name: &str, members: &[(&str, Expr)]) -> Stmt {
        self.stmt(StmtKind::Enum(EnumDecl {
            name: self.ident(name),
            members: members
                .iter()
                .map(|(n, v)| EnumMember {
                    name: self.ident(n),
                    value: v.clone(),
                })
                .collect(),
        }))
    }

    pub fn if_stmt(&self, cond: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
        self.stmt(StmtKind::If(IfStmt {
            cond,
            then_body,
            else_body,
        }))
    }

    pub fn while_stmt(&self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    // ----- expressions -----

    pub fn null(&self) -> Expr {
        self.expr(ExprKind::Null)
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn num(&self, value: f64) -> Expr {
        self.expr(ExprKind::Number(value))
    }

    pub fn str(&self, value: &str) -> Expr {
        self.expr(ExprKind::Str(value.to_string()))
    }

    pub fn list(&self, items: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ListLit(items))
    }

    pub fn name(&self, name: &str) -> Expr {
        let atom = self.interner.intern(name);
        self.expr(ExprKind::Ident(atom))
    }

    pub fn member(&self, owner: Expr, name: &str) -> Expr {
        let name = self.ident(name);
        self.expr(ExprKind::Member {
            owner: Box::new(owner),
            name,
        })
    }

    pub fn index(&self, owner: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            owner: Box::new(owner),
            index: Box::new(index),
        })
    }

    pub fn call(&self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    /// `name(args...)`
    pub fn call_name(&self, name: &str, args: Vec<Expr>) -> Expr {
        let callee = self.name(name);
        self.call(callee, args)
    }

    /// `owner.method(args...)`
    pub fn method_call(&self, owner: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let callee = self.member(owner, method);
        self.call(callee, args)
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn logic(&self, op: LogicOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Logic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn function_lit(
        &self,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Expr {
        self.expr(ExprKind::FunctionLit(Box::new(FuncLit {
            params,
            return_type,
            body,
        })))
    }

    // ----- type expressions -----

    fn type_expr(&self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            kind,
            span: self.span(),
        }
    }

    pub fn ty_name(&self, name: &str) -> TypeExpr {
        let atom = self.interner.intern(name);
        self.type_expr(TypeExprKind::Name(atom))
    }

    pub fn ty_list(&self, item: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::List(Box::new(item)))
    }

    pub fn ty_nullable(&self, inner: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Nullable(Box::new(inner)))
    }

    pub fn ty_union(&self, members: Vec<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Union(members))
    }

    pub fn ty_function(&self, params: Vec<TypeExpr>, ret: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Function {
            params,
            ret: Box::new(ret),
        })
    }
}
