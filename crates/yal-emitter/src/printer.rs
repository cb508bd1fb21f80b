//! Line-oriented JavaScript printer: statements, declarations, module
//! bodies.
//!
//! Every user identifier is written with a `$` prefix. yal identifiers
//! cannot contain `$`, so mangled names can never collide with the
//! `__yal_`-prefixed runtime helpers, and helpers can never be shadowed by
//! user code.

use std::fmt::Write as _;
use yal_common::{Atom, Interner};
use yal_sema::{Annotation, IrFunc, IrStmt};

pub(crate) struct Printer<'a> {
    pub(crate) names: &'a Interner,
    out: String,
    indent: usize,
    at_line_start: bool,
    import_temps: u32,
}

impl<'a> Printer<'a> {
    pub(crate) fn new(names: &'a Interner) -> Self {
        Self {
            names,
            out: String::new(),
            indent: 0,
            at_line_start: true,
            import_temps: 0,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    // ----- output helpers -----

    pub(crate) fn write(&mut self, text: &str) {
        if self.at_line_start {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.at_line_start = false;
        }
        self.out.push_str(text);
    }

    pub(crate) fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    pub(crate) fn line(&mut self, text: &str) {
        self.write(text);
        self.newline();
    }

    pub(crate) fn indented(&mut self, body: impl FnOnce(&mut Self)) {
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    pub(crate) fn mangled(&self, name: Atom) -> String {
        format!("${}", self.names.resolve(name))
    }

    pub(crate) fn write_mangled(&mut self, name: Atom) {
        let text = self.mangled(name);
        self.write(&text);
    }

    // ----- modules -----

    /// Register one module as a thunk keyed by its uri. The body runs once,
    /// on first require; exports are assigned as their declarations
    /// complete, so cyclic access to an already-initialized binding works.
    pub(crate) fn module(&mut self, ann: &Annotation) {
        let mut header = String::new();
        let _ = write!(
            header,
            "__yal_modules.set({}, (__yal_exports) => {{",
            js_string(&ann.uri)
        );
        self.line(&header);
        self.indented(|p| {
            for stmt in &ann.ir {
                p.module_stmt(ann, stmt);
            }
        });
        self.line("});");
    }

    pub(crate) fn require_line(&mut self, uri: &str) {
        let text = format!("__yal_require({});", js_string(uri));
        self.line(&text);
    }

    fn module_stmt(&mut self, ann: &Annotation, stmt: &IrStmt) {
        self.stmt(stmt);
        if let Some(name) = declared_name(stmt) {
            for (export_name, info) in &ann.exports {
                if info.local == name {
                    let text = format!(
                        "__yal_exports.{} = {};",
                        self.mangled(*export_name),
                        self.mangled(info.local)
                    );
                    self.line(&text);
                }
            }
        }
    }

    // ----- statements -----

    pub(crate) fn stmt(&mut self, stmt: &IrStmt) {
        match stmt {
            IrStmt::Import {
                uri,
                binding,
                names,
            } => self.import_stmt(uri, *binding, names),
            IrStmt::VarDecl {
                name,
                mutable,
                init,
            } => {
                self.write(if *mutable { "let " } else { "const " });
                self.write_mangled(*name);
                self.write(" = ");
                self.expr(init);
                self.line(";");
            }
            IrStmt::Assign { target, value } => {
                self.expr(target);
                self.write(" = ");
                self.expr(value);
                self.line(";");
            }
            IrStmt::Func(func) => {
                self.write("function ");
                self.write_mangled(func.name);
                self.func_tail(func);
            }
            IrStmt::Class {
                name,
                extends,
                fields,
                methods,
            } => self.class_stmt(*name, *extends, fields, methods),
            IrStmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.write("if (");
                self.expr(cond);
                self.line(") {");
                self.indented(|p| p.block(then_body));
                if else_body.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.indented(|p| p.block(else_body));
                    self.line("}");
                }
            }
            IrStmt::While { cond, body } => {
                self.write("while (");
                self.expr(cond);
                self.line(") {");
                self.indented(|p| p.block(body));
                self.line("}");
            }
            IrStmt::Return(value) => match value {
                Some(value) => {
                    self.write("return ");
                    self.expr(value);
                    self.line(";");
                }
                None => self.line("return;"),
            },
            IrStmt::Expr(expr) => {
                self.expr(expr);
                self.line(";");
            }
        }
    }

    pub(crate) fn block(&mut self, body: &[IrStmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn import_stmt(&mut self, uri: &str, binding: Option<Atom>, names: &[Atom]) {
        match binding {
            Some(alias) => {
                let text = format!(
                    "const {} = __yal_require({});",
                    self.mangled(alias),
                    js_string(uri)
                );
                self.line(&text);
            }
            None if names.is_empty() => self.require_line(uri),
            None => {
                self.import_temps += 1;
                let temp = format!("__yal_m{}", self.import_temps);
                let text = format!("const {temp} = __yal_require({});", js_string(uri));
                self.line(&text);
                for name in names {
                    let text = format!(
                        "const {} = {temp}.{};",
                        self.mangled(*name),
                        self.mangled(*name)
                    );
                    self.line(&text);
                }
            }
        }
    }

    /// Parameter list and body, shared by functions and methods.
    fn func_tail(&mut self, func: &IrFunc) {
        self.write("(");
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_mangled(*param);
        }
        self.line(") {");
        self.indented(|p| p.block(&func.body));
        self.line("}");
    }

    fn class_stmt(
        &mut self,
        name: Atom,
        extends: Option<Atom>,
        fields: &[Atom],
        methods: &[IrFunc],
    ) {
        self.write("class ");
        self.write_mangled(name);
        if let Some(base) = extends {
            self.write(" extends ");
            self.write_mangled(base);
        }
        self.line(" {");
        self.indented(|p| {
            // The field list includes inherited fields, in base-first order,
            // and call sites always pass a full argument list (defaults are
            // spliced during annotation). Assigning every field here makes
            // `super()` need no arguments.
            if !fields.is_empty() {
                p.write("constructor(");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        p.write(", ");
                    }
                    p.write_mangled(*field);
                }
                p.line(") {");
                p.indented(|p| {
                    if extends.is_some() {
                        p.line("super();");
                    }
                    for field in fields {
                        let text =
                            format!("this.{} = {};", p.mangled(*field), p.mangled(*field));
                        p.line(&text);
                    }
                });
                p.line("}");
            }
            for method in methods {
                p.write_mangled(method.name);
                p.func_tail(method);
            }
        });
        self.line("}");
    }
}

fn declared_name(stmt: &IrStmt) -> Option<Atom> {
    match stmt {
        IrStmt::VarDecl { name, .. } | IrStmt::Class { name, .. } => Some(*name),
        IrStmt::Func(func) => Some(func.name),
        _ => None,
    }
}

/// A double-quoted JavaScript string literal. JSON string syntax is a
/// subset of JavaScript's, so the serde encoder produces a valid literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
