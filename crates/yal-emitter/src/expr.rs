//! Expression emission.
//!
//! `__op_*__` calls whose receiver the annotator classified as a primitive
//! kind are rendered as native JavaScript operators; everything else stays
//! a method call on the mangled name. List equality is the one operator
//! with no native equivalent (JS `===` on arrays is identity) and goes
//! through the `__yal_eq` runtime helper.

use crate::printer::{Printer, js_string};
use yal_common::Atom;
use yal_sema::{IrExpr, RecvKind};

/// Operators that map one-to-one onto a JavaScript binary operator for
/// primitive receivers.
fn native_binary(method: &str) -> Option<&'static str> {
    match method {
        "__op_add__" => Some("+"),
        "__op_sub__" => Some("-"),
        "__op_mul__" => Some("*"),
        "__op_div__" => Some("/"),
        "__op_mod__" => Some("%"),
        "__op_eq__" => Some("==="),
        "__op_ne__" => Some("!=="),
        "__op_lt__" => Some("<"),
        "__op_le__" => Some("<="),
        "__op_gt__" => Some(">"),
        "__op_ge__" => Some(">="),
        _ => None,
    }
}

impl Printer<'_> {
    pub(crate) fn expr(&mut self, expr: &IrExpr) {
        match expr {
            IrExpr::Null => self.write("null"),
            IrExpr::Bool(true) => self.write("true"),
            IrExpr::Bool(false) => self.write("false"),
            IrExpr::Number(n) => self.write_number(*n),
            IrExpr::Str(s) => {
                let lit = js_string(s);
                self.write(&lit);
            }
            IrExpr::List(items) => {
                self.write("[");
                self.comma_separated(items);
                self.write("]");
            }
            IrExpr::Name(name) => self.write_name(*name),
            IrExpr::Member { owner, name } => {
                self.receiver(owner);
                self.write(".");
                self.write_mangled(*name);
            }
            IrExpr::Index { owner, index } => {
                self.receiver(owner);
                self.write("[");
                self.expr(index);
                self.write("]");
            }
            IrExpr::MethodCall {
                owner,
                method,
                args,
                recv,
            } => self.method_call(owner, *method, args, *recv),
            IrExpr::Call { callee, args } => {
                self.receiver(callee);
                self.write("(");
                self.comma_separated(args);
                self.write(")");
            }
            IrExpr::Construct { callee, args } => {
                self.write("new ");
                self.receiver(callee);
                self.write("(");
                self.comma_separated(args);
                self.write(")");
            }
            IrExpr::Logic { and, lhs, rhs } => {
                self.write("(");
                self.expr(lhs);
                self.write(if *and { " && " } else { " || " });
                self.expr(rhs);
                self.write(")");
            }
            IrExpr::FunctionLit { params, body } => {
                self.write("((");
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write_mangled(*param);
                }
                self.line(") => {");
                self.indented(|p| p.block(body));
                self.write("})");
            }
            IrExpr::Print(args) => {
                self.write("__yal_print(");
                self.comma_separated(args);
                self.write(")");
            }
        }
    }

    fn write_name(&mut self, name: Atom) {
        let text = self.names.resolve(name);
        match &*text {
            // The implicit receiver binding; arrows inherit it, so function
            // literals inside methods see the right object.
            "self" => self.write("this"),
            "print" => self.write("__yal_print"),
            _ => self.write_mangled(name),
        }
    }

    fn write_number(&mut self, n: f64) {
        let text = if n.is_finite() && n == n.trunc() && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{n}")
        };
        self.write(&text);
    }

    fn comma_separated(&mut self, exprs: &[IrExpr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(expr);
        }
    }

    /// Emit an expression in receiver position. Number literals need parens
    /// so the dot is not parsed as a decimal point.
    fn receiver(&mut self, expr: &IrExpr) {
        if matches!(expr, IrExpr::Number(_)) {
            self.write("(");
            self.expr(expr);
            self.write(")");
        } else {
            self.expr(expr);
        }
    }

    fn method_call(&mut self, owner: &IrExpr, method: Atom, args: &[IrExpr], recv: RecvKind) {
        let method_text = self.names.resolve(method).to_string();
        match recv {
            RecvKind::General => self.plain_method_call(owner, method, args),
            RecvKind::Null => match method_text.as_str() {
                "__op_eq__" if args.len() == 1 => self.binary(owner, "===", &args[0]),
                "__op_ne__" if args.len() == 1 => self.binary(owner, "!==", &args[0]),
                _ => self.plain_method_call(owner, method, args),
            },
            RecvKind::Number | RecvKind::String | RecvKind::Bool | RecvKind::List => {
                if let Some(op) = native_binary(&method_text) {
                    if recv == RecvKind::List && method_text == "__op_eq__" {
                        self.helper_call("__yal_eq", owner, args);
                    } else if recv == RecvKind::List && method_text == "__op_ne__" {
                        self.write("(!");
                        self.helper_call("__yal_eq", owner, args);
                        self.write(")");
                    } else if recv == RecvKind::List && method_text == "__op_add__" {
                        self.native_method_call(owner, "concat", args);
                    } else if args.len() == 1 {
                        self.binary(owner, op, &args[0]);
                    } else {
                        self.plain_method_call(owner, method, args);
                    }
                    return;
                }
                match method_text.as_str() {
                    "__op_neg__" => {
                        self.write("(-");
                        self.receiver(owner);
                        self.write(")");
                    }
                    "__op_not__" => {
                        self.write("(!");
                        self.receiver(owner);
                        self.write(")");
                    }
                    "__op_index__" if args.len() == 1 => {
                        self.receiver(owner);
                        self.write("[");
                        self.expr(&args[0]);
                        self.write("]");
                    }
                    "length" => {
                        self.receiver(owner);
                        self.write(".length");
                    }
                    "floor" => self.helper_call("Math.floor", owner, args),
                    "abs" => self.helper_call("Math.abs", owner, args),
                    "toString" => self.helper_call("String", owner, args),
                    // substring, indexOf, split, push, pop, join map onto
                    // the JavaScript method of the same name.
                    _ => self.native_method_call(owner, &method_text, args),
                }
            }
        }
    }

    fn binary(&mut self, lhs: &IrExpr, op: &str, rhs: &IrExpr) {
        self.write("(");
        self.expr(lhs);
        self.write(" ");
        self.write(op);
        self.write(" ");
        self.expr(rhs);
        self.write(")");
    }

    /// `helper(owner, args...)`
    fn helper_call(&mut self, helper: &str, owner: &IrExpr, args: &[IrExpr]) {
        self.write(helper);
        self.write("(");
        self.expr(owner);
        for arg in args {
            self.write(", ");
            self.expr(arg);
        }
        self.write(")");
    }

    /// `owner.method(args...)` without name mangling, for JavaScript
    /// built-ins.
    fn native_method_call(&mut self, owner: &IrExpr, method: &str, args: &[IrExpr]) {
        self.receiver(owner);
        self.write(".");
        self.write(method);
        self.write("(");
        self.comma_separated(args);
        self.write(")");
    }

    fn plain_method_call(&mut self, owner: &IrExpr, method: Atom, args: &[IrExpr]) {
        self.receiver(owner);
        self.write(".");
        self.write_mangled(method);
        self.write("(");
        self.comma_separated(args);
        self.write(")");
    }
}
