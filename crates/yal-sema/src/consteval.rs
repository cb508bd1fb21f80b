//! Compile-time constant evaluation.
//!
//! Immutable bindings whose initializers reduce to literals carry a
//! `ConstValue`; the annotator threads those values through method calls so
//! `const x = 2 + 3` is known to be `5` before anything runs. Evaluation is
//! a closed table keyed on receiver kind, method name, and arity; anything
//! outside the table simply yields no value, never an error.

use std::sync::Arc;
use yal_types::{LitValue, ModuleKey};

/// A value the annotator resolved statically.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    List(Arc<Vec<ConstValue>>),
    /// An imported module binding; member access on it reads the exporting
    /// module's export table.
    Module(ModuleKey),
}

impl ConstValue {
    pub fn from_lit(lit: &LitValue) -> Self {
        match lit {
            LitValue::Null => Self::Null,
            LitValue::Bool(b) => Self::Bool(*b),
            LitValue::Number(n) => Self::Number(*n),
            LitValue::Str(s) => Self::Str(s.clone()),
        }
    }

    /// Scalar view, for the places that only speak literals (enum constants,
    /// lowered IR). Lists and modules have no literal form.
    pub fn as_lit(&self) -> Option<LitValue> {
        match self {
            Self::Null => Some(LitValue::Null),
            Self::Bool(b) => Some(LitValue::Bool(*b)),
            Self::Number(n) => Some(LitValue::Number(*n)),
            Self::Str(s) => Some(LitValue::Str(s.clone())),
            Self::List(_) | Self::Module(_) => None,
        }
    }
}

/// Structural value equality, the semantics behind folded `==` / `!=`.
fn values_equal(a: &ConstValue, b: &ConstValue) -> bool {
    match (a, b) {
        (ConstValue::Null, ConstValue::Null) => true,
        (ConstValue::Bool(x), ConstValue::Bool(y)) => x == y,
        (ConstValue::Number(x), ConstValue::Number(y)) => x == y,
        (ConstValue::Str(x), ConstValue::Str(y)) => x == y,
        (ConstValue::List(xs), ConstValue::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => false,
    }
}

/// Evaluate one method call over known values. Returns `None` whenever the
/// combination is not in the table or an operand is out of range; the caller
/// falls back to runtime semantics.
pub fn eval_const(owner: &ConstValue, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    match (method, args) {
        ("__op_eq__", [rhs]) => return Some(ConstValue::Bool(values_equal(owner, rhs))),
        ("__op_ne__", [rhs]) => return Some(ConstValue::Bool(!values_equal(owner, rhs))),
        _ => {}
    }
    match owner {
        ConstValue::Number(n) => eval_number(*n, method, args),
        ConstValue::Str(s) => eval_string(s, method, args),
        ConstValue::Bool(b) => eval_bool(*b, method, args),
        ConstValue::List(items) => eval_list(items, method, args),
        ConstValue::Null | ConstValue::Module(_) => None,
    }
}

fn eval_number(n: f64, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    match (method, args) {
        (_, [ConstValue::Number(rhs)]) => {
            let rhs = *rhs;
            let value = match method {
                "__op_add__" => ConstValue::Number(n + rhs),
                "__op_sub__" => ConstValue::Number(n - rhs),
                "__op_mul__" => ConstValue::Number(n * rhs),
                "__op_div__" => ConstValue::Number(n / rhs),
                "__op_mod__" => ConstValue::Number(n % rhs),
                "__op_lt__" => ConstValue::Bool(n < rhs),
                "__op_le__" => ConstValue::Bool(n <= rhs),
                "__op_gt__" => ConstValue::Bool(n > rhs),
                "__op_ge__" => ConstValue::Bool(n >= rhs),
                _ => return None,
            };
            Some(value)
        }
        ("__op_neg__", []) => Some(ConstValue::Number(-n)),
        ("floor", []) => Some(ConstValue::Number(n.floor())),
        ("abs", []) => Some(ConstValue::Number(n.abs())),
        ("toString", []) => Some(ConstValue::Str(format_number(n).into())),
        _ => None,
    }
}

fn eval_string(s: &Arc<str>, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    let chars: Vec<char> = s.chars().collect();
    match (method, args) {
        ("__op_add__", [ConstValue::Str(rhs)]) => {
            Some(ConstValue::Str(format!("{s}{rhs}").into()))
        }
        ("__op_lt__", [ConstValue::Str(rhs)]) => Some(ConstValue::Bool(s.as_ref() < rhs.as_ref())),
        ("__op_le__", [ConstValue::Str(rhs)]) => Some(ConstValue::Bool(s.as_ref() <= rhs.as_ref())),
        ("__op_gt__", [ConstValue::Str(rhs)]) => Some(ConstValue::Bool(s.as_ref() > rhs.as_ref())),
        ("__op_ge__", [ConstValue::Str(rhs)]) => Some(ConstValue::Bool(s.as_ref() >= rhs.as_ref())),
        ("__op_index__", [ConstValue::Number(idx)]) => {
            let i = usize_index(*idx, chars.len())?;
            Some(ConstValue::Str(chars[i].to_string().into()))
        }
        ("length", []) => Some(ConstValue::Number(chars.len() as f64)),
        ("substring", [ConstValue::Number(start), ConstValue::Number(end)]) => {
            let start = usize_bound(*start, chars.len())?;
            let end = usize_bound(*end, chars.len())?;
            if start > end {
                return None;
            }
            Some(ConstValue::Str(chars[start..end].iter().collect::<String>().into()))
        }
        ("indexOf", [ConstValue::Str(needle)]) => {
            let pos = s
                .find(needle.as_ref())
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64);
            Some(ConstValue::Number(pos))
        }
        ("split", [ConstValue::Str(sep)]) => {
            if sep.is_empty() {
                return None;
            }
            let parts = s
                .split(sep.as_ref())
                .map(|part| ConstValue::Str(part.into()))
                .collect();
            Some(ConstValue::List(Arc::new(parts)))
        }
        ("toString", []) => Some(ConstValue::Str(s.clone())),
        _ => None,
    }
}

fn eval_bool(b: bool, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    match (method, args) {
        ("__op_not__", []) => Some(ConstValue::Bool(!b)),
        ("toString", []) => Some(ConstValue::Str(if b { "true" } else { "false" }.into())),
        _ => None,
    }
}

fn eval_list(items: &Arc<Vec<ConstValue>>, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    match (method, args) {
        ("length", []) => Some(ConstValue::Number(items.len() as f64)),
        ("__op_index__", [ConstValue::Number(idx)]) => {
            let i = usize_index(*idx, items.len())?;
            Some(items[i].clone())
        }
        ("__op_add__", [ConstValue::List(rhs)]) => {
            let mut joined = items.as_ref().clone();
            joined.extend(rhs.iter().cloned());
            Some(ConstValue::List(Arc::new(joined)))
        }
        ("join", [ConstValue::Str(sep)]) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items.iter() {
                match item {
                    ConstValue::Str(s) => parts.push(s.to_string()),
                    _ => return None,
                }
            }
            Some(ConstValue::Str(parts.join(sep.as_ref()).into()))
        }
        _ => None,
    }
}

/// Display form for folded numbers, matching the runtime's formatting:
/// integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn usize_index(idx: f64, len: usize) -> Option<usize> {
    if idx.fract() != 0.0 || idx < 0.0 {
        return None;
    }
    let i = idx as usize;
    (i < len).then_some(i)
}

fn usize_bound(idx: f64, len: usize) -> Option<usize> {
    if idx.fract() != 0.0 || idx < 0.0 {
        return None;
    }
    let i = idx as usize;
    (i <= len).then_some(i)
}
