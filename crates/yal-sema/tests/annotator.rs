//! End-to-end annotator scenarios driven through an in-memory host.

use std::sync::Arc;
use yal_ast::{BinaryOp, TreeBuilder};
use yal_common::Interner;
use yal_sema::{Annotation, ConstValue, IrExpr, IrStmt, MemoryHost, ModuleCache, Target};
use yal_types::{TypeId, TypeStore};

struct Fixture {
    interner: Arc<Interner>,
    types: TypeStore,
    host: MemoryHost,
}

impl Fixture {
    fn new() -> Self {
        let interner = Arc::new(Interner::new());
        Self {
            types: TypeStore::new(interner.clone()),
            interner,
            host: MemoryHost::new(),
        }
    }

    fn annotate(&self, uri: &str) -> Arc<Annotation> {
        let cache = ModuleCache::new(&self.host, &self.types);
        cache
            .get_annotation(uri, &mut Vec::new())
            .expect("module annotates")
    }
}

#[test]
fn constant_initializers_fold_to_literals() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let module = b.module(
        "main.yal",
        1,
        vec![b.const_decl("x", b.binary(BinaryOp::Add, b.num(2.0), b.num(3.0)))],
    );
    f.host.insert(module);

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    let export = ann.export(f.interner.intern("x")).expect("x is exported");
    assert_eq!(export.ty, TypeId::NUMBER);
    assert_eq!(export.value, Some(ConstValue::Number(5.0)));
    assert!(
        ann.ir.iter().any(|stmt| matches!(
            stmt,
            IrStmt::VarDecl { init: IrExpr::Number(n), .. } if *n == 5.0
        )),
        "folded initializer should lower to a literal: {:?}",
        ann.ir
    );
}

#[test]
fn forward_references_resolve_across_mutual_recursion() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let is_even = b.func(
        "is_even",
        vec![b.param("n", b.ty_name("Number"))],
        Some(b.ty_name("Bool")),
        vec![
            b.if_stmt(
                b.binary(BinaryOp::Eq, b.name("n"), b.num(0.0)),
                vec![b.ret(Some(b.bool(true)))],
                None,
            ),
            b.ret(Some(b.call_name(
                "is_odd",
                vec![b.binary(BinaryOp::Sub, b.name("n"), b.num(1.0))],
            ))),
        ],
    );
    let is_odd = b.func(
        "is_odd",
        vec![b.param("n", b.ty_name("Number"))],
        Some(b.ty_name("Bool")),
        vec![
            b.if_stmt(
                b.binary(BinaryOp::Eq, b.name("n"), b.num(0.0)),
                vec![b.ret(Some(b.bool(false)))],
                None,
            ),
            b.ret(Some(b.call_name(
                "is_even",
                vec![b.binary(BinaryOp::Sub, b.name("n"), b.num(1.0))],
            ))),
        ],
    );
    f.host
        .insert(b.module("main.yal", 1, vec![is_even, is_odd]));

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);

    // The call to is_odd happened while its binding was provisional; once
    // the declaration was finalized the reference was retro-linked.
    let odd = ann.export(f.interner.intern("is_odd")).expect("exported");
    assert!(
        ann.references
            .iter()
            .any(|r| r.decl_uri == "main.yal" && r.decl_span == odd.decl_span),
        "expected a retro-linked reference to is_odd"
    );
}

#[test]
fn default_parameters_are_spliced_at_call_sites() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let class = b.class(
        "Counter",
        None,
        vec![b.field("start", b.ty_name("Number"), false)],
        vec![b.method(
            "bump",
            vec![
                b.param("a", b.ty_name("Number")),
                b.param_default("b", b.ty_name("Number"), b.num(2.0)),
            ],
            Some(b.ty_name("Number")),
            vec![b.ret(Some(b.binary(BinaryOp::Add, b.name("a"), b.name("b"))))],
        )],
    );
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![
            class,
            b.const_decl("c", b.call_name("Counter", vec![b.num(1.0)])),
            b.const_decl("v", b.method_call(b.name("c"), "bump", vec![b.num(5.0)])),
            b.const_decl("s", b.member(b.name("c"), "start")),
        ],
    ));

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    assert_eq!(
        ann.export(f.interner.intern("v")).map(|e| e.ty),
        Some(TypeId::NUMBER)
    );
    assert_eq!(
        ann.export(f.interner.intern("s")).map(|e| e.ty),
        Some(TypeId::NUMBER)
    );

    // Signature help sees both parameters even though only one argument
    // was written; the spliced default is anchored at the call.
    let bump = f.interner.intern("bump");
    let record = ann
        .calls
        .iter()
        .find(|c| c.method == bump)
        .expect("call record for bump");
    assert_eq!(record.param_types, vec![TypeId::NUMBER, TypeId::NUMBER]);
    assert_eq!(record.arg_spans.len(), 2);
    assert_eq!(record.arg_spans[1], record.span);
}

#[test]
fn arity_mismatch_is_reported_and_recovers() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let class = b.class(
        "Counter",
        None,
        vec![],
        vec![b.method(
            "bump",
            vec![b.param("a", b.ty_name("Number"))],
            Some(b.ty_name("Number")),
            vec![b.ret(Some(b.name("a")))],
        )],
    );
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![
            class,
            b.const_decl("c", b.call_name("Counter", vec![])),
            b.const_decl("w", b.method_call(b.name("c"), "bump", vec![])),
        ],
    ));

    let ann = f.annotate("main.yal");
    assert!(
        ann.diagnostics
            .iter()
            .any(|d| d.message.contains("wrong number of arguments to 'bump'")),
        "{:?}",
        ann.diagnostics
    );
    // The failed call degrades to Any rather than cascading.
    assert_eq!(
        ann.export(f.interner.intern("w")).map(|e| e.ty),
        Some(TypeId::ANY)
    );
}

#[test]
fn generic_call_binds_type_parameters_from_arguments() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let id = b.generic_func(
        "id",
        &["T"],
        vec![b.param("x", b.ty_name("T"))],
        Some(b.ty_name("T")),
        vec![b.ret(Some(b.name("x")))],
    );
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![id, b.const_decl("y", b.call_name("id", vec![b.num(5.0)]))],
    ));

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    assert_eq!(
        ann.export(f.interner.intern("y")).map(|e| e.ty),
        Some(TypeId::NUMBER)
    );
}

#[test]
fn bare_literals_match_enum_constants_through_the_hint() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.enum_decl("Color", &[("Red", b.str("red")), ("Green", b.str("green"))]),
            b.var_decl(false, "c", Some(b.ty_name("Color")), b.str("red")),
            b.var_decl(false, "bad", Some(b.ty_name("Color")), b.str("blue")),
            b.const_decl("g", b.member(b.name("Color"), "Green")),
        ],
    ));

    let ann = f.annotate("main.yal");
    let errors: Vec<_> = ann.diagnostics.iter().filter(|d| d.is_error()).collect();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].message.contains("not assignable"));

    let g = ann.export(f.interner.intern("g")).expect("exported");
    assert_eq!(f.types.display(g.ty), "Color");
    // Enum constants are erased at runtime; the use site lowers to the
    // literal value.
    assert!(ann.ir.iter().any(|stmt| matches!(
        stmt,
        IrStmt::VarDecl { init: IrExpr::Str(s), .. } if s == "green"
    )));
}

#[test]
fn function_that_may_fall_through_needs_nullable_return() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let partial = b.func(
        "f",
        vec![b.param("n", b.ty_name("Number"))],
        Some(b.ty_name("Number")),
        vec![b.if_stmt(
            b.binary(BinaryOp::Gt, b.name("n"), b.num(0.0)),
            vec![b.ret(Some(b.num(1.0)))],
            None,
        )],
    );
    let total = b.func(
        "g",
        vec![b.param("n", b.ty_name("Number"))],
        Some(b.ty_nullable(b.ty_name("Number"))),
        vec![b.if_stmt(
            b.binary(BinaryOp::Gt, b.name("n"), b.num(0.0)),
            vec![b.ret(Some(b.num(1.0)))],
            None,
        )],
    );
    f.host.insert(b.module("main.yal", 1, vec![partial, total]));

    let ann = f.annotate("main.yal");
    let might_not_return: Vec<_> = ann
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("might not return"))
        .collect();
    // Only the non-nullable signature is flagged; Number? absorbs the
    // implicit fall-through null.
    assert_eq!(might_not_return.len(), 1, "{:?}", ann.diagnostics);
}

#[test]
fn print_calls_are_recorded_with_static_values() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![b.expr_stmt(b.call_name("print", vec![b.str("hi")]))],
    ));

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    assert_eq!(ann.prints.len(), 1);
    assert_eq!(ann.prints[0].value, Some(ConstValue::Str("hi".into())));
    assert!(ann
        .ir
        .iter()
        .any(|stmt| matches!(stmt, IrStmt::Expr(IrExpr::Print(_)))));
}

#[test]
fn target_config_binding_is_consumed_not_emitted() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "page.yal",
        1,
        vec![
            b.const_decl("__target", b.str("html")),
            b.expr_stmt(b.call_name("print", vec![b.str("hello")])),
        ],
    ));

    let ann = f.annotate("page.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    assert_eq!(ann.config.target, Target::Html);
    assert!(ann.exports.is_empty());
    assert!(
        !ann.ir
            .iter()
            .any(|stmt| matches!(stmt, IrStmt::VarDecl { .. })),
        "config bindings never reach the IR"
    );
}

#[test]
fn reserved_prefix_is_rejected_for_user_names() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![b.const_decl("__secret", b.num(1.0))],
    ));

    let ann = f.annotate("main.yal");
    assert!(
        ann.diagnostics
            .iter()
            .any(|d| d.message.contains("reserved")),
        "{:?}",
        ann.diagnostics
    );
}

#[test]
fn unknown_names_degrade_to_any_without_cascading() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![b.const_decl(
            "x",
            b.binary(BinaryOp::Add, b.name("missing"), b.num(1.0)),
        )],
    ));

    let ann = f.annotate("main.yal");
    let errors: Vec<_> = ann.diagnostics.iter().filter(|d| d.is_error()).collect();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].message.contains("unknown name 'missing'"));
    assert_eq!(
        ann.export(f.interner.intern("x")).map(|e| e.ty),
        Some(TypeId::ANY)
    );
}

#[test]
fn immutable_bindings_reject_assignment() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.const_decl("x", b.num(1.0)),
            b.let_decl("y", b.num(1.0)),
            b.assign(b.name("x"), b.num(2.0)),
            b.assign(b.name("y"), b.num(2.0)),
        ],
    ));

    let ann = f.annotate("main.yal");
    let errors: Vec<_> = ann.diagnostics.iter().filter(|d| d.is_error()).collect();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].message.contains("immutable"));
}

#[test]
fn structural_conformance_admits_a_class_into_an_interface() {
    let f = Fixture::new();
    let b = TreeBuilder::new(&f.interner);
    let iface = b.interface(
        "Sized",
        &[],
        vec![b.interface_method("size", vec![], b.ty_name("Number"))],
    );
    let class = b.class(
        "Box",
        None,
        vec![],
        vec![b.method("size", vec![], Some(b.ty_name("Number")), vec![
            b.ret(Some(b.num(3.0))),
        ])],
    );
    f.host.insert(b.module(
        "main.yal",
        1,
        vec![
            iface,
            class,
            b.var_decl(
                false,
                "s",
                Some(b.ty_name("Sized")),
                b.call_name("Box", vec![]),
            ),
        ],
    ));

    let ann = f.annotate("main.yal");
    assert!(ann.diagnostics.is_empty(), "{:?}", ann.diagnostics);
    let s = ann.export(f.interner.intern("s")).expect("exported");
    assert_eq!(f.types.display(s.ty), "Sized");
}
