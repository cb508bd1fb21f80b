//! End-to-end emission: annotate with an in-memory host, then assert on
//! the generated JavaScript text.

use std::sync::Arc;
use yal_common::Interner;
use yal_emitter::Emitter;
use yal_sema::{AnnotationHost, MemoryHost, ModuleCache};
use yal_types::TypeStore;

fn emit(host: &MemoryHost, types: &TypeStore, root: &str) -> String {
    let cache = ModuleCache::new(host, types);
    let ann = cache
        .get_annotation(root, &mut Vec::new())
        .expect("root annotates");
    assert!(!ann.has_errors, "{:?}", ann.diagnostics);
    Emitter::new(&cache).emit(&ann)
}

fn fixture() -> (Arc<Interner>, TypeStore, MemoryHost) {
    let interner = Arc::new(Interner::new());
    let types = TypeStore::new(interner.clone());
    (interner, types, MemoryHost::new())
}

#[test]
fn shared_dependency_is_emitted_once() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module(
        "shared.yal",
        1,
        vec![b.const_decl("k", b.num(1.0))],
    ));
    host.insert(b.module("a.yal", 1, vec![b.import("./shared", "s")]));
    host.insert(b.module("b.yal", 1, vec![b.import("./shared", "s")]));
    host.insert(b.module(
        "main.yal",
        1,
        vec![b.import("./a", "a"), b.import("./b", "b")],
    ));

    let js = emit(&host, &types, "main.yal");
    assert_eq!(js.matches("__yal_modules.set(\"shared.yal\"").count(), 1);
    assert_eq!(js.matches("__yal_modules.set(\"main.yal\"").count(), 1);
    assert!(js.contains("__yal_require(\"main.yal\");"));
}

#[test]
fn primitive_operators_become_native_javascript() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    let add = b.func(
        "add",
        vec![
            b.param("a", b.ty_name("Number")),
            b.param("b", b.ty_name("Number")),
        ],
        Some(b.ty_name("Number")),
        vec![b.ret(Some(b.binary(
            yal_ast::BinaryOp::Add,
            b.name("a"),
            b.name("b"),
        )))],
    );
    host.insert(b.module("main.yal", 1, vec![add]));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("function $add($a, $b) {"), "{js}");
    assert!(js.contains("return ($a + $b);"), "{js}");
    assert!(!js.contains("__op_add__"), "{js}");
}

#[test]
fn user_operator_methods_stay_method_calls() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    let class = b.class(
        "Vec",
        None,
        vec![b.field("x", b.ty_name("Number"), false)],
        vec![b.method(
            "__op_add__",
            vec![b.param("other", b.ty_name("Vec"))],
            Some(b.ty_name("Number")),
            vec![b.ret(Some(b.binary(
                yal_ast::BinaryOp::Add,
                b.member(b.name("self"), "x"),
                b.member(b.name("other"), "x"),
            )))],
        )],
    );
    let combine = b.func(
        "combine",
        vec![
            b.param("v", b.ty_name("Vec")),
            b.param("w", b.ty_name("Vec")),
        ],
        Some(b.ty_name("Number")),
        vec![b.ret(Some(b.binary(
            yal_ast::BinaryOp::Add,
            b.name("v"),
            b.name("w"),
        )))],
    );
    host.insert(b.module("main.yal", 1, vec![class, combine]));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("class $Vec {"), "{js}");
    assert!(js.contains("constructor($x) {"), "{js}");
    assert!(js.contains("this.$x = $x;"), "{js}");
    assert!(js.contains("$__op_add__($other) {"), "{js}");
    assert!(js.contains("return (this.$x + $other.$x);"), "{js}");
    assert!(js.contains("return $v.$__op_add__($w);"), "{js}");
}

#[test]
fn module_bindings_wire_through_require() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module(
        "util.yal",
        1,
        vec![b.let_decl("counter", b.num(0.0))],
    ));
    host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.import("./util", "u"),
            b.expr_stmt(b.call_name("print", vec![b.member(b.name("u"), "counter")])),
        ],
    ));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("const $u = __yal_require(\"util.yal\");"), "{js}");
    assert!(js.contains("__yal_exports.$counter = $counter;"), "{js}");
    assert!(js.contains("__yal_print($u.$counter);"), "{js}");
}

#[test]
fn enum_declarations_leave_no_runtime_trace() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.enum_decl("Color", &[("Red", b.str("red")), ("Green", b.str("green"))]),
            b.var_decl(false, "c", Some(b.ty_name("Color")), b.str("red")),
            b.const_decl("g", b.member(b.name("Color"), "Green")),
        ],
    ));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("const $c = \"red\";"), "{js}");
    assert!(js.contains("const $g = \"green\";"), "{js}");
    assert!(!js.contains("Color"), "{js}");
}

#[test]
fn html_target_wraps_the_script() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module(
        "page.yal",
        1,
        vec![
            b.const_decl("__target", b.str("html")),
            b.expr_stmt(b.call_name("print", vec![b.str("hello")])),
        ],
    ));

    let js = emit(&host, &types, "page.yal");
    assert!(js.starts_with("<!DOCTYPE html>"), "{js}");
    assert!(js.contains("<script type=\"module\">"), "{js}");
    assert!(js.contains("__yal_print(\"hello\");"), "{js}");
}

#[test]
fn lib_config_modules_join_the_emit_set() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module(
        "styles.yal",
        1,
        vec![b.expr_stmt(b.call_name("print", vec![b.str("styles loaded")]))],
    ));
    host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.const_decl("__lib", b.list(vec![b.str("./styles")])),
            b.expr_stmt(b.call_name("print", vec![b.str("main")])),
        ],
    ));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("__yal_modules.set(\"styles.yal\""), "{js}");
    let styles = js
        .find("__yal_require(\"styles.yal\");")
        .expect("styles required");
    let main = js.rfind("__yal_require(\"main.yal\");").expect("main required");
    assert!(styles < main, "libraries run before the root: {js}");
}

#[test]
fn list_and_string_builtins_map_to_natives() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    let body = vec![
        b.let_decl("xs", b.list(vec![b.num(1.0), b.num(2.0)])),
        b.expr_stmt(b.method_call(b.name("xs"), "push", vec![b.num(3.0)])),
        b.ret(Some(b.binary(
            yal_ast::BinaryOp::Add,
            b.method_call(b.name("xs"), "length", vec![]),
            b.method_call(b.name("s"), "indexOf", vec![b.str("a")]),
        ))),
    ];
    let f = b.func(
        "f",
        vec![b.param("s", b.ty_name("String"))],
        Some(b.ty_name("Number")),
        body,
    );
    host.insert(b.module("main.yal", 1, vec![f]));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("$xs.push(3);"), "{js}");
    assert!(js.contains("$xs.length"), "{js}");
    assert!(js.contains("$s.indexOf(\"a\")"), "{js}");
}

#[test]
fn from_imports_bind_individual_names() {
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    let double = b.func(
        "double",
        vec![b.param("n", b.ty_name("Number"))],
        Some(b.ty_name("Number")),
        vec![b.ret(Some(b.binary(
            yal_ast::BinaryOp::Mul,
            b.name("n"),
            b.num(2.0),
        )))],
    );
    host.insert(b.module("util.yal", 1, vec![double]));
    host.insert(b.module(
        "main.yal",
        1,
        vec![
            b.from_import("./util", &["double"]),
            b.expr_stmt(b.call_name("print", vec![b.call_name("double", vec![b.num(4.0)])])),
        ],
    ));

    let js = emit(&host, &types, "main.yal");
    assert!(js.contains("const __yal_m1 = __yal_require(\"util.yal\");"), "{js}");
    assert!(js.contains("const $double = __yal_m1.$double;"), "{js}");
    assert!(js.contains("__yal_print($double(4));"), "{js}");
}

#[test]
fn host_trait_object_is_enough_for_emission() {
    // The emitter only needs the cache; make sure nothing forces a concrete
    // host type through the public surface.
    let (interner, types, host) = fixture();
    let b = yal_ast::TreeBuilder::new(&interner);
    host.insert(b.module("main.yal", 1, vec![b.const_decl("x", b.num(1.0))]));
    let host_obj: &dyn AnnotationHost = &host;
    let cache = ModuleCache::new(host_obj, &types);
    let ann = cache
        .get_annotation("main.yal", &mut Vec::new())
        .expect("annotates");
    let js = Emitter::new(&cache).emit(&ann);
    assert!(js.contains("const $x = 1;"), "{js}");
}
