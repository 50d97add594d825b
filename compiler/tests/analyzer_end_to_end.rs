// End-to-end analyzer behaviors.
//
// Each test builds a parse tree with `fxc::builder`, runs the full analysis
// (declarations, statements, effects and stage classification) and checks the
// resulting scope, IR and diagnostics through the public API only.

use std::sync::Arc;

use fxc::analyze::{analyze, AnalyzeOptions, AnalyzeResult};
use fxc::ast::{Decl, Span, Usage};
use fxc::builder as b;
use fxc::diag::{codes, DiagCode};
use fxc::entry::{check_vertex_entry, EntryError};
use fxc::ir::InstrKind;
use fxc::scope::{
    FunctionLookup, FunctionOrigin, FunctionSig, ParamSig, ProgramScope, ScopeKind, VarUsage, VariableInfo,
};
use fxc::system_scope::{build_system_scope, SystemScope};
use fxc::types::{BaseType, Field, VarType};
use fxc::typing::{check_two, TwoOp};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn run<'s>(sys: &'s SystemScope, decls: Vec<Decl>) -> AnalyzeResult<'s> {
    analyze("test.fx", &b::program(decls), sys, &AnalyzeOptions::default())
}

fn codes_of(r: &AnalyzeResult<'_>) -> Vec<DiagCode> {
    r.diagnostics.iter().map(|d| d.code).collect()
}

fn named(sys: &SystemScope, name: &str) -> VarType {
    VarType::new(sys.find_type(name).unwrap())
}

fn variable(name: &str, ty: VarType) -> VariableInfo {
    VariableInfo {
        name: name.to_string(),
        ty,
        semantic: None,
        usage: VarUsage::Local,
        instr: None,
        span: Span::default(),
    }
}

fn user_fn(name: &str, ret: VarType, params: &[VarType]) -> FunctionSig {
    let params = params
        .iter()
        .enumerate()
        .map(|(i, ty)| ParamSig {
            name: format!("a{}", i),
            ty: ty.clone(),
            semantic: None,
            has_default: false,
        })
        .collect();
    FunctionSig::new(
        name,
        ret,
        params,
        None,
        FunctionOrigin::User {
            implemented: true,
            instr: None,
        },
        Span::default(),
    )
}

/// Vertex shader `name` returning a local of struct type `ty`, plus a void
/// pixel shader and a technique binding both.
fn struct_returning_shaders(ty: &str) -> Vec<Decl> {
    vec![
        b::function(
            b::ty(ty),
            "vs",
            vec![],
            vec![b::local(b::ty(ty), vec![b::var("o")]), b::ret(b::id("o"))],
        ),
        b::function(b::ty("void"), "ps", vec![], vec![]),
        b::technique(
            "t",
            vec![b::pass(
                "p",
                vec![
                    b::state("VertexShader", b::state_expr(b::compile("vs", vec![]))),
                    b::state("PixelShader", b::state_expr(b::compile("ps", vec![]))),
                ],
            )],
        ),
    ]
}

// ── 1. Shadowing ────────────────────────────────────────────────────────────

#[test]
fn nested_declaration_shadows_ancestor() {
    let sys = build_system_scope();
    let mut scope = ProgramScope::new(&sys);
    let ancestor = scope.push(ScopeKind::Default);
    assert!(scope.add_variable(variable("n", sys.float())));
    let nested = scope.push(ScopeKind::Default);
    assert!(scope.add_variable(variable("n", sys.int())));
    scope.pop();
    scope.pop();
    let outside = scope.push(ScopeKind::Default);

    let found = scope.find_variable_from(Some(nested), "n").unwrap();
    assert!(found.ty.is_exactly("int"));
    let found = scope.find_variable_from(Some(ancestor), "n").unwrap();
    assert!(found.ty.is_exactly("float"));
    assert!(scope.find_variable_from(Some(outside), "n").is_none());
}

#[test]
fn local_shadows_global_in_analysis() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::global(b::ty("float"), vec![b::var("n")]),
            b::function(
                b::ty("int"),
                "f",
                vec![],
                vec![b::local(b::ty("int"), vec![b::var("n")]), b::ret(b::id("n"))],
            ),
        ],
    );
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
}

// ── 2. Overload resolution ──────────────────────────────────────────────────

#[test]
fn int_literal_picks_int_overload() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::function(b::ty("float"), "f", vec![b::param(b::ty("float"), "a")], vec![b::ret(b::id("a"))]),
            b::function(b::ty("int"), "f", vec![b::param(b::ty("int"), "a")], vec![b::ret(b::id("a"))]),
            b::function(b::ty("void"), "main", vec![], vec![b::expr_stmt(b::call("f", vec![b::int(1)]))]),
        ],
    );
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    let call = r
        .ir
        .iter()
        .find_map(|n| match &n.kind {
            InstrKind::FunctionCall { sig, .. } if sig.name == "f" => Some(sig.clone()),
            _ => None,
        })
        .unwrap();
    assert!(call.return_type.is_exactly("int"));
    assert_eq!(call.signature(), "f(int,)");
}

#[test]
fn identical_signatures_in_two_ancestors_are_ambiguous() {
    let sys = build_system_scope();
    let mut scope = ProgramScope::new(&sys);
    let outer = scope.push(ScopeKind::Default);
    let inner = scope.push(ScopeKind::Default);
    assert!(scope.add_function(user_fn("f", sys.float(), &[sys.float()]), Some(outer)));
    assert!(scope.add_function(user_fn("f", sys.float(), &[sys.float()]), None));

    let lookup = scope.find_function_from(Some(inner), "f", &[sys.float()]);
    assert!(matches!(lookup, FunctionLookup::Ambiguous));
    let lookup = scope.find_function_from(Some(scope.global()), "f", &[sys.float()]);
    assert!(matches!(lookup, FunctionLookup::Found(_)));
}

#[test]
fn ambiguous_call_is_reported() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::function(b::ty("float"), "g", vec![b::param(b::ty("float"), "a")], vec![b::ret(b::id("a"))]),
            b::function(
                b::ty("float"),
                "g",
                vec![b::param(b::ty("float"), "a"), b::param_default(b::ty("int"), "b", b::int(0))],
                vec![b::ret(b::id("a"))],
            ),
            b::function(b::ty("void"), "main", vec![], vec![b::expr_stmt(b::call("g", vec![b::float(1.0)]))]),
        ],
    );
    assert_eq!(codes_of(&r), vec![codes::E0216]);
}

// ── 3. Operator typing ──────────────────────────────────────────────────────

#[test]
fn broadcast_and_matrix_rules() {
    let sys = build_system_scope();
    let body = |expr| {
        vec![
            b::local(b::ty("float3"), vec![b::var("v")]),
            b::local(b::ty("float2x2"), vec![b::var("m")]),
            b::expr_stmt(expr),
        ]
    };
    use fxc::ast::BinaryOp::*;

    for e in [
        b::binary(Add, b::id("v"), b::float(1.0)),
        b::binary(Add, b::float(1.0), b::id("v")),
        b::binary(Mul, b::id("m"), b::id("m")),
    ] {
        let r = run(&sys, vec![b::function(b::ty("void"), "main", vec![], body(e))]);
        assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    }
    let r = run(
        &sys,
        vec![b::function(b::ty("void"), "main", vec![], body(b::binary(Div, b::id("m"), b::id("m"))))],
    );
    assert_eq!(codes_of(&r), vec![codes::E0201]);

    let f3 = named(&sys, "float3");
    let f = sys.float();
    let add = TwoOp::Binary(Add);
    assert!(check_two(&sys, add, &f3, &f).unwrap().is_exactly("float3"));
    assert!(check_two(&sys, add, &f, &f3).unwrap().is_exactly("float3"));
}

// ── 4. Struct semantics ─────────────────────────────────────────────────────

#[test]
fn unique_semantics_struct_is_valid_vertex_output() {
    let sys = build_system_scope();
    let mut decls = vec![b::struct_decl(
        "V",
        vec![b::field_sem("float4", "a", "POSITION"), b::field_sem("float3", "b", "TEXCOORD0")],
    )];
    decls.extend(struct_returning_shaders("V"));
    let r = run(&sys, decls);
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    let v = r.scope.find_type_from(Some(r.scope.global()), "V").unwrap();
    assert!(v.has_all_unique_semantics());
}

#[test]
fn struct_semantics_violations_reject_vertex_output() {
    let sys = build_system_scope();
    let cases = [
        vec![b::field_sem("float", "a", "POSITION"), b::field("float3", "b")],
        vec![b::field_sem("float", "a", "TEXCOORD0"), b::field_sem("float3", "b", "TEXCOORD0")],
    ];
    for fields in cases {
        let mut decls = vec![b::struct_decl("V", fields)];
        decls.extend(struct_returning_shaders("V"));
        let r = run(&sys, decls);
        assert_eq!(codes_of(&r), vec![codes::E0401], "{:?}", r.report());
    }

    let field = |name: &str, ty: VarType, semantic: &str| Field {
        name: name.to_string(),
        ty,
        semantic: Some(semantic.to_string()),
    };
    let with_sampler = BaseType::structure(
        "V",
        vec![
            field("a", sys.float4(), "POSITION"),
            field("s", named(&sys, "sampler"), "TEXCOORD0"),
        ],
    );
    assert!(with_sampler.has_all_unique_semantics());
    let sig = user_fn("vs", VarType::new(Arc::new(with_sampler)), &[]);
    assert_eq!(check_vertex_entry(&sig), Err(EntryError::ReturnStruct));
}

// ── 5. Redefinition scoping ─────────────────────────────────────────────────

#[test]
fn struct_redefinition_in_same_scope() {
    let sys = build_system_scope();
    let r = run(&sys, vec![b::struct_decl("S", vec![]), b::struct_decl("S", vec![])]);
    assert_eq!(codes_of(&r), vec![codes::E0105]);
}

#[test]
fn struct_in_child_scope_shadows() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::struct_decl("S", vec![b::field("float", "x")]),
            b::function(b::ty("void"), "f", vec![], vec![b::local_struct("S", vec![b::field("int", "y")])]),
        ],
    );
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
}

#[test]
fn system_type_names_are_reserved_everywhere() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::struct_decl("float", vec![]),
            b::function(b::ty("void"), "f", vec![], vec![b::local_struct("float", vec![])]),
        ],
    );
    assert_eq!(codes_of(&r), vec![codes::E0106, codes::E0106]);
}

// ── 6–8. Whole functions ────────────────────────────────────────────────────

#[test]
fn color_main_analyzes_cleanly() {
    let sys = build_system_scope();
    let ctor = b::call("float4", vec![b::int(1), b::int(0), b::int(0), b::int(1)]);
    let r = run(&sys, vec![b::function_sem(b::ty("float4"), "main", vec![], "COLOR", vec![b::ret(ctor)])]);
    assert!(r.diagnostics.is_empty(), "{:?}", r.report());

    let global = r.scope.scope(r.scope.global());
    assert_eq!(global.function_count(), 1);
    assert_eq!(global.functions("main").len(), 1);

    let InstrKind::Collector { decls } = r.ir.kind(r.root) else {
        panic!("root is not a collector");
    };
    let InstrKind::Function { body: Some(body), .. } = r.ir.kind(decls[0]) else {
        panic!("expected a function with a body");
    };
    let InstrKind::Block { stmts } = r.ir.kind(*body) else {
        panic!("expected a block");
    };
    assert_eq!(stmts.len(), 1);
    let InstrKind::Return { expr: Some(value) } = r.ir.kind(stmts[0]) else {
        panic!("expected a return with a value");
    };
    assert!(matches!(r.ir.kind(*value), InstrKind::ConstructorCall { .. }));
    assert!(r.ir.ty(*value).unwrap().is_exactly("float4"));
    assert!(r.ir.is_valid(r.root));
}

#[test]
fn void_main_returning_value() {
    let sys = build_system_scope();
    let r = run(&sys, vec![b::function(b::ty("void"), "main", vec![], vec![b::ret(b::int(1))])]);
    assert_eq!(codes_of(&r), vec![codes::E0301]);
    let report = r.report();
    assert_eq!(
        report[0].message,
        "Invalid return statement. Expression with 'void' type expected."
    );
}

#[test]
fn unknown_function_does_not_stop_the_block() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![b::function(
            b::ty("void"),
            "main",
            vec![],
            vec![
                b::expr_stmt(b::call("foo", vec![b::int(1), b::int(2)])),
                b::local(b::ty("int"), vec![b::var_init("x", b::int(1))]),
                b::expr_stmt(b::assign(fxc::ast::AssignOp::Assign, b::id("x"), b::int(2))),
            ],
        )],
    );
    assert_eq!(codes_of(&r), vec![codes::E0215]);
    assert!(!r.diagnostics.has_critical());
    assert!(!r.ir.iter().any(|n| matches!(n.kind, InstrKind::FunctionCall { .. })));

    let block = r
        .ir
        .iter()
        .find_map(|n| match &n.kind {
            InstrKind::Block { stmts } => Some(stmts.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(block.len(), 2);
    assert!(matches!(r.ir.kind(block[0]), InstrKind::DeclStmt { .. }));
    assert!(matches!(r.ir.kind(block[1]), InstrKind::ExprStmt { .. }));
}

// ── Options ─────────────────────────────────────────────────────────────────

#[test]
fn warnings_as_errors_promotes_warnings() {
    let sys = build_system_scope();
    let decls = vec![b::technique("t", vec![])];
    let opts = AnalyzeOptions {
        warnings_as_errors: true,
        ..AnalyzeOptions::default()
    };
    let r = analyze("t.fx", &b::program(decls.clone()), &sys, &opts);
    assert!(r.has_errors());
    let r = run(&sys, decls);
    assert!(!r.has_errors());
    assert_eq!(codes_of(&r), vec![codes::W0405]);
}

#[test]
fn uniform_globals_are_read_only() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::global(b::ty_with(&[Usage::Uniform], "float4"), vec![b::var("tint")]),
            b::function(
                b::ty("void"),
                "main",
                vec![],
                vec![b::expr_stmt(b::assign(fxc::ast::AssignOp::Assign, b::id("tint"), b::id("tint")))],
            ),
        ],
    );
    assert_eq!(codes_of(&r), vec![codes::E0202]);
    let info = r.scope.find_variable_from(Some(r.scope.global()), "tint").unwrap();
    assert!(!info.ty.writable());
}

#[test]
fn compound_assignment_keeps_the_target_shape() {
    use fxc::ast::AssignOp::*;

    let sys = build_system_scope();
    let main = |stmt| {
        vec![
            b::global(b::ty("float"), vec![b::var("s")]),
            b::global(b::ty("float3"), vec![b::var("v")]),
            b::global(b::ty("float4"), vec![b::var("p")]),
            b::global(b::ty("float4x4"), vec![b::var("m")]),
            b::function(b::ty("void"), "main", vec![], vec![b::expr_stmt(stmt)]),
        ]
    };
    for e in [
        b::assign(AddAssign, b::id("s"), b::id("v")),
        b::assign(MulAssign, b::id("m"), b::id("p")),
    ] {
        let r = run(&sys, main(e));
        assert_eq!(codes_of(&r), vec![codes::E0203]);
    }
    for e in [
        b::assign(AddAssign, b::id("v"), b::id("s")),
        b::assign(MulAssign, b::id("p"), b::id("m")),
    ] {
        let r = run(&sys, main(e));
        assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    }

    let (f, f3) = (sys.float(), named(&sys, "float3"));
    assert!(check_two(&sys, TwoOp::Assign(AddAssign), &f, &f3).is_err());
    assert!(check_two(&sys, TwoOp::Assign(AddAssign), &f3, &f).is_ok());
}

#[test]
fn bitwise_and_shift_operators() {
    use fxc::ast::BinaryOp::*;

    let sys = build_system_scope();
    let main = |expr| {
        vec![
            b::global(b::ty("int3"), vec![b::var("mask")]),
            b::global(b::ty("bool"), vec![b::var("flag")]),
            b::global(b::ty("float"), vec![b::var("f")]),
            b::function(b::ty("void"), "main", vec![], vec![b::expr_stmt(expr)]),
        ]
    };
    let r = run(&sys, main(b::binary(Shr, b::id("mask"), b::int(1))));
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    let r = run(&sys, main(b::binary(BitAnd, b::id("mask"), b::id("flag"))));
    assert_eq!(codes_of(&r), vec![codes::W0203]);
    let r = run(&sys, main(b::binary(BitXor, b::id("f"), b::int(1))));
    assert_eq!(codes_of(&r), vec![codes::E0222]);
}

#[test]
fn cbuffer_members_are_read_only_globals() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::cbuffer("PerFrame", Some("register(b1)"), vec![b::field("float4x4", "viewProj")]),
            b::function(
                b::ty("void"),
                "main",
                vec![],
                vec![b::expr_stmt(b::assign(
                    fxc::ast::AssignOp::Assign,
                    b::id("viewProj"),
                    b::id("viewProj"),
                ))],
            ),
        ],
    );
    assert_eq!(codes_of(&r), vec![codes::E0202]);
    let info = r.scope.find_variable_from(Some(r.scope.global()), "viewProj").unwrap();
    assert!(!info.ty.writable());
    assert!(r.scope.find_type("PerFrame").is_some());
}

#[test]
fn typedef_alias_works_in_signatures() {
    let sys = build_system_scope();
    let r = run(
        &sys,
        vec![
            b::typedef(b::ty("float4"), "Color"),
            b::function(
                b::ty("Color"),
                "tint",
                vec![b::param(b::ty("Color"), "c")],
                vec![b::ret(b::binary(fxc::ast::BinaryOp::Mul, b::id("c"), b::float(0.5)))],
            ),
        ],
    );
    assert!(codes_of(&r).is_empty(), "{:?}", r.report());
    let func = r
        .ir
        .iter()
        .find_map(|i| match &i.kind {
            InstrKind::Function { sig, .. } => Some(sig.clone()),
            _ => None,
        })
        .unwrap();
    assert!(func.return_type.is_exactly("float4"));
}
