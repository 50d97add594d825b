// Property-based tests for analyzer invariants.
//
// Three categories:
// 1. Operator typing symmetry: arithmetic result types do not depend on
//    operand order
// 2. Scope shadowing: the innermost declaration of a name wins, siblings
//    never see each other
// 3. Swizzle writability: a swizzle is an l-value iff no component repeats
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use fxc::analyze::{analyze, AnalyzeOptions};
use fxc::ast::{BinaryOp, Span};
use fxc::builder as b;
use fxc::scope::{ProgramScope, ScopeKind, VarUsage, VariableInfo};
use fxc::system_scope::{build_system_scope, SystemScope};
use fxc::types::VarType;
use fxc::typing::{check_two, TwoOp};
use proptest::prelude::*;
use std::collections::HashSet;

// ── Test helpers ────────────────────────────────────────────────────────────

const NUMERIC_TYPES: &[&str] = &[
    "int", "int2", "int3", "int4", "float", "float2", "float3", "float4", "bool", "bool3",
    "float2x2", "float3x3", "float4x4",
];

fn named(sys: &SystemScope, name: &str) -> VarType {
    VarType::new(sys.find_type(name).unwrap_or_else(|| panic!("no system type {}", name)))
}

fn arb_type() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NUMERIC_TYPES)
}

fn arb_arith() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
    ]
}

/// A swizzle over one alphabet of a vector of length `n`, 1..=n letters.
fn arb_swizzle() -> impl Strategy<Value = (usize, String)> {
    (2usize..=4, prop::bool::ANY).prop_flat_map(|(n, rgba)| {
        let letters: Vec<char> = if rgba { "rgba" } else { "xyzw" }.chars().take(n).collect();
        prop::collection::vec(prop::sample::select(letters), 1..=n)
            .prop_map(move |cs| (n, cs.into_iter().collect::<String>()))
    })
}

fn local(name: &str, ty: VarType) -> VariableInfo {
    VariableInfo {
        name: name.to_string(),
        ty,
        semantic: None,
        usage: VarUsage::Local,
        instr: None,
        span: Span::default(),
    }
}

// ── 1. Operator typing symmetry ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn arithmetic_is_order_independent(l in arb_type(), r in arb_type(), op in arb_arith()) {
        let sys = build_system_scope();
        let (lt, rt) = (named(&sys, l), named(&sys, r));
        let forward = check_two(&sys, TwoOp::Binary(op), &lt, &rt);
        let backward = check_two(&sys, TwoOp::Binary(op), &rt, &lt);
        prop_assert_eq!(forward.is_ok(), backward.is_ok(), "{} {} {}", l, op.symbol(), r);
        if let (Ok(f), Ok(back)) = (forward, backward) {
            prop_assert_eq!(f.hash(), back.hash());
            prop_assert!(!f.writable(), "derived values are not l-values");
        }
    }

    #[test]
    fn analysis_agrees_with_operator_rules(l in arb_type(), r in arb_type(), op in arb_arith()) {
        let sys = build_system_scope();
        let body = vec![
            b::local(b::ty(l), vec![b::var("a")]),
            b::local(b::ty(r), vec![b::var("c")]),
            b::expr_stmt(b::binary(op, b::id("a"), b::id("c"))),
        ];
        let program = b::program(vec![b::function(b::ty("void"), "main", vec![], body)]);
        let result = analyze("prop.fx", &program, &sys, &AnalyzeOptions::default());
        let expected = check_two(&sys, TwoOp::Binary(op), &named(&sys, l), &named(&sys, r));
        prop_assert_eq!(result.has_errors(), expected.is_err());
    }
}

// ── 2. Scope shadowing ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    /// Declare `v` at a random subset of depths along one chain, then look it
    /// up from every depth and from a sibling branch off the root.
    #[test]
    fn innermost_declaration_wins(declared in prop::collection::vec(prop::bool::ANY, 1..8)) {
        let sys = build_system_scope();
        let mut scope = ProgramScope::new(&sys);
        let mut handles = Vec::new();
        for (depth, &here) in declared.iter().enumerate() {
            handles.push(scope.push(ScopeKind::Default));
            if here {
                let ty = VarType::new(sys.vector_of(fxc::types::ScalarKind::Float, 2).unwrap())
                    .with_dims(vec![fxc::types::ArrayLen::Fixed(depth as u32 + 1)]);
                prop_assert!(scope.add_variable(local("v", ty)));
            }
        }
        for (depth, handle) in handles.iter().enumerate() {
            let expected = declared[..=depth].iter().rposition(|&d| d);
            let found = scope.find_variable_from(Some(*handle), "v");
            match expected {
                Some(at) => {
                    let found = found.unwrap();
                    prop_assert_eq!(found.ty.length(), Some(at as u32 + 1));
                }
                None => prop_assert!(found.is_none()),
            }
        }
        scope.set_current(Some(scope.global()));
        let sibling = scope.push(ScopeKind::Default);
        prop_assert!(scope.find_variable_from(Some(sibling), "v").is_none());
    }
}

// ── 3. Swizzle writability ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn swizzle_writable_iff_unique((n, field) in arb_swizzle()) {
        let sys = build_system_scope();
        let vector = sys.vector_of(fxc::types::ScalarKind::Float, n).unwrap();
        let (ty, writable) = sys.swizzle_type(&vector, &field).unwrap();
        let unique = field.chars().collect::<HashSet<_>>().len() == field.len();
        prop_assert_eq!(writable, unique, "{}", field);
        prop_assert_eq!(ty.base.length(), field.len());
    }
}
