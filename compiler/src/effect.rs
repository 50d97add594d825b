// effect.rs — Techniques, passes and particle effects
//
// A technique is a named list of passes. A pass binds a vertex and a pixel
// entry point through `compile` expressions and collects render states. A
// particle effect (`partFx`) additionally binds spawn/init/update routines
// and per-pass particle properties.
//
// Preconditions: every function a `compile` names is declared above it.
// Postconditions: each technique and particle effect is registered in the
//                 global scope under its name.
// Failure modes: E0109, E040x for entry points and routines; W04xx for
//                dropped states and incomplete passes or effects.
// Side effects: none beyond the analysis context.

use std::sync::Arc;

use log::debug;

use crate::analyze::AnalyzeCtx;
use crate::ast::*;
use crate::diag::codes;
use crate::entry::{check_pixel_entry, check_vertex_entry};
use crate::id::InstrId;
use crate::ir::{Geometry, InstrKind, ParticlePass};
use crate::render_state::{apply_state, RenderStates, StateError};
use crate::scope::{FunctionSig, TechniqueInfo};
use crate::types::VarType;

/// What a pass belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PassKind<'t> {
    Render,
    /// `particle` is the struct written by the init routine, when known.
    Particle { particle: Option<&'t VarType> },
}

/// Text of a single-token value: `TRUE`, `Billboard`, `100`.
fn token_text(value: &StateValue) -> Option<String> {
    match value {
        StateValue::Token { value, .. } => Some(value.clone()),
        StateValue::Expr { expr: Expr::Id(id) } => Some(id.name.clone()),
        StateValue::Expr {
            expr: Expr::Literal { value, .. },
        } => Some(match value {
            Literal::String { value } => value.clone(),
            other => other.to_string(),
        }),
        StateValue::List { .. } | StateValue::Expr { .. } => None,
    }
}

fn flag(value: &StateValue) -> Option<bool> {
    match token_text(value)?.to_ascii_uppercase().as_str() {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

fn count(value: &StateValue) -> Option<u32> {
    token_text(value)?.parse::<u32>().ok().filter(|n| *n > 0)
}

fn writes(p: &VarType) -> bool {
    p.has_usage(Usage::Out) || p.has_usage(Usage::Inout)
}

fn spawn_rule(sig: &FunctionSig) -> bool {
    sig.return_type.is_exactly("int") && sig.params.is_empty()
}

/// Trailing particle id parameter, if present, must be a plain int.
fn optional_id(sig: &FunctionSig) -> bool {
    sig.params.get(1).map_or(true, |p| p.ty.is_exactly("int"))
}

fn init_rule(sig: &FunctionSig) -> bool {
    let Some(p0) = sig.params.first() else {
        return false;
    };
    sig.return_type.is_void()
        && sig.params.len() <= 2
        && writes(&p0.ty)
        && p0.ty.is_complex()
        && !p0.ty.is_array()
        && optional_id(sig)
}

fn update_rule(sig: &FunctionSig, particle: Option<&VarType>) -> bool {
    let Some(p0) = sig.params.first() else {
        return false;
    };
    let shape = match particle {
        Some(t) => p0.ty.is_equal(t),
        None => p0.ty.is_complex() && !p0.ty.is_array(),
    };
    sig.return_type.is_exactly("bool") && sig.params.len() <= 2 && writes(&p0.ty) && shape && optional_id(sig)
}

fn prerender_rule(sig: &FunctionSig, particle: Option<&VarType>) -> bool {
    let (Some(p0), Some(p1)) = (sig.params.first(), sig.params.get(1)) else {
        return false;
    };
    let input = p0.ty.readable()
        && p0.ty.is_complex()
        && particle.map_or(true, |t| p0.ty.is_equal(t));
    let output = p1.ty.has_usage(Usage::Out) && p1.ty.writable() && p1.ty.is_complex() && !p1.ty.is_array();
    sig.return_type.is_void() && input && output
}

impl AnalyzeCtx<'_, '_> {
    // ── Techniques ──────────────────────────────────────────────────────

    pub(crate) fn technique(&mut self, d: &TechniqueDecl) -> Option<InstrId> {
        let name = &d.name.name;
        if self.scope.find_technique(name).is_some() {
            self.error(codes::E0109, d.name.span, vec![("name", name.clone())]);
            return None;
        }
        let annotation = d.annotation.as_ref().map(|a| self.annotation(a));
        let passes: Vec<InstrId> = d
            .passes
            .iter()
            .filter_map(|p| self.pass(p, PassKind::Render))
            .collect();
        if passes.is_empty() {
            self.warning(codes::W0405, d.name.span, vec![("name", name.clone())]);
        }
        let id = self.push_instr(
            InstrKind::Technique {
                name: name.clone(),
                semantic: d.semantic.clone(),
                passes,
                annotation,
            },
            None,
            d.span,
        );
        self.scope.add_technique(TechniqueInfo {
            name: name.clone(),
            instr: id,
            partfx: false,
        });
        Some(id)
    }

    // ── Passes ──────────────────────────────────────────────────────────

    pub(crate) fn pass(&mut self, p: &PassDecl, kind: PassKind<'_>) -> Option<InstrId> {
        let pass_name = p
            .name
            .as_ref()
            .map_or_else(|| "<unnamed>".to_string(), |n| n.name.clone());
        let annotation = p.annotation.as_ref().map(|a| self.annotation(a));
        let particle_ty = match kind {
            PassKind::Render => None,
            PassKind::Particle { particle } => particle,
        };
        let mut particle = match kind {
            PassKind::Render => None,
            PassKind::Particle { .. } => Some(ParticlePass::default()),
        };
        let mut render_states = RenderStates::new();
        let mut vertex = None;
        let mut pixel = None;
        let (mut has_vertex, mut has_pixel) = (false, false);

        for st in &p.states {
            let upper = st.name.name.to_ascii_uppercase();
            if st.index.is_some() {
                self.error(codes::E0220, st.span, vec![("name", upper)]);
                continue;
            }
            match (upper.as_str(), particle.as_mut()) {
                ("VERTEXSHADER", _) => {
                    has_vertex = true;
                    vertex = self.entry_point(st, true);
                }
                ("PIXELSHADER", _) => {
                    has_pixel = true;
                    pixel = self.entry_point(st, false);
                }
                ("SORTING", Some(pp)) => match flag(&st.value) {
                    Some(v) => pp.sorting = v,
                    None => self.malformed(st, &upper, "expected TRUE or FALSE"),
                },
                ("DEFAULTSHADER", Some(pp)) => match flag(&st.value) {
                    Some(v) => pp.default_shader = v,
                    None => self.malformed(st, &upper, "expected TRUE or FALSE"),
                },
                ("GEOMETRY", Some(pp)) => {
                    match token_text(&st.value).as_deref().and_then(Geometry::parse) {
                        Some(g) => pp.geometry = g,
                        None => {
                            let value = token_text(&st.value).unwrap_or_else(|| "{...}".to_string());
                            self.dropped_state(codes::W0402, st.span, vec![("value", value), ("name", upper.clone())]);
                        }
                    }
                }
                ("INSTANCECOUNT", Some(pp)) => match count(&st.value) {
                    Some(n) => pp.instance_count = n,
                    None => self.malformed(st, &upper, "expected a positive count"),
                },
                ("PRERENDERROUTINE", Some(pp)) => {
                    let routine = self.routine(st, "prerender routine", |s| prerender_rule(s, particle_ty));
                    if let Some((id, sig)) = routine {
                        pp.prerender = Some(id);
                        pp.instance_type = sig.params.get(1).map(|p1| p1.ty.plain());
                    }
                }
                _ => self.render_state(&mut render_states, st),
            }
        }

        if let (Some(pp), Some(v)) = (particle.as_ref(), vertex) {
            self.check_instance_input(pp, v, p);
        }

        let default_shader = particle.as_ref().is_some_and(|pp| pp.default_shader);
        let complete = (has_vertex && has_pixel) || (!has_vertex && !has_pixel && default_shader);
        if !complete {
            self.warning(codes::W0404, p.span, vec![("name", pass_name.clone())]);
        }
        debug!(
            "pass {}: vertex={} pixel={} states={}",
            pass_name,
            vertex.is_some(),
            pixel.is_some(),
            render_states.len()
        );
        Some(self.push_instr(
            InstrKind::Pass {
                name: p.name.as_ref().map(|n| n.name.clone()),
                vertex,
                pixel,
                render_states,
                annotation,
                particle,
            },
            None,
            p.span,
        ))
    }

    fn malformed(&mut self, st: &PassState, name: &str, reason: &str) {
        let info = vec![("name", name.to_string()), ("reason", reason.to_string())];
        self.dropped_state(codes::W0403, st.span, info);
    }

    fn render_state(&mut self, states: &mut RenderStates, st: &PassState) {
        match apply_state(states, &st.name.name, &st.value) {
            Ok(()) => {}
            Err(StateError::UnknownState(name)) => {
                self.dropped_state(codes::W0401, st.span, vec![("name", name)]);
            }
            Err(StateError::UnsupportedValue { state, value }) => {
                self.dropped_state(codes::W0402, st.span, vec![("value", value), ("name", state)]);
            }
            Err(StateError::Malformed { state, reason }) => {
                self.malformed(st, &state, reason);
            }
        }
    }

    /// The `compile` expression of a state, or W0403 when the value is
    /// anything else.
    fn compile_value<'e>(&mut self, st: &'e PassState) -> Option<&'e Expr> {
        match &st.value {
            StateValue::Expr {
                expr: e @ Expr::Compile { .. },
            } => Some(e),
            _ => {
                let name = st.name.name.to_ascii_uppercase();
                self.malformed(st, &name, "expected a compile expression");
                None
            }
        }
    }

    /// `VertexShader = compile f(...)` / `PixelShader = ...`. The target's
    /// signature must be bindable for its stage.
    fn entry_point(&mut self, st: &PassState, vertex: bool) -> Option<InstrId> {
        let e = self.compile_value(st)?;
        let id = self.expr(e)?;
        let sig = self.ir.compiled_function(id)?.clone();
        let (checked, code) = if vertex {
            (check_vertex_entry(&sig), codes::E0401)
        } else {
            (check_pixel_entry(&sig), codes::E0402)
        };
        match checked {
            Ok(()) => Some(id),
            Err(err) => {
                self.error_with_hint(code, st.span, vec![("name", sig.name.clone())], err.to_string());
                None
            }
        }
    }

    /// A routine bound by `compile`, kept only when `rule` accepts its
    /// signature.
    fn routine(
        &mut self,
        st: &PassState,
        routine: &'static str,
        rule: impl Fn(&FunctionSig) -> bool,
    ) -> Option<(InstrId, Arc<FunctionSig>)> {
        let e = self.compile_value(st)?;
        let id = self.expr(e)?;
        let sig = self.ir.compiled_function(id)?.clone();
        if !rule(&sig) {
            let info = vec![("name", sig.name.clone()), ("routine", routine.to_string())];
            self.error(codes::E0405, st.span, info);
            return None;
        }
        Some((id, sig))
    }

    /// A particle pass vertex shader reads the prerender output.
    fn check_instance_input(&mut self, pp: &ParticlePass, vertex: InstrId, p: &PassDecl) {
        let Some(instance) = &pp.instance_type else {
            return;
        };
        let Some(sig) = self.ir.compiled_function(vertex).cloned() else {
            return;
        };
        if !sig.params.iter().any(|param| param.ty.is_equal(instance)) {
            let info = vec![("name", sig.name.clone()), ("type", instance.to_string())];
            self.error(codes::E0406, p.span, info);
        }
    }

    // ── Particle effects ────────────────────────────────────────────────

    pub(crate) fn partfx(&mut self, d: &PartFxDecl) -> Option<InstrId> {
        let name = &d.name.name;
        if self.scope.find_technique(name).is_some() {
            self.error(codes::E0109, d.name.span, vec![("name", name.clone())]);
            return None;
        }
        let annotation = d.annotation.as_ref().map(|a| self.annotation(a));
        let mut capacity = None;
        let mut spawn = None;
        let mut init = None;
        let mut particle: Option<VarType> = None;
        let mut deferred = Vec::new();

        for st in &d.properties {
            let upper = st.name.name.to_ascii_uppercase();
            if st.index.is_some() {
                self.error(codes::E0220, st.span, vec![("name", upper)]);
                continue;
            }
            match upper.as_str() {
                "CAPACITY" => match count(&st.value) {
                    Some(n) => capacity = Some(n),
                    None => self.malformed(st, &upper, "expected a positive count"),
                },
                "SPAWNROUTINE" => {
                    spawn = self.routine(st, "spawn routine", spawn_rule).map(|(id, _)| id);
                }
                "INITROUTINE" => {
                    if let Some((id, sig)) = self.routine(st, "init routine", init_rule) {
                        init = Some(id);
                        particle = sig.params.first().map(|p0| p0.ty.plain());
                    }
                }
                // checked against the particle type once init is known
                "UPDATEROUTINE" => deferred.push(st),
                _ => self.dropped_state(codes::W0401, st.span, vec![("name", upper.clone())]),
            }
        }

        let mut update = None;
        for st in deferred {
            let known = particle.as_ref();
            update = self
                .routine(st, "update routine", |s| update_rule(s, known))
                .map(|(id, _)| id);
        }

        let passes: Vec<InstrId> = d
            .passes
            .iter()
            .filter_map(|p| {
                self.pass(
                    p,
                    PassKind::Particle {
                        particle: particle.as_ref(),
                    },
                )
            })
            .collect();

        if spawn.is_none() || init.is_none() || update.is_none() {
            self.warning(codes::W0405, d.name.span, vec![("name", name.clone())]);
        }
        let id = self.push_instr(
            InstrKind::PartFx {
                name: name.clone(),
                capacity,
                spawn,
                init,
                update,
                passes,
                annotation,
            },
            particle,
            d.span,
        );
        self.scope.add_technique(TechniqueInfo {
            name: name.clone(),
            instr: id,
            partfx: true,
        });
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::analyze::{analyze, AnalyzeOptions, AnalyzeResult};
    use crate::ast::*;
    use crate::builder as b;
    use crate::diag::{codes, DiagCode, DiagLevel};
    use crate::ir::{Geometry, InstrKind};
    use crate::render_state::RenderState;
    use crate::system_scope::{build_system_scope, SystemScope};

    fn run<'s>(sys: &'s SystemScope, decls: Vec<Decl>) -> AnalyzeResult<'s> {
        analyze("effect.fx", &b::program(decls), sys, &AnalyzeOptions::default())
    }

    fn codes_of(r: &AnalyzeResult<'_>) -> Vec<DiagCode> {
        r.diagnostics.iter().map(|d| d.code).collect()
    }

    fn float4_ctor() -> Expr {
        b::call("float4", vec![b::int(1), b::int(0), b::int(0), b::int(1)])
    }

    fn vs() -> Decl {
        b::function_sem(
            b::ty("float4"),
            "vs",
            vec![b::param_sem(b::ty("float4"), "pos", "POSITION")],
            "POSITION",
            vec![b::ret(b::id("pos"))],
        )
    }

    fn ps() -> Decl {
        b::function_sem(b::ty("float4"), "ps", vec![], "COLOR", vec![b::ret(float4_ctor())])
    }

    fn shaders() -> Vec<PassState> {
        vec![
            b::state("VertexShader", b::state_expr(b::compile("vs", vec![]))),
            b::state("PixelShader", b::state_expr(b::compile("ps", vec![]))),
        ]
    }

    fn pass_node<'r>(r: &'r AnalyzeResult<'_>) -> &'r InstrKind {
        r.ir
            .iter()
            .map(|i| &i.kind)
            .find(|k| matches!(k, InstrKind::Pass { .. }))
            .expect("a pass node")
    }

    #[test]
    fn technique_with_render_states() {
        let sys = build_system_scope();
        let mut states = shaders();
        states.push(b::state("ZEnable", b::token("TRUE")));
        states.push(b::state("BlendFunc", b::tokens(&["SRCALPHA", "INVSRCALPHA"])));
        let r = run(&sys, vec![vs(), ps(), b::technique("t", vec![b::pass("p0", states)])]);
        assert!(codes_of(&r).is_empty(), "{:?}", r.report());
        let InstrKind::Pass {
            vertex,
            pixel,
            render_states,
            ..
        } = pass_node(&r)
        else {
            unreachable!()
        };
        assert!(vertex.is_some() && pixel.is_some());
        assert!(render_states.contains_key(&RenderState::ZEnable));
        assert!(render_states.contains_key(&RenderState::DestBlendAlpha));
        assert!(r.ir.is_valid(r.root));
        assert!(r.scope.find_technique("t").is_some_and(|t| !t.partfx));
    }

    #[test]
    fn technique_redefinition() {
        let sys = build_system_scope();
        let r = run(
            &sys,
            vec![
                vs(),
                ps(),
                b::technique("t", vec![b::pass("p", shaders())]),
                b::technique("t", vec![b::pass("p", shaders())]),
            ],
        );
        assert_eq!(codes_of(&r), vec![codes::E0109]);
    }

    #[test]
    fn dropped_render_states_warn() {
        let sys = build_system_scope();
        let mut states = shaders();
        states.push(b::state("FogEnable", b::token("TRUE")));
        states.push(b::state("CullFace", b::token("SIDEWAYS")));
        states.push(b::state("BlendFunc", b::tokens(&["ONE"])));
        let r = run(&sys, vec![vs(), ps(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::W0401, codes::W0402, codes::W0403]);
        assert!(!r.has_errors());
    }

    #[test]
    fn bad_entry_points() {
        let sys = build_system_scope();
        let bad_vs = b::function(b::ty("float4"), "bad_vs", vec![], vec![b::ret(float4_ctor())]);
        let bad_ps = b::function(b::ty("float3"), "bad_ps", vec![], vec![b::ret(b::call("float3", vec![b::int(0), b::int(0), b::int(0)]))]);
        let states = vec![
            b::state("VertexShader", b::state_expr(b::compile("bad_vs", vec![]))),
            b::state("PixelShader", b::state_expr(b::compile("bad_ps", vec![]))),
        ];
        let r = run(&sys, vec![bad_vs, bad_ps, b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::E0401, codes::E0402]);
        let first = r.diagnostics.iter().next().unwrap();
        assert_eq!(first.hint.as_deref(), Some("float4 return value needs the 'POSITION' semantic"));
    }

    #[test]
    fn shader_state_needs_compile() {
        let sys = build_system_scope();
        let states = vec![
            b::state("VertexShader", b::token("vs")),
            b::state("PixelShader", b::state_expr(b::compile("ps", vec![]))),
        ];
        let r = run(&sys, vec![vs(), ps(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::W0403]);
        assert!(!r.ir.is_valid(r.root));
    }

    #[test]
    fn missing_pixel_shader_is_incomplete() {
        let sys = build_system_scope();
        let states = vec![b::state("VertexShader", b::state_expr(b::compile("vs", vec![])))];
        let r = run(&sys, vec![vs(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::W0404]);
    }

    #[test]
    fn compile_unknown_function() {
        let sys = build_system_scope();
        let states = vec![
            b::state("VertexShader", b::state_expr(b::compile("nope", vec![]))),
            b::state("PixelShader", b::state_expr(b::compile("ps", vec![]))),
        ];
        let r = run(&sys, vec![ps(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::E0218]);
    }

    #[test]
    fn indexed_pass_state() {
        let sys = build_system_scope();
        let mut states = shaders();
        let mut indexed = b::state("ZEnable", b::token("TRUE"));
        indexed.index = Some(b::int(1));
        states.push(indexed);
        let r = run(&sys, vec![vs(), ps(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::E0220]);
    }

    #[test]
    fn strict_render_state_is_an_error() {
        let sys = build_system_scope();
        let mut states = shaders();
        states.push(b::state("FogEnable", b::token("TRUE")));
        let r = run(
            &sys,
            vec![b::use_strict(), vs(), ps(), b::technique("t", vec![b::pass("p", states)])],
        );
        let d = r.diagnostics.iter().next().unwrap();
        assert_eq!(d.code, codes::W0401);
        assert_eq!(d.level, DiagLevel::Error);
    }

    #[test]
    fn technique_without_passes_is_incomplete() {
        let sys = build_system_scope();
        let r = run(&sys, vec![b::technique("empty", vec![])]);
        assert_eq!(codes_of(&r), vec![codes::W0405]);
        assert!(!r.ir.is_valid(r.root));
    }

    // ── Particle effects ──

    fn particle_struct() -> Decl {
        b::struct_decl(
            "Particle",
            vec![b::field("float3", "pos"), b::field("float", "age")],
        )
    }

    fn instance_struct() -> Decl {
        b::struct_decl("Inst", vec![b::field_sem("float4", "pos", "POSITION")])
    }

    fn routines() -> Vec<Decl> {
        let out_particle = || b::ty_with(&[Usage::Out], "Particle");
        let inout_particle = || b::ty_with(&[Usage::Inout], "Particle");
        vec![
            b::function(b::ty("int"), "spawn", vec![], vec![b::ret(b::int(4))]),
            b::function(
                b::ty("void"),
                "init",
                vec![b::param(out_particle(), "p"), b::param(b::ty("int"), "id")],
                vec![b::expr_stmt(b::assign(AssignOp::Assign, b::member(b::id("p"), "age"), b::float(0.0)))],
            ),
            b::function(
                b::ty("bool"),
                "update",
                vec![b::param(inout_particle(), "p")],
                vec![b::ret(b::boolean(true))],
            ),
            b::function(
                b::ty("void"),
                "prerender",
                vec![
                    b::param(b::ty("Particle"), "p"),
                    b::param(b::ty_with(&[Usage::Out], "Inst"), "o"),
                ],
                vec![],
            ),
            b::function_sem(
                b::ty("float4"),
                "pvs",
                vec![b::param(b::ty("Inst"), "i")],
                "POSITION",
                vec![b::ret(b::member(b::id("i"), "pos"))],
            ),
        ]
    }

    fn routine_props() -> Vec<PassState> {
        vec![
            b::state("Capacity", b::token("512")),
            b::state("UpdateRoutine", b::state_expr(b::compile("update", vec![]))),
            b::state("SpawnRoutine", b::state_expr(b::compile("spawn", vec![]))),
            b::state("InitRoutine", b::state_expr(b::compile("init", vec![]))),
        ]
    }

    fn particle_program(props: Vec<PassState>, pass_states: Vec<PassState>) -> Vec<Decl> {
        let mut decls = vec![particle_struct(), instance_struct()];
        decls.extend(routines());
        decls.push(ps());
        decls.push(b::partfx("sparks", props, vec![b::pass("draw", pass_states)]));
        decls
    }

    fn particle_pass_states() -> Vec<PassState> {
        vec![
            b::state("Sorting", b::token("FALSE")),
            b::state("Geometry", b::token("Sphere")),
            b::state("InstanceCount", b::token("3")),
            b::state("PrerenderRoutine", b::state_expr(b::compile("prerender", vec![]))),
            b::state("VertexShader", b::state_expr(b::compile("pvs", vec![]))),
            b::state("PixelShader", b::state_expr(b::compile("ps", vec![]))),
        ]
    }

    #[test]
    fn complete_particle_effect() {
        let sys = build_system_scope();
        let r = run(&sys, particle_program(routine_props(), particle_pass_states()));
        assert!(codes_of(&r).is_empty(), "{:?}", r.report());
        let fx = r
            .ir
            .iter()
            .find(|i| matches!(i.kind, InstrKind::PartFx { .. }))
            .unwrap();
        let InstrKind::PartFx {
            capacity,
            spawn,
            init,
            update,
            ..
        } = &fx.kind
        else {
            unreachable!()
        };
        assert_eq!(*capacity, Some(512));
        assert!(spawn.is_some() && init.is_some() && update.is_some());
        assert_eq!(fx.ty.as_ref().map(|t| t.hash()).as_deref(), Some("Particle"));

        let InstrKind::Pass { particle, .. } = pass_node(&r) else {
            unreachable!()
        };
        let pp = particle.as_ref().unwrap();
        assert!(!pp.sorting);
        assert_eq!(pp.geometry, Geometry::Sphere);
        assert_eq!(pp.instance_count, 3);
        assert!(pp.prerender.is_some());
        assert_eq!(pp.instance_type.as_ref().map(|t| t.hash()).as_deref(), Some("Inst"));
        assert!(r.ir.is_valid(r.root));
        assert!(r.scope.find_technique("sparks").is_some_and(|t| t.partfx));
    }

    #[test]
    fn routine_shapes_are_enforced() {
        let sys = build_system_scope();
        let props = vec![
            b::state("SpawnRoutine", b::state_expr(b::compile("update", vec![]))),
            b::state("InitRoutine", b::state_expr(b::compile("init", vec![]))),
            b::state("UpdateRoutine", b::state_expr(b::compile("spawn", vec![]))),
        ];
        let r = run(&sys, particle_program(props, particle_pass_states()));
        assert_eq!(codes_of(&r), vec![codes::E0405, codes::E0405, codes::W0405]);
        let routines: Vec<&str> = r
            .diagnostics
            .iter()
            .filter_map(|d| d.get("routine"))
            .collect();
        assert_eq!(routines, vec!["spawn routine", "update routine"]);
    }

    #[test]
    fn vertex_shader_must_read_instance_type() {
        let sys = build_system_scope();
        let mut states = particle_pass_states();
        states[4] = b::state("VertexShader", b::state_expr(b::compile("vs", vec![])));
        let mut decls = particle_program(routine_props(), states);
        decls.insert(0, vs());
        let r = run(&sys, decls);
        assert_eq!(codes_of(&r), vec![codes::E0406]);
    }

    #[test]
    fn default_shader_pass_needs_no_shaders() {
        let sys = build_system_scope();
        let states = vec![b::state("DefaultShader", b::token("TRUE"))];
        let r = run(&sys, particle_program(routine_props(), states));
        assert!(codes_of(&r).is_empty(), "{:?}", r.report());
        assert!(r.ir.is_valid(r.root));
    }

    #[test]
    fn particle_property_values() {
        let sys = build_system_scope();
        let states = vec![
            b::state("DefaultShader", b::token("TRUE")),
            b::state("Geometry", b::token("Teapot")),
            b::state("InstanceCount", b::token("0")),
        ];
        let mut props = routine_props();
        props.push(b::state("Lifetime", b::token("3")));
        let r = run(&sys, particle_program(props, states));
        assert_eq!(codes_of(&r), vec![codes::W0401, codes::W0402, codes::W0403]);
    }

    #[test]
    fn particle_properties_are_render_states_elsewhere() {
        let sys = build_system_scope();
        let mut states = shaders();
        states.push(b::state("Sorting", b::token("TRUE")));
        let r = run(&sys, vec![vs(), ps(), b::technique("t", vec![b::pass("p", states)])]);
        assert_eq!(codes_of(&r), vec![codes::W0401]);
    }
}
