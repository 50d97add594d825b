// classify.rs — Shader stage classification
//
// Second pass over a finished IR graph. Walks every technique and particle
// effect, records the stage each `compile`d function is bound to, and checks
// that vertex and pixel entry points only reach builtins available in their
// stage. Results go to a side table keyed by `FunctionId`; the graph itself
// is not touched.
//
// Preconditions: `root` is the `Collector` node of a completed analysis.
// Postconditions: every function bound by a pass or routine has one entry.
// Failure modes: E0403 (vertex and pixel use of one function), E0404
//                (stage-restricted builtin reached from an entry point).
// Side effects: none.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::ast::Span;
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::id::{FunctionId, InstrId};
use crate::ir::{InstrKind, Ir};
use crate::scope::FunctionSig;

// ── Side table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Vertex,
    Pixel,
    /// Particle spawn/init/update and prerender routines.
    Generic,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Pixel => "pixel",
            Stage::Generic => "generic",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEntry {
    pub name: String,
    pub signature: String,
    pub stage: Stage,
}

/// Function id → stage, ordered by id for stable output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct StageTable {
    entries: BTreeMap<FunctionId, StageEntry>,
}

impl StageTable {
    pub fn get(&self, id: &FunctionId) -> Option<&StageEntry> {
        self.entries.get(id)
    }

    /// Stage of the first classified function named `name`.
    pub fn stage_of(&self, name: &str) -> Option<Stage> {
        self.entries.values().find(|e| e.name == name).map(|e| e.stage)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunctionId, &StageEntry)> {
        self.entries.iter()
    }

    /// One `signature stage [id]` line per entry.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (id, e) in &self.entries {
            let _ = writeln!(out, "{} {} [{}]", e.signature, e.stage, id);
        }
        out
    }
}

pub struct ClassifyResult {
    pub stages: StageTable,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Pass ────────────────────────────────────────────────────────────────────

struct ClassifyCtx<'a> {
    ir: &'a Ir,
    /// Body block of every implemented user function.
    bodies: HashMap<FunctionId, InstrId>,
    stages: StageTable,
    diagnostics: Vec<Diagnostic>,
    conflicts: HashSet<FunctionId>,
    reported_calls: HashSet<(FunctionId, FunctionId)>,
}

pub fn classify(ir: &Ir, root: InstrId) -> ClassifyResult {
    let mut ctx = ClassifyCtx::new(ir);
    if let InstrKind::Collector { decls } = ir.kind(root) {
        for &decl in decls {
            ctx.decl(decl);
        }
    }
    debug!(
        "classified {} functions, {} diagnostics",
        ctx.stages.len(),
        ctx.diagnostics.len()
    );
    ClassifyResult {
        stages: ctx.stages,
        diagnostics: ctx.diagnostics,
    }
}

impl<'a> ClassifyCtx<'a> {
    fn new(ir: &'a Ir) -> Self {
        let bodies = ir
            .iter()
            .filter_map(|node| match &node.kind {
                InstrKind::Function {
                    sig, body: Some(body), ..
                } => Some((sig.id.clone(), *body)),
                _ => None,
            })
            .collect();
        ClassifyCtx {
            ir,
            bodies,
            stages: StageTable::default(),
            diagnostics: Vec::new(),
            conflicts: HashSet::new(),
            reported_calls: HashSet::new(),
        }
    }

    fn decl(&mut self, id: InstrId) {
        let ir = self.ir;
        match ir.kind(id) {
            InstrKind::Technique { passes, .. } => {
                for &p in passes {
                    self.pass(p);
                }
            }
            InstrKind::PartFx {
                spawn,
                init,
                update,
                passes,
                ..
            } => {
                for routine in [spawn, init, update].into_iter().flatten() {
                    self.mark(*routine, Stage::Generic);
                }
                for &p in passes {
                    self.pass(p);
                }
            }
            _ => {}
        }
    }

    fn pass(&mut self, id: InstrId) {
        let ir = self.ir;
        let InstrKind::Pass {
            vertex,
            pixel,
            particle,
            ..
        } = ir.kind(id)
        else {
            return;
        };
        if let Some(prerender) = particle.as_ref().and_then(|p| p.prerender) {
            self.mark(prerender, Stage::Generic);
        }
        if let Some(v) = vertex {
            self.mark(*v, Stage::Vertex);
        }
        if let Some(p) = pixel {
            self.mark(*p, Stage::Pixel);
        }
    }

    /// Record `stage` for the function a `Compile` node binds. A shader
    /// stage replaces generic; vertex against pixel is a conflict.
    fn mark(&mut self, compile: InstrId, stage: Stage) {
        let Some(sig) = self.ir.compiled_function(compile).cloned() else {
            return;
        };
        let span = self.ir.get(compile).span;
        let previous = self.stages.get(&sig.id).map(|e| e.stage);
        match (previous, stage) {
            (None, _) | (Some(Stage::Generic), Stage::Vertex | Stage::Pixel) => {
                self.stages.entries.insert(
                    sig.id.clone(),
                    StageEntry {
                        name: sig.name.clone(),
                        signature: sig.signature(),
                        stage,
                    },
                );
            }
            (Some(Stage::Vertex), Stage::Pixel) | (Some(Stage::Pixel), Stage::Vertex) => {
                if self.conflicts.insert(sig.id.clone()) {
                    let d = Diagnostic::new(DiagLevel::Error, codes::E0403, Some(span))
                        .with("name", sig.name.clone());
                    self.diagnostics.push(d);
                }
            }
            _ => {}
        }
        if stage != Stage::Generic {
            self.check_calls(&sig, stage);
        }
    }

    /// Every builtin reachable from `entry` must be usable in `stage`.
    fn check_calls(&mut self, entry: &Arc<FunctionSig>, stage: Stage) {
        let Some(&body) = self.bodies.get(&entry.id) else {
            return;
        };
        let mut visited: HashSet<FunctionId> = HashSet::from([entry.id.clone()]);
        let ir = self.ir;
        let mut stack = vec![body];
        while let Some(id) = stack.pop() {
            let node = ir.get(id);
            if let InstrKind::FunctionCall { sig: callee, .. } = &node.kind {
                if callee.is_builtin() {
                    let usable = match stage {
                        Stage::Vertex => callee.vertex_usable(),
                        Stage::Pixel => callee.pixel_usable(),
                        Stage::Generic => true,
                    };
                    if !usable {
                        self.unavailable(entry, callee, stage, node.span);
                    }
                } else if visited.insert(callee.id.clone()) {
                    if let Some(&b) = self.bodies.get(&callee.id) {
                        stack.push(b);
                    }
                }
            }
            stack.extend(node.kind.children().into_iter().rev());
        }
    }

    fn unavailable(&mut self, entry: &FunctionSig, callee: &FunctionSig, stage: Stage, span: Span) {
        if !self.reported_calls.insert((entry.id.clone(), callee.id.clone())) {
            return;
        }
        let d = Diagnostic::new(DiagLevel::Error, codes::E0404, Some(span))
            .with("name", entry.name.clone())
            .with("callee", callee.signature())
            .with("stage", stage.to_string());
        self.diagnostics.push(d);
    }
}
