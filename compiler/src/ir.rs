// ir.rs — Typed instruction graph produced by analysis
//
// One node type (`Instr`) with shared fields and a variant payload per
// declaration, expression and statement kind. Nodes live in an arena
// addressed by `InstrId`; children are built before their parent, and the
// parent link is filled in when the parent is pushed. The graph is not
// restructured after construction; stage classification lives in a side
// table (see `classify`).
//
// Preconditions: every child id passed to `push` was returned by this arena.
// Postconditions: `parent` of each child names the node that consumed it.
// Failure modes: none.
// Side effects: `is_valid` fills a per-node cache on first query.

use std::cell::OnceCell;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::ast::{AssignOp, BinaryOp, Literal, LogicalOp, PostfixOp, Span, UnaryOp};
use crate::id::{IdAllocator, InstrId, ScopeId};
use crate::render_state::RenderStates;
use crate::sampler::SamplerStates;
use crate::scope::{FunctionSig, VarUsage};
use crate::types::VarType;

// ── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
    Discard,
}

impl JumpKind {
    fn name(self) -> &'static str {
        match self {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
            JumpKind::Discard => "discard",
        }
    }
}

/// Primitive drawn per particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Geometry {
    #[default]
    Billboard,
    Cylinder,
    Box,
    Sphere,
    Line,
}

impl Geometry {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BILLBOARD" => Some(Geometry::Billboard),
            "CYLINDER" => Some(Geometry::Cylinder),
            "BOX" => Some(Geometry::Box),
            "SPHERE" => Some(Geometry::Sphere),
            "LINE" => Some(Geometry::Line),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Geometry::Billboard => "Billboard",
            Geometry::Cylinder => "Cylinder",
            Geometry::Box => "Box",
            Geometry::Sphere => "Sphere",
            Geometry::Line => "Line",
        }
    }
}

/// Particle-specific pass properties.
#[derive(Debug, Clone)]
pub struct ParticlePass {
    pub sorting: bool,
    pub default_shader: bool,
    pub geometry: Geometry,
    pub instance_count: u32,
    /// `Compile` node of the prerender routine.
    pub prerender: Option<InstrId>,
    /// Struct written by the prerender routine and read by the vertex shader.
    pub instance_type: Option<VarType>,
}

impl Default for ParticlePass {
    fn default() -> Self {
        ParticlePass {
            sorting: true,
            default_shader: false,
            geometry: Geometry::Billboard,
            instance_count: 1,
            prerender: None,
            instance_type: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InstrKind {
    /// Root: every top-level declaration in source order.
    Collector { decls: Vec<InstrId> },

    // Declarations
    Variable {
        name: String,
        usage: VarUsage,
        semantic: Option<String>,
        init: Option<InstrId>,
        annotation: Option<InstrId>,
    },
    TypeDecl { name: String, fields: Vec<InstrId> },
    /// `decl` is the inline struct the alias names, if any.
    Typedef { alias: String, decl: Option<InstrId> },
    /// Members are global uniform `Variable` nodes.
    Cbuffer {
        name: String,
        semantic: Option<String>,
        fields: Vec<InstrId>,
        annotation: Option<InstrId>,
    },
    Function {
        sig: Arc<FunctionSig>,
        /// Structs declared inline in the return or parameter types.
        types: Vec<InstrId>,
        params: Vec<InstrId>,
        body: Option<InstrId>,
        annotation: Option<InstrId>,
    },
    Annotation { decls: Vec<InstrId> },
    Technique {
        name: String,
        semantic: Option<String>,
        passes: Vec<InstrId>,
        annotation: Option<InstrId>,
    },
    /// `vertex`/`pixel` are `Compile` nodes.
    Pass {
        name: Option<String>,
        vertex: Option<InstrId>,
        pixel: Option<InstrId>,
        render_states: RenderStates,
        annotation: Option<InstrId>,
        particle: Option<ParticlePass>,
    },
    /// Routines are `Compile` nodes.
    PartFx {
        name: String,
        capacity: Option<u32>,
        spawn: Option<InstrId>,
        init: Option<InstrId>,
        update: Option<InstrId>,
        passes: Vec<InstrId>,
        annotation: Option<InstrId>,
    },
    Provide { module: String },
    Use { mode: String },

    // Expressions
    Literal(Literal),
    Id { name: String, decl: Option<InstrId> },
    Arithmetic { op: BinaryOp, lhs: InstrId, rhs: InstrId },
    Bitwise { op: BinaryOp, lhs: InstrId, rhs: InstrId },
    Relational { op: BinaryOp, lhs: InstrId, rhs: InstrId },
    Logical { op: LogicalOp, lhs: InstrId, rhs: InstrId },
    Assignment { op: AssignOp, lhs: InstrId, rhs: InstrId },
    Unary { op: UnaryOp, operand: InstrId },
    PostfixIncDec { op: PostfixOp, operand: InstrId },
    PostfixIndex { base: InstrId, index: InstrId },
    PostfixPoint { base: InstrId, field: String },
    Cast { operand: InstrId },
    Conditional { cond: InstrId, then: InstrId, else_: InstrId },
    /// Parenthesized expression.
    Complex { expr: InstrId },
    FunctionCall { sig: Arc<FunctionSig>, args: Vec<InstrId> },
    ConstructorCall { args: Vec<InstrId> },
    Compile { sig: Arc<FunctionSig>, args: Vec<InstrId> },
    SamplerState { states: SamplerStates },
    InitList { items: Vec<InstrId> },

    // Statements
    Block { stmts: Vec<InstrId> },
    ExprStmt { expr: InstrId },
    Empty,
    If { cond: InstrId, then: InstrId, else_: Option<InstrId> },
    While { cond: InstrId, body: InstrId },
    DoWhile { body: InstrId, cond: InstrId },
    For {
        init: Option<InstrId>,
        cond: Option<InstrId>,
        step: Option<InstrId>,
        body: InstrId,
    },
    Return { expr: Option<InstrId> },
    Jump(JumpKind),
    DeclStmt { decls: Vec<InstrId> },
}

impl InstrKind {
    pub fn name(&self) -> &'static str {
        match self {
            InstrKind::Collector { .. } => "Collector",
            InstrKind::Variable { .. } => "Variable",
            InstrKind::TypeDecl { .. } => "TypeDecl",
            InstrKind::Typedef { .. } => "Typedef",
            InstrKind::Cbuffer { .. } => "Cbuffer",
            InstrKind::Function { .. } => "Function",
            InstrKind::Annotation { .. } => "Annotation",
            InstrKind::Technique { .. } => "Technique",
            InstrKind::Pass { .. } => "Pass",
            InstrKind::PartFx { .. } => "PartFx",
            InstrKind::Provide { .. } => "Provide",
            InstrKind::Use { .. } => "Use",
            InstrKind::Literal(_) => "Literal",
            InstrKind::Id { .. } => "Id",
            InstrKind::Arithmetic { .. } => "Arithmetic",
            InstrKind::Bitwise { .. } => "Bitwise",
            InstrKind::Relational { .. } => "Relational",
            InstrKind::Logical { .. } => "Logical",
            InstrKind::Assignment { .. } => "Assignment",
            InstrKind::Unary { .. } => "Unary",
            InstrKind::PostfixIncDec { .. } => "PostfixIncDec",
            InstrKind::PostfixIndex { .. } => "PostfixIndex",
            InstrKind::PostfixPoint { .. } => "PostfixPoint",
            InstrKind::Cast { .. } => "Cast",
            InstrKind::Conditional { .. } => "Conditional",
            InstrKind::Complex { .. } => "Complex",
            InstrKind::FunctionCall { .. } => "FunctionCall",
            InstrKind::ConstructorCall { .. } => "ConstructorCall",
            InstrKind::Compile { .. } => "Compile",
            InstrKind::SamplerState { .. } => "SamplerState",
            InstrKind::InitList { .. } => "InitList",
            InstrKind::Block { .. } => "Block",
            InstrKind::ExprStmt { .. } => "ExprStmt",
            InstrKind::Empty => "Empty",
            InstrKind::If { .. } => "If",
            InstrKind::While { .. } => "While",
            InstrKind::DoWhile { .. } => "DoWhile",
            InstrKind::For { .. } => "For",
            InstrKind::Return { .. } => "Return",
            InstrKind::Jump(_) => "Jump",
            InstrKind::DeclStmt { .. } => "DeclStmt",
        }
    }

    /// Owned children in source order.
    pub fn children(&self) -> Vec<InstrId> {
        let mut out = Vec::new();
        let opt = |o: &Option<InstrId>, out: &mut Vec<InstrId>| {
            if let Some(id) = o {
                out.push(*id);
            }
        };
        match self {
            InstrKind::Collector { decls }
            | InstrKind::Annotation { decls }
            | InstrKind::DeclStmt { decls } => out.extend(decls),
            InstrKind::Variable { init, annotation, .. } => {
                opt(annotation, &mut out);
                opt(init, &mut out);
            }
            InstrKind::TypeDecl { fields, .. } => out.extend(fields),
            InstrKind::Typedef { decl, .. } => opt(decl, &mut out),
            InstrKind::Cbuffer { fields, annotation, .. } => {
                opt(annotation, &mut out);
                out.extend(fields);
            }
            InstrKind::Function {
                types,
                params,
                body,
                annotation,
                ..
            } => {
                out.extend(types);
                opt(annotation, &mut out);
                out.extend(params);
                opt(body, &mut out);
            }
            InstrKind::Technique { passes, annotation, .. } => {
                opt(annotation, &mut out);
                out.extend(passes);
            }
            InstrKind::Pass {
                vertex,
                pixel,
                annotation,
                particle,
                ..
            } => {
                opt(annotation, &mut out);
                if let Some(p) = particle {
                    opt(&p.prerender, &mut out);
                }
                opt(vertex, &mut out);
                opt(pixel, &mut out);
            }
            InstrKind::PartFx {
                spawn,
                init,
                update,
                passes,
                annotation,
                ..
            } => {
                opt(annotation, &mut out);
                opt(spawn, &mut out);
                opt(init, &mut out);
                opt(update, &mut out);
                out.extend(passes);
            }
            InstrKind::Provide { .. }
            | InstrKind::Use { .. }
            | InstrKind::Literal(_)
            | InstrKind::Id { .. }
            | InstrKind::SamplerState { .. }
            | InstrKind::Empty
            | InstrKind::Jump(_) => {}
            InstrKind::Arithmetic { lhs, rhs, .. }
            | InstrKind::Bitwise { lhs, rhs, .. }
            | InstrKind::Relational { lhs, rhs, .. }
            | InstrKind::Logical { lhs, rhs, .. }
            | InstrKind::Assignment { lhs, rhs, .. } => out.extend([*lhs, *rhs]),
            InstrKind::Unary { operand, .. }
            | InstrKind::PostfixIncDec { operand, .. }
            | InstrKind::Cast { operand } => out.push(*operand),
            InstrKind::PostfixIndex { base, index } => out.extend([*base, *index]),
            InstrKind::PostfixPoint { base, .. } => out.push(*base),
            InstrKind::Conditional { cond, then, else_ } => out.extend([*cond, *then, *else_]),
            InstrKind::Complex { expr } | InstrKind::ExprStmt { expr } => out.push(*expr),
            InstrKind::FunctionCall { args, .. }
            | InstrKind::ConstructorCall { args }
            | InstrKind::Compile { args, .. } => out.extend(args),
            InstrKind::InitList { items } => out.extend(items),
            InstrKind::Block { stmts } => out.extend(stmts),
            InstrKind::If { cond, then, else_ } => {
                out.extend([*cond, *then]);
                opt(else_, &mut out);
            }
            InstrKind::While { cond, body } => out.extend([*cond, *body]),
            InstrKind::DoWhile { body, cond } => out.extend([*body, *cond]),
            InstrKind::For {
                init,
                cond,
                step,
                body,
            } => {
                opt(init, &mut out);
                opt(cond, &mut out);
                opt(step, &mut out);
                out.push(*body);
            }
            InstrKind::Return { expr } => opt(expr, &mut out),
        }
        out
    }
}

// ── Node ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Instr {
    pub id: InstrId,
    pub parent: Option<InstrId>,
    pub scope: Option<ScopeId>,
    pub span: Span,
    /// Result type of expressions, declared type of variables.
    pub ty: Option<VarType>,
    pub kind: InstrKind,
    valid: OnceCell<bool>,
}

// ── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Ir {
    nodes: Vec<Instr>,
    ids: IdAllocator,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: InstrKind, ty: Option<VarType>, span: Span, scope: Option<ScopeId>) -> InstrId {
        let id = self.ids.alloc_instr();
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Instr {
            id,
            parent: None,
            scope,
            span,
            ty,
            kind,
            valid: OnceCell::new(),
        });
        id
    }

    pub fn get(&self, id: InstrId) -> &Instr {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: InstrId) -> &InstrKind {
        &self.nodes[id.index()].kind
    }

    pub fn ty(&self, id: InstrId) -> Option<&VarType> {
        self.nodes[id.index()].ty.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instr> {
        self.nodes.iter()
    }

    /// Signature bound by a `Compile` node.
    pub fn compiled_function(&self, id: InstrId) -> Option<&Arc<FunctionSig>> {
        match self.kind(id) {
            InstrKind::Compile { sig, .. } => Some(sig),
            _ => None,
        }
    }

    /// Two-stage validity: the node's own invariant, then every child.
    /// Cached per node after the first query.
    pub fn is_valid(&self, id: InstrId) -> bool {
        let node = self.get(id);
        *node.valid.get_or_init(|| {
            self.is_locally_valid(node) && node.kind.children().into_iter().all(|c| self.is_valid(c))
        })
    }

    fn is_locally_valid(&self, node: &Instr) -> bool {
        match &node.kind {
            InstrKind::Technique { passes, .. } => !passes.is_empty(),
            InstrKind::Pass {
                vertex,
                pixel,
                particle,
                ..
            } => match (vertex, pixel) {
                (Some(_), Some(_)) => true,
                (None, None) => particle.as_ref().is_some_and(|p| p.default_shader),
                _ => false,
            },
            InstrKind::Function { sig, body, .. } => {
                sig.return_type.is_void() || body.is_some() || sig.is_builtin()
            }
            InstrKind::PartFx {
                spawn,
                init,
                update,
                ..
            } => spawn.is_some() && init.is_some() && update.is_some(),
            _ => true,
        }
    }

    // ── Dump ──

    /// Indented textual tree rooted at `root`, one node per line.
    pub fn dump(&self, root: InstrId) -> String {
        let mut out = String::new();
        self.dump_into(root, 0, &mut out);
        out
    }

    fn dump_into(&self, id: InstrId, depth: usize, out: &mut String) {
        let node = self.get(id);
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(node.kind.name());
        let detail = self.detail(node);
        if !detail.is_empty() {
            out.push(' ');
            out.push_str(&detail);
        }
        if let Some(ty) = &node.ty {
            let _ = write!(out, " : {}", ty);
        }
        out.push('\n');
        for child in node.kind.children() {
            self.dump_into(child, depth + 1, out);
        }
    }

    fn detail(&self, node: &Instr) -> String {
        match &node.kind {
            InstrKind::Variable {
                name, usage, semantic, ..
            } => {
                let usage = match usage {
                    VarUsage::Global => "global",
                    VarUsage::Local => "local",
                    VarUsage::Argument => "argument",
                };
                match semantic {
                    Some(s) => format!("{} ({}) : {}", name, usage, s),
                    None => format!("{} ({})", name, usage),
                }
            }
            InstrKind::TypeDecl { name, .. } => name.clone(),
            InstrKind::Typedef { alias, .. } => alias.clone(),
            InstrKind::Cbuffer { name, semantic, .. } => match semantic {
                Some(s) => format!("{} : {}", name, s),
                None => name.clone(),
            },
            InstrKind::Function { sig, body, .. } => {
                let mut s = format!("{} -> {}", sig.signature(), sig.return_type);
                if let Some(sem) = &sig.semantic {
                    let _ = write!(s, " : {}", sem);
                }
                if body.is_none() {
                    s.push_str(" (forward)");
                }
                s
            }
            InstrKind::Technique { name, .. } => name.clone(),
            InstrKind::Pass {
                name,
                render_states,
                particle,
                ..
            } => {
                let mut s = name.clone().unwrap_or_else(|| "<unnamed>".to_string());
                for (state, value) in render_states {
                    let _ = write!(s, " {}={}", state.name(), value.name());
                }
                if let Some(p) = particle {
                    let _ = write!(
                        s,
                        " sorting={} default_shader={} geometry={} instances={}",
                        p.sorting,
                        p.default_shader,
                        p.geometry.name(),
                        p.instance_count
                    );
                }
                s
            }
            InstrKind::PartFx { name, capacity, .. } => match capacity {
                Some(c) => format!("{} capacity={}", name, c),
                None => name.clone(),
            },
            InstrKind::Provide { module } => module.clone(),
            InstrKind::Use { mode } => mode.clone(),
            InstrKind::Literal(lit) => lit.to_string(),
            InstrKind::Id { name, .. } => name.clone(),
            InstrKind::Arithmetic { op, .. }
            | InstrKind::Bitwise { op, .. }
            | InstrKind::Relational { op, .. } => op.symbol().to_string(),
            InstrKind::Logical { op, .. } => op.symbol().to_string(),
            InstrKind::Assignment { op, .. } => op.symbol().to_string(),
            InstrKind::Unary { op, .. } => op.symbol().to_string(),
            InstrKind::PostfixIncDec { op, .. } => op.symbol().to_string(),
            InstrKind::PostfixPoint { field, .. } => field.clone(),
            InstrKind::FunctionCall { sig, .. } | InstrKind::Compile { sig, .. } => sig.signature(),
            InstrKind::SamplerState { states } => states.summary(),
            InstrKind::Jump(kind) => kind.name().to_string(),
            _ => String::new(),
        }
    }
}
