// analyze.rs — Semantic analysis of effect parse trees
//
// Walks the top-level declarations in source order, resolving names against
// the scope arena, checking types, and building the typed instruction graph.
// Expression, statement and technique handlers live in `expr`, `stmt` and
// `effect` as further `impl AnalyzeCtx` blocks. Stage classification runs as
// a second pass over the finished graph (see `classify`).
//
// Preconditions: `system` comes from `build_system_scope` and is not mutated.
// Postconditions: returns `AnalyzeResult` holding the IR root, the program
//                 scope and every diagnostic. A rejected construct yields no
//                 IR node; its siblings are still analyzed.
// Failure modes: semantic errors and warnings become `Diagnostic` entries;
//                nesting beyond `max_nesting_depth` records C0001 and skips
//                the remaining top-level declarations.
// Side effects: progress logging through the `log` facade.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::ast::*;
use crate::classify::{classify, StageTable};
use crate::diag::codes;
use crate::diag::{DiagCode, DiagLevel, Diagnostic, Diagnostics, ReportEntry};
use crate::id::InstrId;
use crate::ir::{InstrKind, Ir};
use crate::scope::{
    FunctionLookup, FunctionOrigin, FunctionSig, ParamSig, ProgramScope, ScopeKind, VarUsage,
    VariableInfo,
};
use crate::system_scope::SystemScope;
use crate::types::{array_len, BaseKind, BaseType, Field, VarType};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

// ── Public types ────────────────────────────────────────────────────────────

/// Knobs for one analysis call. Loadable from JSON; missing keys keep defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    /// Deepest statement/expression nesting analyzed before C0001.
    pub max_nesting_depth: usize,
    pub warnings_as_errors: bool,
    /// Start the global scope in strict mode, as if by `use strict;`.
    pub strict: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            warnings_as_errors: false,
            strict: false,
        }
    }
}

/// Result of semantic analysis.
#[derive(Debug)]
pub struct AnalyzeResult<'s> {
    pub file: String,
    pub ir: Ir,
    /// The `Collector` node holding every top-level declaration.
    pub root: InstrId,
    pub scope: ProgramScope<'s>,
    pub diagnostics: Diagnostics,
    pub stages: StageTable,
    /// Name set by `provide`, if any.
    pub module: Option<String>,
}

impl AnalyzeResult<'_> {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Rendered diagnostics for the analyzed file.
    pub fn report(&self) -> Vec<ReportEntry> {
        self.diagnostics.resolve(&self.file)
    }

    pub fn dump_ir(&self) -> String {
        self.ir.dump(self.root)
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Analyze one parse tree against the shared system scope.
pub fn analyze<'s>(
    file: &str,
    program: &Program,
    system: &'s SystemScope,
    options: &AnalyzeOptions,
) -> AnalyzeResult<'s> {
    info!("analyzing {} ({} declarations)", file, program.decls.len());
    let mut ctx = AnalyzeCtx::new(system, options);
    let mut decls = Vec::new();
    for decl in &program.decls {
        decls.extend(ctx.decl(decl));
        if ctx.aborted {
            break;
        }
    }
    let root = ctx.push_instr(InstrKind::Collector { decls }, None, program.span);
    ctx.build_result(file, root)
}

// ── Internal context ────────────────────────────────────────────────────────

/// The function whose body is being analyzed.
pub(crate) struct FunctionCtx {
    pub(crate) sig: Arc<FunctionSig>,
    pub(crate) return_seen: bool,
}

/// Why an initializer was dropped.
enum InitError {
    /// Shape or type does not fit the variable; reported as E0114.
    Mismatch,
    /// A sub-expression was rejected and already reported.
    Dropped,
}

pub(crate) struct AnalyzeCtx<'a, 's> {
    pub(crate) sys: &'s SystemScope,
    pub(crate) opts: &'a AnalyzeOptions,
    pub(crate) scope: ProgramScope<'s>,
    pub(crate) ir: Ir,
    pub(crate) diag: Diagnostics,
    pub(crate) func: Option<FunctionCtx>,
    pub(crate) module: Option<String>,
    depth: usize,
    pub(crate) aborted: bool,
}

impl<'a, 's> AnalyzeCtx<'a, 's> {
    fn new(sys: &'s SystemScope, opts: &'a AnalyzeOptions) -> Self {
        let mut scope = ProgramScope::new(sys);
        if opts.strict {
            scope.set_strict();
        }
        AnalyzeCtx {
            sys,
            opts,
            scope,
            ir: Ir::new(),
            diag: Diagnostics::new().with_warnings_as_errors(opts.warnings_as_errors),
            func: None,
            module: None,
            depth: 0,
            aborted: false,
        }
    }

    pub(crate) fn error(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        self.diag.error(code, span, info);
    }

    pub(crate) fn error_with_hint(
        &mut self,
        code: DiagCode,
        span: Span,
        info: Vec<(&'static str, String)>,
        hint: impl Into<String>,
    ) {
        let mut d = Diagnostic::new(DiagLevel::Error, code, Some(span)).with_hint(hint);
        d.info = info;
        self.diag.push(d);
    }

    pub(crate) fn warning(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        self.diag.warning(code, span, info);
    }

    /// A render/sampler state that was dropped. Error level under strict mode.
    pub(crate) fn dropped_state(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        let strict = self.scope.is_strict();
        warn!(
            "{} state dropped at {}{}",
            code,
            span,
            if strict { " (strict)" } else { "" }
        );
        let level = if strict {
            DiagLevel::Error
        } else {
            DiagLevel::Warning
        };
        let mut d = Diagnostic::new(level, code, Some(span));
        d.info = info;
        self.diag.push(d);
    }

    pub(crate) fn push_instr(&mut self, kind: InstrKind, ty: Option<VarType>, span: Span) -> InstrId {
        self.ir.push(kind, ty, span, self.scope.current())
    }

    /// Type of an already-built node; void for nodes that carry none.
    pub(crate) fn ty_of(&self, id: InstrId) -> VarType {
        self.ir.ty(id).cloned().unwrap_or_else(|| self.sys.void())
    }

    /// Enter one nesting level. False once the depth limit has been hit.
    pub(crate) fn enter(&mut self, span: Span) -> bool {
        if self.aborted {
            return false;
        }
        if self.depth >= self.opts.max_nesting_depth {
            self.aborted = true;
            self.diag.critical(
                codes::C0001,
                span,
                vec![("limit", self.opts.max_nesting_depth.to_string())],
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn build_result(mut self, file: &str, root: InstrId) -> AnalyzeResult<'s> {
        let stages = if self.aborted {
            StageTable::default()
        } else {
            let classified = classify(&self.ir, root);
            for d in classified.diagnostics {
                self.diag.push(d);
            }
            classified.stages
        };
        debug!(
            "{}: {} instructions, {} scopes, {} diagnostics",
            file,
            self.ir.len(),
            self.scope.len(),
            self.diag.len()
        );
        AnalyzeResult {
            file: file.to_string(),
            ir: self.ir,
            root,
            scope: self.scope,
            diagnostics: self.diag,
            stages,
            module: self.module,
        }
    }

    // ── Top-level dispatch ──────────────────────────────────────────────

    fn decl(&mut self, decl: &Decl) -> Vec<InstrId> {
        match decl {
            Decl::PartFx(d) => {
                debug!("decl partfx {}", d.name.name);
                self.partfx(d).into_iter().collect()
            }
            Decl::Technique(d) => {
                debug!("decl technique {}", d.name.name);
                self.technique(d).into_iter().collect()
            }
            Decl::Use(d) => {
                debug!("decl use {}", d.mode.name);
                vec![self.use_pragma(d)]
            }
            Decl::Import(d) => {
                debug!("decl import {}", d.component.name);
                self.error(
                    codes::E0110,
                    d.span,
                    vec![("name", d.component.name.clone())],
                );
                Vec::new()
            }
            Decl::Provide(d) => {
                debug!("decl provide {}", d.module.name);
                vec![self.provide(d)]
            }
            Decl::Type(d) => {
                debug!("decl type {}", d.def.name.name);
                self.struct_def(&d.def).map(|(_, id)| id).into_iter().collect()
            }
            Decl::Variable(d) => {
                debug!("decl variable x{}", d.vars.len());
                self.variable_decl(d)
            }
            Decl::Function(d) => {
                debug!("decl function {}", d.def.name.name);
                self.function_decl(d).into_iter().collect()
            }
            Decl::Typedef(d) => {
                debug!("decl typedef {}", d.alias.name);
                self.typedef(d).into_iter().collect()
            }
            Decl::SamplerState(d) => {
                debug!("decl sampler state {}", d.name.name);
                self.sampler_state_decl(d).into_iter().collect()
            }
            Decl::Cbuffer(d) => {
                debug!("decl cbuffer {}", d.name.name);
                self.cbuffer(d).into_iter().collect()
            }
            Decl::Empty { span } => {
                self.warning(codes::W0103, *span, Vec::new());
                Vec::new()
            }
        }
    }

    // ── Pragmas ─────────────────────────────────────────────────────────

    fn use_pragma(&mut self, d: &UseDecl) -> InstrId {
        if d.mode.name.eq_ignore_ascii_case("strict") {
            self.scope.set_strict();
        }
        self.push_instr(
            InstrKind::Use {
                mode: d.mode.name.clone(),
            },
            None,
            d.span,
        )
    }

    fn provide(&mut self, d: &ProvideDecl) -> InstrId {
        let name = &d.module.name;
        if let Some(old) = &self.module {
            if old != name {
                let info = vec![("old", old.clone()), ("new", name.clone())];
                self.warning(codes::W0101, d.span, info);
            }
        }
        self.module = Some(name.clone());
        self.push_instr(InstrKind::Provide { module: name.clone() }, None, d.span)
    }

    // ── Types ───────────────────────────────────────────────────────────

    /// Resolve a written type. Inline struct definitions are declared in the
    /// current scope and their `TypeDecl` nodes appended to `decls`.
    pub(crate) fn resolve_type(&mut self, ut: &UsageType, decls: &mut Vec<InstrId>) -> Option<VarType> {
        let base = match &ut.ty {
            TypeRef::Named(id) => match self.scope.find_type(&id.name) {
                Some(base) => base,
                None => {
                    self.error(codes::E0112, id.span, vec![("name", id.name.clone())]);
                    return None;
                }
            },
            TypeRef::Struct(def) => {
                let (base, id) = self.struct_def(def)?;
                decls.push(id);
                base
            }
            TypeRef::Vector { span } | TypeRef::Matrix { span } => {
                self.error(codes::E0113, *span, Vec::new());
                return None;
            }
        };
        Some(VarType::new(base).with_usages(&ut.usages))
    }

    /// `typedef T Alias;` registers `Alias` for the base type of `T` in the
    /// current scope. An inline struct definition becomes the node's child.
    pub(crate) fn typedef(&mut self, d: &TypedefDecl) -> Option<InstrId> {
        let name = &d.alias.name;
        if !d.ty.usages.is_empty() {
            self.error(codes::E0118, d.alias.span, vec![("name", name.clone())]);
            return None;
        }
        let mut inline = Vec::new();
        let target = self.resolve_type(&d.ty, &mut inline)?;
        if self.sys.has_type(name) {
            self.error(codes::E0106, d.alias.span, vec![("name", name.clone())]);
            return None;
        }
        let same_as_local = self
            .scope
            .current()
            .and_then(|c| self.scope.scope(c).type_decl(name))
            .map(|existing| Arc::ptr_eq(existing, &target.base));
        match same_as_local {
            // `typedef struct S { ... } S;`
            Some(true) => {}
            Some(false) => {
                self.error(codes::E0105, d.alias.span, vec![("name", name.clone())]);
                return None;
            }
            None => {
                self.scope.add_type_as(name, target.base.clone());
            }
        }
        Some(self.push_instr(
            InstrKind::Typedef {
                alias: name.clone(),
                decl: inline.pop(),
            },
            Some(target.plain()),
            d.span,
        ))
    }

    pub(crate) fn struct_def(&mut self, def: &StructDef) -> Option<(Arc<BaseType>, InstrId)> {
        let name = &def.name.name;
        if self.sys.has_type(name) {
            self.error(codes::E0106, def.name.span, vec![("name", name.clone())]);
            return None;
        }
        let local = self.scope.current().map(|c| self.scope.scope(c));
        if local.is_some_and(|s| s.type_decl(name).is_some()) {
            self.error(codes::E0105, def.name.span, vec![("name", name.clone())]);
            return None;
        }

        self.scope.push(ScopeKind::Struct);
        let mut fields = Vec::new();
        let mut field_ids = Vec::new();
        for decl in &def.fields {
            for id in self.variable_decl(decl) {
                if let InstrKind::Variable { name, semantic, .. } = self.ir.kind(id) {
                    fields.push(Field {
                        name: name.clone(),
                        ty: self.ty_of(id),
                        semantic: semantic.clone(),
                    });
                }
                field_ids.push(id);
            }
        }
        self.scope.pop();

        let base = Arc::new(BaseType::structure(name, fields));
        self.scope.add_type(base.clone());
        let id = self.push_instr(
            InstrKind::TypeDecl {
                name: name.clone(),
                fields: field_ids,
            },
            Some(VarType::new(base.clone())),
            def.span,
        );
        Some((base, id))
    }

    // ── Variables ───────────────────────────────────────────────────────

    /// One comma-list declaration: N sibling `Variable` nodes sharing a type.
    pub(crate) fn variable_decl(&mut self, decl: &VariableDecl) -> Vec<InstrId> {
        let mut out = Vec::new();
        let Some(base) = self.resolve_type(&decl.ty, &mut out) else {
            return out;
        };
        let usage = if self.func.is_some() {
            VarUsage::Local
        } else {
            VarUsage::Global
        };
        for var in &decl.vars {
            if let Some(id) = self.variable(&base, var, usage) {
                out.push(id);
            }
        }
        out
    }

    fn variable(&mut self, base: &VarType, var: &Variable, usage: VarUsage) -> Option<InstrId> {
        let name = &var.name.name;
        let mut dims = Vec::with_capacity(var.dims.len());
        for d in &var.dims {
            match array_len(d) {
                Ok(len) => dims.push(len),
                Err(e) => {
                    let info = vec![("name", name.clone()), ("reason", e.to_string())];
                    self.error(codes::E0115, d.span(), info);
                    return None;
                }
            }
        }
        let ty = base.clone().with_dims(dims);

        if self.sys.has_variable(name) {
            self.error(codes::E0102, var.name.span, vec![("name", name.clone())]);
            return None;
        }
        let local = self.scope.current().map(|c| self.scope.scope(c));
        if local.is_some_and(|s| s.variable(name).is_some()) {
            let code = match self.scope.current_kind() {
                Some(ScopeKind::Struct) => codes::E0103,
                Some(ScopeKind::Annotation) => codes::E0104,
                _ => codes::E0101,
            };
            self.error(code, var.name.span, vec![("name", name.clone())]);
            return None;
        }

        let annotation = var.annotation.as_ref().map(|a| self.annotation(a));
        let init = match &var.init {
            Some(init) => match self.initializer(init, &ty) {
                Ok(id) => Some(id),
                Err(InitError::Mismatch) => {
                    self.error(codes::E0114, init.span(), vec![("name", name.clone())]);
                    None
                }
                Err(InitError::Dropped) => None,
            },
            None => None,
        };

        let id = self.push_instr(
            InstrKind::Variable {
                name: name.clone(),
                usage,
                semantic: var.semantic.clone(),
                init,
                annotation,
            },
            Some(ty.clone()),
            var.span,
        );
        self.scope.add_variable(VariableInfo {
            name: name.clone(),
            ty,
            semantic: var.semantic.clone(),
            usage,
            instr: Some(id),
            span: var.span,
        });
        Some(id)
    }

    /// `SamplerState name { ... };` declares a global `sampler` initialized
    /// from the state block.
    fn sampler_state_decl(&mut self, d: &SamplerStateDecl) -> Option<InstrId> {
        let base = self.sys.find_type("sampler")?;
        let var = Variable {
            name: d.name.clone(),
            dims: Vec::new(),
            semantic: None,
            annotation: None,
            init: Some(Initializer::Expr {
                expr: Expr::SamplerState {
                    states: d.states.clone(),
                    span: d.span,
                },
            }),
            span: d.span,
        };
        self.variable(&VarType::new(base), &var, VarUsage::Global)
    }

    /// Members of a constant buffer are global uniforms; the buffer itself
    /// is registered as a struct type of the same name.
    fn cbuffer(&mut self, d: &CbufferDecl) -> Option<InstrId> {
        let name = &d.name.name;
        if self.sys.has_type(name) {
            self.error(codes::E0106, d.name.span, vec![("name", name.clone())]);
            return None;
        }
        let local = self.scope.current().map(|c| self.scope.scope(c));
        if local.is_some_and(|s| s.type_decl(name).is_some()) {
            self.error(codes::E0105, d.name.span, vec![("name", name.clone())]);
            return None;
        }
        if let Some(semantic) = &d.semantic {
            if register_class(semantic).is_some_and(|class| class != 'b') {
                let info = vec![("name", name.clone()), ("register", semantic.clone())];
                self.warning(codes::W0102, d.span, info);
            }
        }

        let annotation = d.annotation.as_ref().map(|a| self.annotation(a));
        let mut fields = Vec::new();
        let mut field_ids = Vec::new();
        for decl in &d.fields {
            let mut decl = decl.clone();
            if !decl.ty.usages.contains(&Usage::Uniform) {
                decl.ty.usages.push(Usage::Uniform);
            }
            for id in self.variable_decl(&decl) {
                if let InstrKind::Variable { name, semantic, .. } = self.ir.kind(id) {
                    fields.push(Field {
                        name: name.clone(),
                        ty: self.ty_of(id),
                        semantic: semantic.clone(),
                    });
                }
                field_ids.push(id);
            }
        }

        let base = Arc::new(BaseType::structure(name, fields));
        self.scope.add_type(base.clone());
        Some(self.push_instr(
            InstrKind::Cbuffer {
                name: name.clone(),
                semantic: d.semantic.clone(),
                fields: field_ids,
                annotation,
            },
            Some(VarType::new(base)),
            d.span,
        ))
    }

    fn initializer(&mut self, init: &Initializer, target: &VarType) -> Result<InstrId, InitError> {
        match init {
            Initializer::Expr { expr } => {
                let id = self.expr(expr).ok_or(InitError::Dropped)?;
                let ty = self.ty_of(id);
                // sampler_state blocks initialize any sampler flavor
                let fits = ty.is_equal(target) || (ty.is_sampler() && target.is_sampler());
                if ty.readable() && fits {
                    Ok(id)
                } else {
                    Err(InitError::Mismatch)
                }
            }
            Initializer::List { items, span } => {
                let (element, expected) = self.list_element(target).ok_or(InitError::Mismatch)?;
                if expected.is_some_and(|n| n as usize != items.len()) {
                    return Err(InitError::Mismatch);
                }
                let mut ids = Vec::with_capacity(items.len());
                let mut failure = None;
                for item in items {
                    match self.initializer(item, &element) {
                        Ok(id) => ids.push(id),
                        Err(e) => {
                            failure.get_or_insert(e);
                        }
                    }
                }
                if let Some(e) = failure {
                    return Err(e);
                }
                let ty = target.plain().with_dims(target.dims.clone()).read_only();
                Ok(self.push_instr(InstrKind::InitList { items: ids }, Some(ty), *span))
            }
        }
    }

    /// Element type and expected item count for a `{...}` initializer.
    /// The count is `None` for arrays of pending length.
    fn list_element(&self, target: &VarType) -> Option<(VarType, Option<u32>)> {
        if target.is_array() {
            return Some((target.element()?, target.length()));
        }
        match &target.base.kind {
            BaseKind::Vector { element, length, .. } => {
                Some((VarType::new(element.clone()), Some(*length as u32)))
            }
            BaseKind::Matrix { row, columns } => Some((VarType::new(row.clone()), Some(*columns as u32))),
            _ => None,
        }
    }

    pub(crate) fn annotation(&mut self, ann: &Annotation) -> InstrId {
        self.scope.push(ScopeKind::Annotation);
        let mut decls = Vec::new();
        for d in &ann.decls {
            decls.extend(self.variable_decl(d));
        }
        self.scope.pop();
        self.push_instr(InstrKind::Annotation { decls }, None, ann.span)
    }

    // ── Functions ───────────────────────────────────────────────────────

    fn function_decl(&mut self, decl: &FunctionDecl) -> Option<InstrId> {
        let def = &decl.def;
        let mut types = Vec::new();
        let ret = self.resolve_type(&def.return_type, &mut types)?;
        if ret.contains_sampler() {
            let info = vec![("name", def.name.name.clone()), ("type", ret.to_string())];
            self.error(codes::E0221, def.name.span, info);
            return None;
        }
        let annotation = decl.annotation.as_ref().map(|a| self.annotation(a));

        self.scope.push(ScopeKind::Default);
        let id = self.function_in_scope(decl, ret, types, annotation);
        self.scope.pop();
        id
    }

    /// Parameters, prior-declaration checks and body, inside the parameter
    /// scope. `types` holds the inline struct declarations seen so far.
    fn function_in_scope(
        &mut self,
        decl: &FunctionDecl,
        ret: VarType,
        mut types: Vec<InstrId>,
        annotation: Option<InstrId>,
    ) -> Option<InstrId> {
        let def = &decl.def;
        let name = &def.name.name;

        let mut params = Vec::with_capacity(def.params.len());
        let mut param_ids = Vec::with_capacity(def.params.len());
        let mut ok = true;
        let mut seen_default = false;
        for p in &def.params {
            let Some(ty) = self.resolve_type(&p.ty, &mut types) else {
                ok = false;
                continue;
            };
            let has_default = p.var.init.is_some();
            if seen_default && !has_default {
                let info = vec![("name", p.var.name.name.clone()), ("func", name.clone())];
                self.error(codes::E0117, p.var.name.span, info);
                ok = false;
            }
            seen_default |= has_default;
            match self.variable(&ty, &p.var, VarUsage::Argument) {
                Some(id) => {
                    params.push(ParamSig {
                        name: p.var.name.name.clone(),
                        ty: self.ty_of(id),
                        semantic: p.var.semantic.clone(),
                        has_default,
                    });
                    param_ids.push(id);
                }
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }

        let implemented = decl.body.is_some();
        let sig = FunctionSig::new(
            name,
            ret.clone(),
            params,
            def.semantic.clone(),
            FunctionOrigin::User {
                implemented,
                instr: None,
            },
            def.span,
        );
        let signature = sig.signature();
        if self
            .sys
            .scope()
            .functions(name)
            .iter()
            .any(|f| f.signature() == signature)
        {
            self.error(codes::E0116, def.name.span, vec![("name", name.clone())]);
            return None;
        }

        let arg_types: Vec<VarType> = sig.params.iter().map(|p| p.ty.clone()).collect();
        let global = Some(self.scope.global());
        let prior = match self.scope.find_function_from(global, name, &arg_types) {
            FunctionLookup::Ambiguous => {
                self.error(codes::E0216, def.name.span, vec![("name", name.clone())]);
                return None;
            }
            FunctionLookup::Found(f) if f.signature() == signature => Some(f),
            FunctionLookup::Found(_) | FunctionLookup::NotFound => None,
        };
        if let Some(prev) = &prior {
            if prev.has_implementation() {
                self.error(codes::E0107, def.name.span, vec![("name", name.clone())]);
                return None;
            }
            if !prev.return_type.is_equal(&ret) {
                let info = vec![
                    ("name", name.clone()),
                    ("expected", prev.return_type.to_string()),
                    ("found", ret.to_string()),
                ];
                self.error(codes::E0108, def.name.span, info);
                return None;
            }
        }

        let sig = Arc::new(sig);
        let body = match &decl.body {
            Some(block) => {
                self.func = Some(FunctionCtx {
                    sig: sig.clone(),
                    return_seen: false,
                });
                let body = self.function_body(block);
                let seen = self.func.take().is_some_and(|f| f.return_seen);
                if !ret.is_void() && !seen && !self.aborted {
                    self.error(codes::E0304, def.name.span, vec![("name", name.clone())]);
                }
                Some(body?)
            }
            None => None,
        };

        let id = self.push_instr(
            InstrKind::Function {
                sig: sig.clone(),
                types,
                params: param_ids,
                body,
                annotation,
            },
            None,
            decl.span,
        );
        let mut registered = (*sig).clone();
        registered.origin = FunctionOrigin::User {
            implemented,
            instr: Some(id),
        };
        match prior {
            Some(_) if implemented => {
                self.scope.replace_function(registered, None);
            }
            Some(_) => {}
            None => {
                self.scope.add_function(registered, None);
            }
        }
        Some(id)
    }

    /// The outermost block of a function. A statement after a top-level
    /// `return` is reported once as unreachable.
    fn function_body(&mut self, block: &Block) -> Option<InstrId> {
        if !self.enter(block.span) {
            return None;
        }
        self.scope.push(ScopeKind::Default);
        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut returned = false;
        let mut reported = false;
        for stmt in &block.stmts {
            if returned && !reported {
                self.error(codes::E0305, stmt.span(), Vec::new());
                reported = true;
            }
            if matches!(stmt, Stmt::Return { .. }) {
                returned = true;
            }
            if let Some(id) = self.stmt(stmt) {
                stmts.push(id);
            }
        }
        let id = self.push_instr(InstrKind::Block { stmts }, None, block.span);
        self.scope.pop();
        self.leave();
        Some(id)
    }
}

/// Register class of a `register(xN)` semantic: one of `u t b s`.
fn register_class(semantic: &str) -> Option<char> {
    let inner = semantic.strip_prefix("register(")?.strip_suffix(')')?;
    let mut chars = inner.chars();
    let class = chars.next().filter(|c| matches!(c, 'u' | 't' | 'b' | 's'))?;
    let slot = chars.as_str();
    (!slot.is_empty() && slot.bytes().all(|b| b.is_ascii_digit())).then_some(class)
}
