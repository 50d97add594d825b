// scope.rs — Lexical symbol tables and the per-analysis scope arena
//
// A `Scope` holds four local namespaces (variables, types, function overload
// lists, techniques) plus a parent handle. `ProgramScope` owns every scope
// created during one analysis in an arena addressed by stable `ScopeId`s and
// keeps an explicit, savable "current" cursor. Lookups walk the current scope,
// its ancestors, and finally the shared system scope.
//
// Preconditions: the system scope is fully built before any ProgramScope uses it.
// Postconditions: inserts only touch the local map of the target scope.
// Failure modes: collisions are reported as `false` returns; callers turn
//                them into diagnostics.
// Side effects: none.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::ast::{Span, Usage};
use crate::id::{FunctionId, IdAllocator, InstrId, ScopeId};
use crate::system_scope::SystemScope;
use crate::types::{BaseType, VarType};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    System,
    Global,
    Default,
    Struct,
    Annotation,
}

/// Storage class of a declared variable. Parameters are always local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarUsage {
    Global,
    Local,
    Argument,
}

impl VarUsage {
    pub fn is_local(self) -> bool {
        matches!(self, VarUsage::Local | VarUsage::Argument)
    }
}

/// A variable visible through a scope.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub name: String,
    pub ty: VarType,
    pub semantic: Option<String>,
    pub usage: VarUsage,
    pub instr: Option<InstrId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamSig {
    pub name: String,
    pub ty: VarType,
    pub semantic: Option<String>,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub enum FunctionOrigin {
    /// Template-expanded builtin. `template` keeps the translation
    /// expression (`dot($1,$2)`) verbatim for code generation.
    Builtin {
        template: String,
        vertex: bool,
        pixel: bool,
    },
    User {
        implemented: bool,
        instr: Option<InstrId>,
    },
}

/// A function signature registered in a scope.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub id: FunctionId,
    pub name: String,
    pub return_type: VarType,
    pub params: Vec<ParamSig>,
    pub required_args: usize,
    pub semantic: Option<String>,
    pub origin: FunctionOrigin,
    pub span: Span,
}

impl FunctionSig {
    /// Build a signature, deriving its stable id and required argument count.
    pub fn new(
        name: &str,
        return_type: VarType,
        params: Vec<ParamSig>,
        semantic: Option<String>,
        origin: FunctionOrigin,
        span: Span,
    ) -> Self {
        let origin_tag = match origin {
            FunctionOrigin::Builtin { .. } => "builtin",
            FunctionOrigin::User { .. } => "user",
        };
        let hashes: Vec<String> = params.iter().map(|p| p.ty.hash()).collect();
        let id = FunctionId::compute(origin_tag, name, &hashes, &return_type.hash());
        let required_args = params.iter().filter(|p| !p.has_default).count();
        FunctionSig {
            id,
            name: name.to_string(),
            return_type,
            params,
            required_args,
            semantic,
            origin,
            span,
        }
    }

    /// `name(float,int,)`: identity of the overload within a scope.
    pub fn signature(&self) -> String {
        let mut s = format!("{}(", self.name);
        for p in &self.params {
            s.push_str(&p.ty.hash());
            s.push(',');
        }
        s.push(')');
        s
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.origin, FunctionOrigin::Builtin { .. })
    }

    pub fn has_implementation(&self) -> bool {
        matches!(self.origin, FunctionOrigin::User { implemented: true, .. })
    }

    pub fn instr(&self) -> Option<InstrId> {
        match self.origin {
            FunctionOrigin::User { instr, .. } => instr,
            FunctionOrigin::Builtin { .. } => None,
        }
    }

    pub fn vertex_usable(&self) -> bool {
        match self.origin {
            FunctionOrigin::Builtin { vertex, .. } => vertex,
            FunctionOrigin::User { .. } => true,
        }
    }

    pub fn pixel_usable(&self) -> bool {
        match self.origin {
            FunctionOrigin::Builtin { pixel, .. } => pixel,
            FunctionOrigin::User { .. } => true,
        }
    }

    /// Exact overload match: argument count within `[required, total]` and
    /// every argument hash equal to its parameter hash.
    pub fn accepts(&self, args: &[VarType]) -> bool {
        if args.len() < self.required_args || args.len() > self.params.len() {
            return false;
        }
        args.iter()
            .zip(&self.params)
            .all(|(a, p)| a.hash() == p.ty.hash())
    }

    /// Match rule for `compile f(args)`: `args` bind, in order, to the
    /// uniform parameters; non-uniform (varying) parameters are skipped.
    pub fn accepts_shader_args(&self, args: &[VarType]) -> bool {
        if args.is_empty() {
            return true;
        }
        let mut next = 0;
        for p in &self.params {
            if !p.ty.has_usage(Usage::Uniform) {
                continue;
            }
            match args.get(next) {
                Some(a) if a.hash() == p.ty.hash() => next += 1,
                _ => return false,
            }
        }
        next == args.len()
    }
}

#[derive(Debug, Clone)]
pub struct TechniqueInfo {
    pub name: String,
    pub instr: InstrId,
    pub partfx: bool,
}

/// Outcome of overload resolution.
#[derive(Debug, Clone)]
pub enum FunctionLookup {
    NotFound,
    Found(Arc<FunctionSig>),
    Ambiguous,
}

impl FunctionLookup {
    pub fn found(&self) -> Option<&Arc<FunctionSig>> {
        match self {
            FunctionLookup::Found(f) => Some(f),
            FunctionLookup::NotFound | FunctionLookup::Ambiguous => None,
        }
    }

    fn from_matches(mut matches: Vec<Arc<FunctionSig>>) -> Self {
        match matches.len() {
            0 => FunctionLookup::NotFound,
            1 => FunctionLookup::Found(matches.remove(0)),
            _ => FunctionLookup::Ambiguous,
        }
    }
}

// ── Scope ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub strict: bool,
    variables: HashMap<String, Arc<VariableInfo>>,
    types: HashMap<String, Arc<BaseType>>,
    functions: HashMap<String, Vec<Arc<FunctionSig>>>,
    techniques: HashMap<String, TechniqueInfo>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope {
            parent,
            kind,
            strict: false,
            variables: HashMap::new(),
            types: HashMap::new(),
            functions: HashMap::new(),
            techniques: HashMap::new(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Arc<VariableInfo>> {
        self.variables.get(name)
    }

    pub fn type_decl(&self, name: &str) -> Option<&Arc<BaseType>> {
        self.types.get(name)
    }

    pub fn functions(&self, name: &str) -> &[Arc<FunctionSig>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn technique(&self, name: &str) -> Option<&TechniqueInfo> {
        self.techniques.get(name)
    }

    pub fn add_variable(&mut self, info: VariableInfo) -> bool {
        if self.variables.contains_key(&info.name) {
            return false;
        }
        self.variables.insert(info.name.clone(), Arc::new(info));
        true
    }

    pub fn add_type(&mut self, ty: Arc<BaseType>) -> bool {
        let name = ty.name.clone();
        self.add_type_as(&name, ty)
    }

    /// Register `ty` under `name`; a typedef names an existing base type.
    pub fn add_type_as(&mut self, name: &str, ty: Arc<BaseType>) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        self.types.insert(name.to_string(), ty);
        true
    }

    /// Register an overload; rejects an identical signature in this scope.
    pub fn add_function(&mut self, sig: FunctionSig) -> bool {
        let signature = sig.signature();
        let list = self.functions.entry(sig.name.clone()).or_default();
        if list.iter().any(|f| f.signature() == signature) {
            return false;
        }
        list.push(Arc::new(sig));
        true
    }

    /// Swap the same-signature overload (a forward declaration) for `sig`.
    pub fn replace_function(&mut self, sig: FunctionSig) -> bool {
        let signature = sig.signature();
        match self.functions.get_mut(&sig.name) {
            Some(list) => match list.iter().position(|f| f.signature() == signature) {
                Some(i) => {
                    list[i] = Arc::new(sig);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn add_technique(&mut self, info: TechniqueInfo) -> bool {
        if self.techniques.contains_key(&info.name) {
            return false;
        }
        self.techniques.insert(info.name.clone(), info);
        true
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    /// Sorted local names per namespace, for deterministic dumps.
    pub fn variable_names(&self) -> Vec<&str> {
        sorted_keys(self.variables.keys())
    }

    pub fn type_names(&self) -> Vec<&str> {
        sorted_keys(self.types.keys())
    }

    pub fn technique_names(&self) -> Vec<&str> {
        sorted_keys(self.techniques.keys())
    }

    /// All overloads, sorted by signature.
    pub fn all_functions(&self) -> Vec<&Arc<FunctionSig>> {
        let mut all: Vec<&Arc<FunctionSig>> = self.functions.values().flatten().collect();
        all.sort_by_key(|f| f.signature());
        all
    }
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut v: Vec<&str> = keys.map(String::as_str).collect();
    v.sort_unstable();
    v
}

// ── ProgramScope ────────────────────────────────────────────────────────────

/// Arena of scopes for one analysis, chained onto the shared system scope.
#[derive(Debug)]
pub struct ProgramScope<'s> {
    system: &'s SystemScope,
    scopes: Vec<Scope>,
    current: Option<ScopeId>,
    ids: IdAllocator,
}

impl<'s> ProgramScope<'s> {
    /// Create the arena with its global scope as the current scope.
    pub fn new(system: &'s SystemScope) -> Self {
        let mut program = ProgramScope {
            system,
            scopes: Vec::new(),
            current: None,
            ids: IdAllocator::new(),
        };
        program.push(ScopeKind::Global);
        program
    }

    pub fn system(&self) -> &'s SystemScope {
        self.system
    }

    /// Handle of the global scope (always the first arena slot).
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    /// Resume at a previously saved cursor.
    pub fn set_current(&mut self, handle: Option<ScopeId>) {
        self.current = handle;
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Open a child of the current scope and make it current.
    pub fn push(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.ids.alloc_scope();
        debug_assert_eq!(id.index(), self.scopes.len());
        self.scopes.push(Scope::new(kind, self.current));
        self.current = Some(id);
        debug!("scope push {:?} -> {}", kind, id.0);
        id
    }

    /// Move the cursor to the parent (`None` when leaving the root).
    pub fn pop(&mut self) {
        if let Some(cur) = self.current {
            self.current = self.scopes[cur.index()].parent;
            debug!("scope pop {} -> {:?}", cur.0, self.current.map(|s| s.0));
        }
    }

    /// Move the cursor to the most recently created scope.
    pub fn restore(&mut self) {
        self.current = self.ids_last();
    }

    fn ids_last(&self) -> Option<ScopeId> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(ScopeId((self.scopes.len() - 1) as u32))
        }
    }

    pub fn current_kind(&self) -> Option<ScopeKind> {
        self.current.map(|c| self.scopes[c.index()].kind)
    }

    fn chain(&self, start: Option<ScopeId>) -> impl Iterator<Item = &Scope> + '_ {
        let mut next = start;
        std::iter::from_fn(move || {
            let id = next?;
            let scope = &self.scopes[id.index()];
            next = scope.parent;
            Some(scope)
        })
        .chain(std::iter::once(self.system.scope()))
    }

    // ── Lookup ──

    pub fn find_variable(&self, name: &str) -> Option<Arc<VariableInfo>> {
        self.find_variable_from(self.current, name)
    }

    pub fn find_variable_from(&self, start: Option<ScopeId>, name: &str) -> Option<Arc<VariableInfo>> {
        self.chain(start).find_map(|s| s.variable(name)).cloned()
    }

    pub fn find_type(&self, name: &str) -> Option<Arc<BaseType>> {
        self.find_type_from(self.current, name)
    }

    pub fn find_type_from(&self, start: Option<ScopeId>, name: &str) -> Option<Arc<BaseType>> {
        self.chain(start).find_map(|s| s.type_decl(name)).cloned()
    }

    pub fn find_technique(&self, name: &str) -> Option<TechniqueInfo> {
        self.chain(self.current).find_map(|s| s.technique(name)).cloned()
    }

    /// Overload resolution from the current scope outward.
    pub fn find_function(&self, name: &str, args: &[VarType]) -> FunctionLookup {
        self.find_function_from(self.current, name, args)
    }

    pub fn find_function_from(&self, start: Option<ScopeId>, name: &str, args: &[VarType]) -> FunctionLookup {
        let matches: Vec<Arc<FunctionSig>> = self
            .chain(start)
            .flat_map(|s| s.functions(name).iter())
            .filter(|f| f.accepts(args))
            .cloned()
            .collect();
        let result = FunctionLookup::from_matches(matches);
        debug!(
            "resolve {}({}) -> {}",
            name,
            args.iter().map(VarType::hash).collect::<Vec<_>>().join(","),
            match &result {
                FunctionLookup::NotFound => "not found",
                FunctionLookup::Found(_) => "found",
                FunctionLookup::Ambiguous => "ambiguous",
            }
        );
        result
    }

    /// Resolve the target of a `compile` expression in the global scope.
    pub fn find_shader_function(&self, name: &str, args: &[VarType]) -> FunctionLookup {
        let matches: Vec<Arc<FunctionSig>> = self.scopes[self.global().index()]
            .functions(name)
            .iter()
            .filter(|f| f.accepts_shader_args(args))
            .cloned()
            .collect();
        FunctionLookup::from_matches(matches)
    }

    /// Any overload with this name is visible from the current scope.
    pub fn has_function_named(&self, name: &str) -> bool {
        self.chain(self.current).any(|s| !s.functions(name).is_empty())
    }

    pub fn is_strict(&self) -> bool {
        self.is_strict_from(self.current)
    }

    pub fn is_strict_from(&self, start: Option<ScopeId>) -> bool {
        self.chain(start).any(|s| s.strict)
    }

    // ── Insertion ──

    fn current_mut(&mut self) -> Option<&mut Scope> {
        let cur = self.current?;
        Some(&mut self.scopes[cur.index()])
    }

    pub fn set_strict(&mut self) {
        if let Some(scope) = self.current_mut() {
            scope.strict = true;
        }
    }

    pub fn add_variable(&mut self, info: VariableInfo) -> bool {
        self.current_mut().is_some_and(|s| s.add_variable(info))
    }

    pub fn add_type(&mut self, ty: Arc<BaseType>) -> bool {
        self.current_mut().is_some_and(|s| s.add_type(ty))
    }

    pub fn add_type_as(&mut self, name: &str, ty: Arc<BaseType>) -> bool {
        self.current_mut().is_some_and(|s| s.add_type_as(name, ty))
    }

    pub fn add_technique(&mut self, info: TechniqueInfo) -> bool {
        self.current_mut().is_some_and(|s| s.add_technique(info))
    }

    /// Register a function, in the global scope unless `scope` is given.
    pub fn add_function(&mut self, sig: FunctionSig, scope: Option<ScopeId>) -> bool {
        let target = scope.unwrap_or(self.global());
        self.scopes[target.index()].add_function(sig)
    }

    pub fn replace_function(&mut self, sig: FunctionSig, scope: Option<ScopeId>) -> bool {
        let target = scope.unwrap_or(self.global());
        self.scopes[target.index()].replace_function(sig)
    }

    /// Render the global scope's contents, one entry per line.
    pub fn dump_global(&self) -> String {
        let g = self.scope(self.global());
        let mut out = String::new();
        for name in g.type_names() {
            out.push_str(&format!("type {}\n", name));
        }
        for name in g.variable_names() {
            if let Some(v) = g.variable(name) {
                out.push_str(&format!("var {}: {}\n", name, v.ty));
            }
        }
        for f in g.all_functions() {
            out.push_str(&format!(
                "fn {} -> {} [{}]\n",
                f.signature(),
                f.return_type,
                f.id
            ));
        }
        for name in g.technique_names() {
            out.push_str(&format!("technique {}\n", name));
        }
        out
    }
}
