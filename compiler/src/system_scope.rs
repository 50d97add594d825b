// system_scope.rs — Builtin types and functions of the effect language
//
// Builds the read-only System scope once: scalars, vectors with generated
// swizzle fields, matrices, then the template-expanded builtin function table.
// The embedder calls `build_system_scope()` at startup and passes the result
// by reference into every analysis.
//
// Preconditions: none.
// Postconditions: every builtin signature is registered exactly once.
// Failure modes: a duplicate or ill-formed builtin declaration is a
//                programmer error (`BootstrapError`), never a user diagnostic.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::ast::Span;
use crate::scope::{FunctionOrigin, FunctionSig, ParamSig, Scope, ScopeKind};
use crate::types::{BaseKind, BaseType, SamplerKind, ScalarKind, Swizzle, VarType};

/// Placeholder for the substituted type in builtin templates.
const T: &str = "template";

const FLOATS: &[&str] = &["float", "float2", "float3", "float4"];
const FLOAT_VECS: &[&str] = &["float2", "float3", "float4"];
const BOOL_VECS: &[&str] = &["bool2", "bool3", "bool4"];

const SUFFIX_ALPHABETS: [[&str; 4]; 3] = [
    ["x", "y", "z", "w"],
    ["r", "g", "b", "a"],
    ["s", "t", "p", "q"],
];

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    DuplicateType(String),
    DuplicateFunction(String),
    UnknownType { function: String, ty: String },
    TemplateWithoutInstances(String),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::DuplicateType(name) => write!(f, "system type '{}' declared twice", name),
            BootstrapError::DuplicateFunction(sig) => {
                write!(f, "system function '{}' declared twice", sig)
            }
            BootstrapError::UnknownType { function, ty } => {
                write!(f, "system function '{}' uses unknown type '{}'", function, ty)
            }
            BootstrapError::TemplateWithoutInstances(name) => {
                write!(f, "system function '{}' uses a template type without instances", name)
            }
        }
    }
}

impl std::error::Error for BootstrapError {}

// ── Builtin function table ──────────────────────────────────────────────────

/// One row of the builtin table. With `instances`, one function is declared
/// per instance type substituted for every `T` in `ret` and `params`.
struct Builtin {
    name: &'static str,
    translation: &'static str,
    ret: &'static str,
    params: &'static [&'static str],
    instances: Option<&'static [&'static str]>,
    vertex: bool,
    pixel: bool,
}

const fn both(
    name: &'static str,
    translation: &'static str,
    ret: &'static str,
    params: &'static [&'static str],
    instances: Option<&'static [&'static str]>,
) -> Builtin {
    Builtin {
        name,
        translation,
        ret,
        params,
        instances,
        vertex: true,
        pixel: true,
    }
}

const fn pixel_only(
    name: &'static str,
    translation: &'static str,
    params: &'static [&'static str],
) -> Builtin {
    Builtin {
        name,
        translation,
        ret: "float4",
        params,
        instances: None,
        vertex: false,
        pixel: true,
    }
}

const fn vertex_only(
    name: &'static str,
    translation: &'static str,
    params: &'static [&'static str],
) -> Builtin {
    Builtin {
        name,
        translation,
        ret: "float4",
        params,
        instances: None,
        vertex: true,
        pixel: false,
    }
}

const BUILTINS: &[Builtin] = &[
    both("dot", "dot($1,$2)", "float", &[T, T], Some(FLOATS)),
    both("mul", "$1*$2", T, &[T, T], Some(&["float", "int", "float2", "float3", "float4"])),
    both("mod", "mod($1,$2)", "float", &["float", "float"], None),
    both("floor", "floor($1)", T, &[T], Some(FLOATS)),
    both("ceil", "ceil($1)", T, &[T], Some(FLOATS)),
    both("fract", "fract($1)", T, &[T], Some(FLOATS)),
    both("abs", "abs($1)", T, &[T], Some(FLOATS)),
    both("sign", "sign($1)", T, &[T], Some(FLOATS)),
    both("normalize", "normalize($1)", T, &[T], Some(FLOATS)),
    both("length", "length($1)", "float", &[T], Some(FLOATS)),
    both("cross", "cross($1, $2)", "float3", &["float3", "float3"], None),
    both("reflect", "reflect($1,$2)", T, &[T, T], Some(FLOATS)),
    both("max", "max($1,$2)", T, &[T, T], Some(FLOATS)),
    both("max", "max($1,$2)", T, &[T, "float"], Some(FLOAT_VECS)),
    both("min", "min($1,$2)", T, &[T, T], Some(FLOATS)),
    both("min", "min($1,$2)", T, &[T, "float"], Some(FLOAT_VECS)),
    both("mix", "mix($1,$2,$3)", T, &[T, T, T], Some(FLOATS)),
    both("mix", "mix($1,$2,$3)", T, &[T, T, "float"], Some(FLOAT_VECS)),
    both("clamp", "clamp($1,$2,$3)", T, &[T, T, T], Some(FLOATS)),
    both("clamp", "clamp($1,$2,$3)", T, &[T, "float", "float"], Some(FLOAT_VECS)),
    both("pow", "pow($1,$2)", T, &[T, T], Some(FLOATS)),
    both("mod", "mod($1,$2)", T, &[T, T], Some(FLOAT_VECS)),
    both("mod", "mod($1,$2)", T, &[T, "float"], Some(FLOAT_VECS)),
    both("exp", "exp($1)", T, &[T], Some(FLOATS)),
    both("exp2", "exp2($1)", T, &[T], Some(FLOATS)),
    both("log", "log($1)", T, &[T], Some(FLOATS)),
    both("log2", "log2($1)", T, &[T], Some(FLOATS)),
    both("inversesqrt", "inversesqrt($1)", T, &[T], Some(FLOATS)),
    both("sqrt", "sqrt($1)", T, &[T], Some(FLOATS)),
    both("all", "all($1)", "bool", &[T], Some(BOOL_VECS)),
    both("any", "any($1)", "bool", &[T], Some(BOOL_VECS)),
    both("not", "not($1)", T, &[T], Some(BOOL_VECS)),
    both("distance", "distance($1,$2)", "float", &[T, T], Some(FLOATS)),
    both("lessThan", "lessThan($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("lessThan", "lessThan($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("lessThan", "lessThan($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("lessThanEqual", "lessThanEqual($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("lessThanEqual", "lessThanEqual($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("lessThanEqual", "lessThanEqual($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("equal", "equal($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("equal", "equal($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("equal", "equal($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("equal", "equal($1,$2)", T, &[T, T], Some(BOOL_VECS)),
    both("notEqual", "notEqual($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("notEqual", "notEqual($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("notEqual", "notEqual($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("notEqual", "notEqual($1,$2)", T, &[T, T], Some(BOOL_VECS)),
    both("greaterThan", "greaterThan($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("greaterThan", "greaterThan($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("greaterThan", "greaterThan($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("greaterThanEqual", "greaterThanEqual($1,$2)", "bool2", &[T, T], Some(&["float2", "int2"])),
    both("greaterThanEqual", "greaterThanEqual($1,$2)", "bool3", &[T, T], Some(&["float3", "int3"])),
    both("greaterThanEqual", "greaterThanEqual($1,$2)", "bool4", &[T, T], Some(&["float4", "int4"])),
    both("radians", "radians($1)", T, &[T], Some(FLOATS)),
    both("degrees", "degrees($1)", T, &[T], Some(FLOATS)),
    both("sin", "sin($1)", T, &[T], Some(FLOATS)),
    both("cos", "cos($1)", T, &[T], Some(FLOATS)),
    both("tan", "tan($1)", T, &[T], Some(FLOATS)),
    both("asin", "asin($1)", T, &[T], Some(FLOATS)),
    both("acos", "acos($1)", T, &[T], Some(FLOATS)),
    both("atan", "atan($1)", T, &[T], Some(FLOATS)),
    both("atan", "atan($1, $2)", T, &[T, T], Some(FLOATS)),
    both("tex2D", "texture2D($1,$2)", "float4", &["sampler", "float2"], None),
    both("tex2D", "texture2D($1,$2)", "float4", &["sampler2D", "float2"], None),
    both("tex2DProj", "texture2DProj($1,$2)", "float4", &["sampler", "float3"], None),
    both("tex2DProj", "texture2DProj($1,$2)", "float4", &["sampler2D", "float3"], None),
    both("tex2DProj", "texture2DProj($1,$2)", "float4", &["sampler", "float4"], None),
    both("tex2DProj", "texture2DProj($1,$2)", "float4", &["sampler2D", "float4"], None),
    both("texCUBE", "textureCube($1,$2)", "float4", &["sampler", "float3"], None),
    both("texCUBE", "textureCube($1,$2)", "float4", &["samplerCUBE", "float3"], None),
    // bias variants
    pixel_only("tex2D", "texture2D($1,$2,$3)", &["sampler", "float2", "float"]),
    pixel_only("tex2D", "texture2D($1,$2,$3)", &["sampler2D", "float2", "float"]),
    pixel_only("tex2DProj", "texture2DProj($1,$2,$3)", &["sampler", "float3", "float"]),
    pixel_only("tex2DProj", "texture2DProj($1,$2,$3)", &["sampler2D", "float3", "float"]),
    pixel_only("tex2DProj", "texture2DProj($1,$2,$3)", &["sampler", "float4", "float"]),
    pixel_only("tex2DProj", "texture2DProj($1,$2,$3)", &["sampler2D", "float4", "float"]),
    pixel_only("texCUBE", "textureCube($1,$2,$3)", &["sampler", "float3", "float"]),
    pixel_only("texCUBE", "textureCube($1,$2,$3)", &["samplerCUBE", "float3", "float"]),
    // explicit lod
    vertex_only("tex2DLod", "texture2DLod($1,$2,$3)", &["sampler", "float2", "float"]),
    vertex_only("tex2DLod", "texture2DLod($1,$2,$3)", &["sampler2D", "float2", "float"]),
    vertex_only("tex2DProjLod", "texture2DProjLod($1,$2,$3)", &["sampler", "float3", "float"]),
    vertex_only("tex2DProjLod", "texture2DProjLod($1,$2,$3)", &["sampler2D", "float3", "float"]),
    vertex_only("tex2DProjLod", "texture2DProjLod($1,$2,$3)", &["sampler", "float4", "float"]),
    vertex_only("tex2DProjLod", "texture2DProjLod($1,$2,$3)", &["sampler2D", "float4", "float"]),
    vertex_only("texCUBELod", "textureCubeLod($1,$2,$3)", &["sampler", "float3", "float"]),
    vertex_only("texCUBELod", "textureCubeLod($1,$2,$3)", &["samplerCUBE", "float3", "float"]),
    both("dFdx", "dFdx($1)", T, &[T], Some(FLOATS)),
    both("dFdy", "dFdy($1)", T, &[T], Some(FLOATS)),
    both("width", "width($1)", T, &[T], Some(FLOATS)),
    both("fwidth", "fwidth($1)", T, &[T], Some(FLOATS)),
    both("smoothstep", "smoothstep($1, $2, $3)", T, &[T, T, T], Some(FLOATS)),
    both("smoothstep", "smoothstep($1, $2, $3)", T, &["float", "float", T], Some(FLOAT_VECS)),
    both("frac", "fract($1)", T, &[T], Some(FLOATS)),
    both("lerp", "mix($1,$2,$3)", T, &[T, T, T], Some(FLOATS)),
    both("lerp", "mix($1,$2,$3)", T, &[T, T, "float"], Some(FLOAT_VECS)),
    both("saturate", "max(0., min(1., $1))", T, &[T], Some(FLOATS)),
];

// ── System scope ────────────────────────────────────────────────────────────

/// The builtin scope plus direct handles to the types analysis asks for most.
#[derive(Debug)]
pub struct SystemScope {
    scope: Scope,
    void: Arc<BaseType>,
    int: Arc<BaseType>,
    bool: Arc<BaseType>,
    float: Arc<BaseType>,
    float4: Arc<BaseType>,
    string: Arc<BaseType>,
    vectors: HashMap<(ScalarKind, usize), Arc<BaseType>>,
}

/// Build the system scope. A bootstrap failure is a programmer error.
pub fn build_system_scope() -> SystemScope {
    match try_build_system_scope() {
        Ok(scope) => scope,
        Err(e) => panic!("system scope bootstrap failed: {}", e),
    }
}

/// Build the system scope, reporting bootstrap errors instead of panicking.
pub fn try_build_system_scope() -> Result<SystemScope, BootstrapError> {
    let mut scope = Scope::new(ScopeKind::System, None);

    // 1. scalars and opaque types
    let void = add_type(&mut scope, BaseType::system("void", BaseKind::Void))?;
    let int = add_type(&mut scope, BaseType::scalar(ScalarKind::Int))?;
    let bool = add_type(&mut scope, BaseType::scalar(ScalarKind::Bool))?;
    let float = add_type(&mut scope, BaseType::scalar(ScalarKind::Float))?;
    let string = add_type(&mut scope, BaseType::system("string", BaseKind::String))?;
    add_type(&mut scope, BaseType::system("texture", BaseKind::Texture))?;
    add_type(&mut scope, BaseType::system("sampler", BaseKind::Sampler(SamplerKind::Generic)))?;
    add_type(&mut scope, BaseType::system("sampler2D", BaseKind::Sampler(SamplerKind::Sampler2D)))?;
    add_type(&mut scope, BaseType::system("samplerCUBE", BaseKind::Sampler(SamplerKind::SamplerCube)))?;

    // 2. vectors
    let mut vectors = HashMap::new();
    for element in [&float, &int, &bool] {
        let kind = element.scalar_kind().unwrap_or(ScalarKind::Float);
        vectors.insert((kind, 1), element.clone());
        for length in 2..=4 {
            let name = format!("{}{}", element.name, length);
            let swizzles = generate_swizzles(length);
            let ty = add_type(
                &mut scope,
                BaseType::system(
                    &name,
                    BaseKind::Vector {
                        element: element.clone(),
                        length,
                        swizzles,
                    },
                ),
            )?;
            vectors.insert((kind, length), ty);
        }
    }

    // 3. matrices: {elem}{R}x{C} = R-component row vector × C columns
    for kind in [ScalarKind::Float, ScalarKind::Int, ScalarKind::Bool] {
        for rows in 2..=4 {
            for columns in 2..=4 {
                let row = match vectors.get(&(kind, rows)) {
                    Some(r) => r.clone(),
                    None => {
                        return Err(BootstrapError::UnknownType {
                            function: String::new(),
                            ty: format!("{}{}", kind.name(), rows),
                        })
                    }
                };
                let name = format!("{}{}x{}", kind.name(), rows, columns);
                add_type(&mut scope, BaseType::system(&name, BaseKind::Matrix { row, columns }))?;
            }
        }
    }
    trace!("system scope: {} types", scope.type_count());

    let float4 = match vectors.get(&(ScalarKind::Float, 4)) {
        Some(t) => t.clone(),
        None => {
            return Err(BootstrapError::UnknownType {
                function: String::new(),
                ty: "float4".into(),
            })
        }
    };

    // 4. builtin functions
    for b in BUILTINS {
        declare_builtin(&mut scope, b)?;
    }
    trace!("system scope: {} functions", scope.function_count());

    Ok(SystemScope {
        scope,
        void,
        int,
        bool,
        float,
        float4,
        string,
        vectors,
    })
}

fn add_type(scope: &mut Scope, ty: BaseType) -> Result<Arc<BaseType>, BootstrapError> {
    let ty = Arc::new(ty);
    if !scope.add_type(ty.clone()) {
        return Err(BootstrapError::DuplicateType(ty.name.clone()));
    }
    Ok(ty)
}

/// Every sequence of length 1..=n over each suffix alphabet truncated to n
/// letters. A field is writable iff no letter repeats.
fn generate_swizzles(n: usize) -> HashMap<String, Swizzle> {
    let mut out = HashMap::new();
    for alphabet in SUFFIX_ALPHABETS {
        let letters = &alphabet[..n];
        let mut frontier: Vec<String> = vec![String::new()];
        for length in 1..=n {
            let mut next = Vec::with_capacity(frontier.len() * n);
            for prefix in &frontier {
                for l in letters {
                    let mut s = prefix.clone();
                    s.push_str(l);
                    let writable = !prefix.contains(l) && is_unique(prefix);
                    out.insert(
                        s.clone(),
                        Swizzle {
                            name: s.clone(),
                            length,
                            writable,
                        },
                    );
                    next.push(s);
                }
            }
            frontier = next;
        }
    }
    out
}

fn is_unique(s: &str) -> bool {
    let bytes = s.as_bytes();
    (0..bytes.len()).all(|i| !bytes[i + 1..].contains(&bytes[i]))
}

fn declare_builtin(scope: &mut Scope, b: &Builtin) -> Result<(), BootstrapError> {
    match b.instances {
        Some(instances) => {
            for inst in instances {
                let ret = if b.ret == T { inst } else { b.ret };
                let params: Vec<&str> = b
                    .params
                    .iter()
                    .map(|p| if *p == T { *inst } else { *p })
                    .collect();
                declare_instance(scope, b, ret, &params)?;
            }
            Ok(())
        }
        None => {
            if b.ret == T || b.params.contains(&T) {
                return Err(BootstrapError::TemplateWithoutInstances(b.name.to_string()));
            }
            declare_instance(scope, b, b.ret, b.params)
        }
    }
}

fn declare_instance(scope: &mut Scope, b: &Builtin, ret: &str, params: &[&str]) -> Result<(), BootstrapError> {
    let resolve = |name: &str, scope: &Scope| -> Result<VarType, BootstrapError> {
        scope
            .type_decl(name)
            .map(|t| VarType::new(t.clone()))
            .ok_or_else(|| BootstrapError::UnknownType {
                function: b.name.to_string(),
                ty: name.to_string(),
            })
    };
    let return_type = resolve(ret, scope)?;
    let mut param_sigs = Vec::with_capacity(params.len());
    for (i, p) in params.iter().enumerate() {
        param_sigs.push(ParamSig {
            name: format!("p{}", i),
            ty: resolve(p, scope)?,
            semantic: None,
            has_default: false,
        });
    }
    let sig = FunctionSig::new(
        b.name,
        return_type,
        param_sigs,
        None,
        FunctionOrigin::Builtin {
            template: b.translation.to_string(),
            vertex: b.vertex,
            pixel: b.pixel,
        },
        Span::default(),
    );
    let signature = sig.signature();
    if !scope.add_function(sig) {
        return Err(BootstrapError::DuplicateFunction(signature));
    }
    Ok(())
}

impl SystemScope {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn find_type(&self, name: &str) -> Option<Arc<BaseType>> {
        self.scope.type_decl(name).cloned()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.scope.type_decl(name).is_some()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.scope.variable(name).is_some()
    }

    /// Scalar (`length == 1`) or vector of `kind`.
    pub fn vector_of(&self, kind: ScalarKind, length: usize) -> Option<Arc<BaseType>> {
        self.vectors.get(&(kind, length)).cloned()
    }

    /// Type of a vector swizzle field, e.g. `float4.xy` → `float2`.
    pub fn swizzle_type(&self, vector: &BaseType, field: &str) -> Option<(VarType, bool)> {
        let sw = vector.swizzle(field)?;
        let kind = vector.scalar_kind()?;
        let base = self.vector_of(kind, sw.length)?;
        Some((VarType::new(base), sw.writable))
    }

    pub fn void(&self) -> VarType {
        VarType::new(self.void.clone())
    }

    pub fn int(&self) -> VarType {
        VarType::new(self.int.clone())
    }

    pub fn bool(&self) -> VarType {
        VarType::new(self.bool.clone())
    }

    pub fn float(&self) -> VarType {
        VarType::new(self.float.clone())
    }

    pub fn float4(&self) -> VarType {
        VarType::new(self.float4.clone())
    }

    pub fn string(&self) -> VarType {
        VarType::new(self.string.clone())
    }

    // Type-category predicates used by operator checking.

    pub fn is_scalar(t: &VarType) -> bool {
        t.is_scalar()
    }

    pub fn is_vector(t: &VarType) -> bool {
        t.is_vector()
    }

    pub fn is_matrix(t: &VarType) -> bool {
        t.is_matrix()
    }

    pub fn is_sampler(t: &VarType) -> bool {
        t.is_sampler()
    }

    pub fn is_bool_based(t: &VarType) -> bool {
        t.is_bool_based()
    }

    pub fn is_float_based(t: &VarType) -> bool {
        t.is_float_based()
    }

    pub fn is_int_based(t: &VarType) -> bool {
        t.is_int_based()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_all_types() {
        let s = build_system_scope();
        for name in [
            "void", "int", "bool", "float", "string", "texture", "sampler", "sampler2D",
            "samplerCUBE", "float2", "int3", "bool4", "float2x3", "int4x4", "bool3x2",
        ] {
            assert!(s.has_type(name), "missing {}", name);
        }
        // 9 scalars + 9 vectors + 27 matrices
        assert_eq!(s.scope().type_count(), 45);
    }

    #[test]
    fn matrix_row_and_columns() {
        let s = build_system_scope();
        let m = s.find_type("float2x3").unwrap();
        match &m.kind {
            BaseKind::Matrix { row, columns } => {
                assert_eq!(row.name, "float2");
                assert_eq!(*columns, 3);
            }
            other => panic!("expected matrix, got {:?}", other),
        }
        assert_eq!(m.length(), 3);
        assert!(VarType::new(m).is_float_based());
    }

    #[test]
    fn swizzle_fields_and_writability() {
        let s = build_system_scope();
        let f4 = s.find_type("float4").unwrap();
        let (t, w) = s.swizzle_type(&f4, "xyz").unwrap();
        assert_eq!(t.hash(), "float3");
        assert!(w);
        let (t, w) = s.swizzle_type(&f4, "xx").unwrap();
        assert_eq!(t.hash(), "float2");
        assert!(!w);
        let (t, _) = s.swizzle_type(&f4, "a").unwrap();
        assert_eq!(t.hash(), "float");
        // alphabets are truncated to the vector length
        let f2 = s.find_type("float2").unwrap();
        assert!(s.swizzle_type(&f2, "z").is_none());
        assert!(s.swizzle_type(&f2, "xyx").is_none());
        // mixed alphabets are not generated
        assert!(s.swizzle_type(&f4, "xg").is_none());
    }

    #[test]
    fn swizzle_count_per_length() {
        // 3 alphabets × (n + n² + … + nⁿ)
        assert_eq!(generate_swizzles(2).len(), 3 * (2 + 4));
        assert_eq!(generate_swizzles(3).len(), 3 * (3 + 9 + 27));
        assert_eq!(generate_swizzles(4).len(), 3 * (4 + 16 + 64 + 256));
    }

    #[test]
    fn template_functions_expand_per_instance() {
        let s = build_system_scope();
        let dots = s.scope().functions("dot");
        assert_eq!(dots.len(), 4);
        assert!(dots.iter().all(|f| f.return_type.hash() == "float"));
        let sat: Vec<String> = s
            .scope()
            .functions("saturate")
            .iter()
            .map(|f| f.signature())
            .collect();
        assert!(sat.contains(&"saturate(float3,)".to_string()));
        let mul = s.scope().functions("mul");
        assert!(mul.iter().any(|f| f.signature() == "mul(int,int,)" && f.return_type.hash() == "int"));
    }

    #[test]
    fn stage_availability_flags() {
        let s = build_system_scope();
        let lod = &s.scope().functions("tex2DLod")[0];
        assert!(lod.vertex_usable() && !lod.pixel_usable());
        let bias = s
            .scope()
            .functions("tex2D")
            .iter()
            .find(|f| f.params.len() == 3)
            .unwrap()
            .clone();
        assert!(!bias.vertex_usable() && bias.pixel_usable());
        match &bias.origin {
            FunctionOrigin::Builtin { template, .. } => assert_eq!(template, "texture2D($1,$2,$3)"),
            other => panic!("expected builtin, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_builtin_is_a_bootstrap_error() {
        let mut scope = Scope::new(ScopeKind::System, None);
        add_type(&mut scope, BaseType::scalar(ScalarKind::Float)).unwrap();
        let b = both("f", "f($1)", "float", &["float"], None);
        declare_builtin(&mut scope, &b).unwrap();
        assert_eq!(
            declare_builtin(&mut scope, &b),
            Err(BootstrapError::DuplicateFunction("f(float,)".into()))
        );
        let bad = both("g", "g($1)", T, &[T], None);
        assert!(matches!(
            declare_builtin(&mut scope, &bad),
            Err(BootstrapError::TemplateWithoutInstances(_))
        ));
    }

    #[test]
    fn predicates_follow_categories() {
        let s = build_system_scope();
        assert!(SystemScope::is_scalar(&s.float()));
        assert!(!SystemScope::is_scalar(&s.float4()));
        assert!(SystemScope::is_vector(&s.float4()));
        let sampler = VarType::new(s.find_type("sampler2D").unwrap());
        assert!(SystemScope::is_sampler(&sampler));
        assert!(SystemScope::is_bool_based(&s.bool()));
        assert!(SystemScope::is_int_based(&s.int()));
        assert!(!SystemScope::is_float_based(&s.int()));
    }
}
