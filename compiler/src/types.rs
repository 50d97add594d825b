// types.rs — Type model: base types and variable types
//
// A base type is a builtin scalar/vector/matrix/sampler or a user struct.
// A variable type wraps exactly one base type with usage qualifiers and an
// optional stack of array dimensions. Type identity for overload matching is
// the structural hash (`VarType::hash`), which ignores usages.
//
// Preconditions: vector/matrix element types are built before their owners.
// Postconditions: every `VarType` resolves to exactly one `BaseType`.
// Failure modes: array-dimension folding returns `ArrayError`.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp, Usage};

// ── Base types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Bool,
    Float,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Bool => "bool",
            ScalarKind::Float => "float",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    Generic,
    Sampler2D,
    SamplerCube,
}

/// A generated vector field: `xy`, `rgba`, `sst`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swizzle {
    pub name: String,
    pub length: usize,
    /// False when a component repeats (`xx`), which cannot be assigned.
    pub writable: bool,
}

#[derive(Debug)]
pub enum BaseKind {
    Void,
    Scalar(ScalarKind),
    String,
    Texture,
    Sampler(SamplerKind),
    Vector {
        element: Arc<BaseType>,
        length: usize,
        swizzles: HashMap<String, Swizzle>,
    },
    Matrix {
        row: Arc<BaseType>,
        columns: usize,
    },
    Struct {
        fields: Vec<Field>,
    },
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: VarType,
    pub semantic: Option<String>,
}

#[derive(Debug)]
pub struct BaseType {
    pub name: String,
    pub kind: BaseKind,
    pub builtin: bool,
}

impl BaseType {
    pub fn scalar(kind: ScalarKind) -> Self {
        BaseType {
            name: kind.name().to_string(),
            kind: BaseKind::Scalar(kind),
            builtin: true,
        }
    }

    pub fn system(name: &str, kind: BaseKind) -> Self {
        BaseType {
            name: name.to_string(),
            kind,
            builtin: true,
        }
    }

    pub fn structure(name: &str, fields: Vec<Field>) -> Self {
        BaseType {
            name: name.to_string(),
            kind: BaseKind::Struct { fields },
            builtin: false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, BaseKind::Void)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, BaseKind::Struct { .. })
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self.kind, BaseKind::Sampler(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, BaseKind::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, BaseKind::Vector { .. })
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.kind, BaseKind::Matrix { .. })
    }

    /// Scalar kind of a scalar, vector or matrix; `None` otherwise.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.kind {
            BaseKind::Scalar(k) => Some(*k),
            BaseKind::Vector { element, .. } => element.scalar_kind(),
            BaseKind::Matrix { row, .. } => row.scalar_kind(),
            _ => None,
        }
    }

    /// Vector component count, matrix column count, 1 for scalars.
    pub fn length(&self) -> usize {
        match &self.kind {
            BaseKind::Vector { length, .. } => *length,
            BaseKind::Matrix { columns, .. } => *columns,
            _ => 1,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            BaseKind::Struct { fields } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn swizzle(&self, name: &str) -> Option<&Swizzle> {
        match &self.kind {
            BaseKind::Vector { swizzles, .. } => swizzles.get(name),
            _ => None,
        }
    }

    pub fn field_by_semantic(&self, semantic: &str) -> Option<&Field> {
        self.fields()
            .iter()
            .find(|f| f.semantic.as_deref() == Some(semantic))
    }

    pub fn has_field_without_semantic(&self) -> bool {
        self.fields().iter().any(|f| f.semantic.is_none())
    }

    /// Every field has a semantic and no two fields share one.
    pub fn has_all_unique_semantics(&self) -> bool {
        let fields = self.fields();
        let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
        for f in fields {
            match f.semantic.as_deref() {
                Some(s) if !seen.contains(&s) => seen.push(s),
                _ => return false,
            }
        }
        true
    }

    pub fn contains_sampler(&self) -> bool {
        match &self.kind {
            BaseKind::Sampler(_) => true,
            BaseKind::Struct { fields } => fields.iter().any(|f| f.ty.contains_sampler()),
            _ => false,
        }
    }

    pub fn contains_array(&self) -> bool {
        match &self.kind {
            BaseKind::Struct { fields } => fields.iter().any(|f| f.ty.contains_array()),
            _ => false,
        }
    }

    pub fn contains_struct(&self) -> bool {
        self.fields().iter().any(|f| f.ty.base.is_struct())
    }
}

// ── Variable types ──────────────────────────────────────────────────────────

/// Length of one array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(u32),
    /// Not constant-foldable at analysis time.
    Pending,
}

/// Base type + usage qualifiers + array dimensions (outermost first).
#[derive(Debug, Clone)]
pub struct VarType {
    pub base: Arc<BaseType>,
    pub usages: Vec<Usage>,
    pub dims: Vec<ArrayLen>,
    readable: bool,
    writable: bool,
}

impl VarType {
    pub fn new(base: Arc<BaseType>) -> Self {
        VarType {
            base,
            usages: Vec::new(),
            dims: Vec::new(),
            readable: true,
            writable: true,
        }
    }

    /// A read-only `const` wrapper, used for literals.
    pub fn constant(base: Arc<BaseType>) -> Self {
        VarType::new(base).with_usage(Usage::Const).read_only()
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        if !self.usages.contains(&usage) {
            self.usages.push(usage);
        }
        self
    }

    pub fn with_usages(mut self, usages: &[Usage]) -> Self {
        for u in usages {
            self = self.with_usage(*u);
        }
        self
    }

    pub fn with_dims(mut self, dims: Vec<ArrayLen>) -> Self {
        self.dims = dims;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// The same base type without qualifiers or dimensions.
    pub fn plain(&self) -> VarType {
        VarType::new(self.base.clone())
    }

    pub fn has_usage(&self, usage: Usage) -> bool {
        self.usages.contains(&usage)
    }

    pub fn is_uniform(&self) -> bool {
        self.has_usage(Usage::Uniform)
    }

    pub fn is_const(&self) -> bool {
        self.has_usage(Usage::Const)
    }

    pub fn writable(&self) -> bool {
        self.writable && !self.is_uniform() && !self.is_const()
    }

    pub fn readable(&self) -> bool {
        self.readable && !self.has_usage(Usage::Out)
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Element type after peeling the outermost dimension.
    pub fn element(&self) -> Option<VarType> {
        if self.dims.is_empty() {
            return None;
        }
        let mut el = self.clone();
        el.dims.remove(0);
        Some(el)
    }

    /// Fixed length of the outermost array dimension, else the vector/matrix length.
    pub fn length(&self) -> Option<u32> {
        match self.dims.first() {
            Some(ArrayLen::Fixed(n)) => Some(*n),
            Some(ArrayLen::Pending) => None,
            None => Some(self.base.length() as u32),
        }
    }

    /// Structural identity used for overload matching and type equality.
    pub fn hash(&self) -> String {
        let mut s = self.base.name.clone();
        for d in &self.dims {
            match d {
                ArrayLen::Fixed(n) => s.push_str(&format!("[{}]", n)),
                ArrayLen::Pending => s.push_str("[]"),
            }
        }
        s
    }

    pub fn is_equal(&self, other: &VarType) -> bool {
        self.hash() == other.hash()
    }

    pub fn is_void(&self) -> bool {
        self.dims.is_empty() && self.base.is_void()
    }

    pub fn is_complex(&self) -> bool {
        self.base.is_struct()
    }

    pub fn is_sampler(&self) -> bool {
        self.dims.is_empty() && self.base.is_sampler()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty() && self.base.is_scalar()
    }

    pub fn is_vector(&self) -> bool {
        self.dims.is_empty() && self.base.is_vector()
    }

    pub fn is_matrix(&self) -> bool {
        self.dims.is_empty() && self.base.is_matrix()
    }

    /// Scalar/vector/matrix of the given scalar kind (no array dimensions).
    fn is_based_on(&self, kind: ScalarKind) -> bool {
        self.dims.is_empty() && self.base.scalar_kind() == Some(kind)
    }

    pub fn is_bool_based(&self) -> bool {
        self.is_based_on(ScalarKind::Bool)
    }

    pub fn is_float_based(&self) -> bool {
        self.is_based_on(ScalarKind::Float)
    }

    pub fn is_int_based(&self) -> bool {
        self.is_based_on(ScalarKind::Int)
    }

    pub fn is_exactly(&self, name: &str) -> bool {
        self.dims.is_empty() && self.base.name == name
    }

    pub fn contains_sampler(&self) -> bool {
        self.base.contains_sampler()
    }

    pub fn contains_array(&self) -> bool {
        self.is_array() || self.base.contains_array()
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash())
    }
}

// ── Array dimension folding ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// The dimension expression folds to zero or a negative value.
    NonPositive(i64),
    /// The dimension expression folds to a non-integer constant.
    NotInteger,
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayError::NonPositive(n) => write!(f, "length {} is not positive", n),
            ArrayError::NotInteger => write!(f, "length is not an integer"),
        }
    }
}

impl std::error::Error for ArrayError {}

/// Fold an integer constant expression. `None` when the expression is not
/// constant (identifiers, calls, ...).
pub fn fold_int(expr: &Expr) -> Option<Result<i64, ArrayError>> {
    match expr {
        Expr::Literal { value, .. } => match value {
            Literal::Int { value } => Some(Ok(*value)),
            Literal::Float { .. } | Literal::Bool { .. } | Literal::String { .. } => {
                Some(Err(ArrayError::NotInteger))
            }
        },
        Expr::Paren { expr, .. } => fold_int(expr),
        Expr::Unary { op, operand, .. } => {
            let v = match fold_int(operand)? {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            match op {
                UnaryOp::Minus => Some(Ok(-v)),
                UnaryOp::Plus => Some(Ok(v)),
                UnaryOp::Not | UnaryOp::PreInc | UnaryOp::PreDec => None,
            }
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = match fold_int(lhs)? {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            let r = match fold_int(rhs)? {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            match op {
                BinaryOp::Add => Some(Ok(l.wrapping_add(r))),
                BinaryOp::Sub => Some(Ok(l.wrapping_sub(r))),
                BinaryOp::Mul => Some(Ok(l.wrapping_mul(r))),
                BinaryOp::Div if r != 0 => Some(Ok(l / r)),
                BinaryOp::BitAnd => Some(Ok(l & r)),
                BinaryOp::BitOr => Some(Ok(l | r)),
                BinaryOp::BitXor => Some(Ok(l ^ r)),
                BinaryOp::Shl => u32::try_from(r).ok().and_then(|r| l.checked_shl(r)).map(Ok),
                BinaryOp::Shr => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)).map(Ok),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Resolve one array dimension.
pub fn array_len(expr: &Expr) -> Result<ArrayLen, ArrayError> {
    match fold_int(expr) {
        None => Ok(ArrayLen::Pending),
        Some(Err(e)) => Err(e),
        Some(Ok(n)) if n <= 0 => Err(ArrayError::NonPositive(n)),
        Some(Ok(n)) => Ok(ArrayLen::Fixed(u32::try_from(n).unwrap_or(u32::MAX))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder as b;

    fn float() -> Arc<BaseType> {
        Arc::new(BaseType::scalar(ScalarKind::Float))
    }

    #[test]
    fn hash_ignores_usages_but_not_dims() {
        let a = VarType::new(float()).with_usage(Usage::Uniform);
        let c = VarType::new(float());
        assert!(a.is_equal(&c));
        let arr = VarType::new(float()).with_dims(vec![ArrayLen::Fixed(3)]);
        assert_eq!(arr.hash(), "float[3]");
        assert!(!arr.is_equal(&c));
    }

    #[test]
    fn usage_controls_read_write() {
        let t = VarType::new(float());
        assert!(t.readable() && t.writable());
        assert!(!t.clone().with_usage(Usage::Uniform).writable());
        assert!(!t.clone().with_usage(Usage::Const).writable());
        assert!(!t.clone().with_usage(Usage::Out).readable());
        assert!(t.clone().with_usage(Usage::Inout).readable());
        assert!(!VarType::constant(float()).writable());
    }

    #[test]
    fn element_peels_outermost_dimension() {
        let t = VarType::new(float()).with_dims(vec![ArrayLen::Fixed(2), ArrayLen::Fixed(3)]);
        assert_eq!(t.length(), Some(2));
        let el = t.element().unwrap();
        assert_eq!(el.hash(), "float[3]");
        assert_eq!(el.element().unwrap().hash(), "float");
        assert!(el.element().unwrap().element().is_none());
    }

    #[test]
    fn unique_semantics_require_every_field() {
        let f = |name: &str, sem: Option<&str>| Field {
            name: name.into(),
            ty: VarType::new(float()),
            semantic: sem.map(String::from),
        };
        let ok = BaseType::structure("S", vec![f("a", Some("A")), f("b", Some("B"))]);
        assert!(ok.has_all_unique_semantics());
        let dup = BaseType::structure("S", vec![f("a", Some("A")), f("b", Some("A"))]);
        assert!(!dup.has_all_unique_semantics());
        let missing = BaseType::structure("S", vec![f("a", Some("A")), f("b", None)]);
        assert!(!missing.has_all_unique_semantics());
        assert!(missing.has_field_without_semantic());
    }

    #[test]
    fn array_len_folds_constants() {
        assert_eq!(array_len(&b::int(4)), Ok(ArrayLen::Fixed(4)));
        assert_eq!(
            array_len(&b::binary(BinaryOp::Mul, b::int(2), b::int(3))),
            Ok(ArrayLen::Fixed(6))
        );
        assert_eq!(
            array_len(&b::binary(BinaryOp::Shl, b::int(1), b::int(3))),
            Ok(ArrayLen::Fixed(8))
        );
        assert_eq!(
            array_len(&b::binary(BinaryOp::BitOr, b::int(4), b::int(1))),
            Ok(ArrayLen::Fixed(5))
        );
        assert_eq!(array_len(&b::id("N")), Ok(ArrayLen::Pending));
        assert_eq!(array_len(&b::int(0)), Err(ArrayError::NonPositive(0)));
        assert_eq!(
            array_len(&b::unary(UnaryOp::Minus, b::int(2))),
            Err(ArrayError::NonPositive(-2))
        );
        assert_eq!(array_len(&b::float(1.5)), Err(ArrayError::NotInteger));
    }
}
