// Parse-tree node types for effect (.fx) source files.
//
// The tree is produced by an external parser and handed over as JSON; every
// node kind is a Rust enum variant so the analyzer can match exhaustively.
// Every node carries a `Span` for error reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module); malformed JSON is rejected by serde.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte-offset source range. `0..0` when the parser supplied no range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

// ── Root ──

/// A complete effect file: a sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub span: Span,
}

// ── Top-level declarations ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Decl {
    PartFx(PartFxDecl),
    Technique(TechniqueDecl),
    Use(UseDecl),
    Import(ImportDecl),
    Provide(ProvideDecl),
    Type(TypeDecl),
    Variable(VariableDecl),
    Function(FunctionDecl),
    Typedef(TypedefDecl),
    SamplerState(SamplerStateDecl),
    Cbuffer(CbufferDecl),
    /// A stray `;` at file scope.
    Empty {
        #[serde(default)]
        span: Span,
    },
}

/// `use strict;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseDecl {
    pub mode: Ident,
    #[serde(default)]
    pub span: Span,
}

/// `import a.b.c;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub component: Ident,
    #[serde(default)]
    pub span: Span,
}

/// `provide a.b;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvideDecl {
    pub module: Ident,
    #[serde(default)]
    pub span: Span,
}

// ── Types ──

/// `struct S { ... };` as a standalone type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub def: StructDef,
    #[serde(default)]
    pub span: Span,
}

/// `typedef float3 Color;` or `typedef struct { ... } Light;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub ty: UsageType,
    pub alias: Ident,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: Ident,
    pub fields: Vec<VariableDecl>,
    #[serde(default)]
    pub span: Span,
}

/// Usage qualifiers attached to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Uniform,
    Const,
    In,
    Out,
    Inout,
    Static,
    Shared,
    Extern,
    Unsigned,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Usage::Uniform => "uniform",
            Usage::Const => "const",
            Usage::In => "in",
            Usage::Out => "out",
            Usage::Inout => "inout",
            Usage::Static => "static",
            Usage::Shared => "shared",
            Usage::Extern => "extern",
            Usage::Unsigned => "unsigned",
        };
        f.write_str(s)
    }
}

/// A type reference as written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeRef {
    /// `float3`, `S`, ...
    Named(Ident),
    /// Inline `struct { ... }` (or `struct S { ... }`) in a variable declaration.
    Struct(StructDef),
    /// `vector<float, 3>`: recognized by the grammar, rejected by analysis.
    Vector {
        #[serde(default)]
        span: Span,
    },
    /// `matrix<float, 3, 3>`: recognized by the grammar, rejected by analysis.
    Matrix {
        #[serde(default)]
        span: Span,
    },
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Named(id) => id.span,
            TypeRef::Struct(def) => def.span,
            TypeRef::Vector { span } | TypeRef::Matrix { span } => *span,
        }
    }
}

/// Usage qualifiers + type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageType {
    #[serde(default)]
    pub usages: Vec<Usage>,
    pub ty: TypeRef,
}

// ── Variables ──

/// One comma-list declaration: `uniform float a, b[3] = {...};`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub ty: UsageType,
    pub vars: Vec<Variable>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: Ident,
    /// Array dimensions in source order: `a[N][M]` → `[N, M]`.
    #[serde(default)]
    pub dims: Vec<Expr>,
    #[serde(default)]
    pub semantic: Option<String>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub init: Option<Initializer>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Initializer {
    Expr { expr: Expr },
    List {
        items: Vec<Initializer>,
        #[serde(default)]
        span: Span,
    },
}

impl Initializer {
    pub fn span(&self) -> Span {
        match self {
            Initializer::Expr { expr } => expr.span(),
            Initializer::List { span, .. } => *span,
        }
    }
}

/// `< float a = 1; string b = "x"; >`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub decls: Vec<VariableDecl>,
    #[serde(default)]
    pub span: Span,
}

/// `SamplerState name { Filter = ...; };` at file scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerStateDecl {
    pub name: Ident,
    pub states: Vec<PassState>,
    #[serde(default)]
    pub span: Span,
}

/// `cbuffer name : register(b0) { float4 a; float b; };`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbufferDecl {
    pub name: Ident,
    #[serde(default)]
    pub semantic: Option<String>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    pub fields: Vec<VariableDecl>,
    #[serde(default)]
    pub span: Span,
}

// ── Functions ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub def: FunctionDef,
    /// `None` for a forward declaration.
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub return_type: UsageType,
    pub name: Ident,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub semantic: Option<String>,
    #[serde(default)]
    pub span: Span,
}

/// A single parameter. `var.init` holds the default value, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: UsageType,
    pub var: Variable,
    #[serde(default)]
    pub span: Span,
}

// ── Techniques and passes ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDecl {
    pub name: Ident,
    #[serde(default)]
    pub semantic: Option<String>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    pub passes: Vec<PassDecl>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassDecl {
    #[serde(default)]
    pub name: Option<Ident>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    pub states: Vec<PassState>,
    #[serde(default)]
    pub span: Span,
}

/// `NAME[index] = value;` inside a pass, sampler or particle-effect body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassState {
    pub name: Ident,
    #[serde(default)]
    pub index: Option<Expr>,
    pub value: StateValue,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StateValue {
    /// A bare token: `TRUE`, `SRCALPHA`, `100`, `<tex>` (angle brackets stripped).
    Token {
        value: String,
        #[serde(default)]
        span: Span,
    },
    /// `{ a, b, ... }`
    List {
        items: Vec<StateValue>,
        #[serde(default)]
        span: Span,
    },
    /// An expression, typically `compile main()`.
    Expr { expr: Expr },
}

impl StateValue {
    pub fn span(&self) -> Span {
        match self {
            StateValue::Token { span, .. } | StateValue::List { span, .. } => *span,
            StateValue::Expr { expr } => expr.span(),
        }
    }
}

/// `partFx name { Capacity = ...; SpawnRoutine = ...; pass p { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartFxDecl {
    pub name: Ident,
    #[serde(default)]
    pub semantic: Option<String>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub properties: Vec<PassState>,
    #[serde(default)]
    pub passes: Vec<PassDecl>,
    #[serde(default)]
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    Block(Block),
    Expr {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
    Empty {
        #[serde(default)]
        span: Span,
    },
    If {
        cond: Expr,
        then: Box<Stmt>,
        #[serde(default, rename = "else")]
        else_: Option<Box<Stmt>>,
        #[serde(default)]
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        #[serde(default)]
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        #[serde(default)]
        span: Span,
    },
    For {
        #[serde(default)]
        init: Option<ForInit>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        step: Option<Expr>,
        body: Box<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Return {
        #[serde(default)]
        expr: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    Break {
        #[serde(default)]
        span: Span,
    },
    Continue {
        #[serde(default)]
        span: Span,
    },
    Discard {
        #[serde(default)]
        span: Span,
    },
    Decl {
        decl: LocalDecl,
        #[serde(default)]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(b) => b.span,
            Stmt::Expr { span, .. }
            | Stmt::Empty { span }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Discard { span }
            | Stmt::Decl { span, .. } => *span,
        }
    }
}

/// A declaration appearing in statement position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LocalDecl {
    Type(TypeDecl),
    Typedef(TypedefDecl),
    Variable(VariableDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ForInit {
    Variable(VariableDecl),
    Expr { expr: Expr },
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Literal {
    Int { value: i64 },
    Float { value: f64 },
    Bool { value: bool },
    String { value: String },
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int { value } => write!(f, "{}", value),
            Literal::Float { value } => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Literal::Bool { value } => write!(f, "{}", value),
            Literal::String { value } => write!(f, "{:?}", value),
        }
    }
}

/// Arithmetic, bitwise, relational and equality operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    RemAssign,
    #[serde(rename = "&=")]
    AndAssign,
    #[serde(rename = "|=")]
    OrAssign,
    #[serde(rename = "^=")]
    XorAssign,
    #[serde(rename = "<<=")]
    ShlAssign,
    #[serde(rename = ">>=")]
    ShrAssign,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::RemAssign => "%=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
        }
    }

    /// The operator applied by a compound assignment (`+=` → `+`, `<<=` → `<<`).
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::RemAssign => Some(BinaryOp::Rem),
            AssignOp::AndAssign => Some(BinaryOp::BitAnd),
            AssignOp::OrAssign => Some(BinaryOp::BitOr),
            AssignOp::XorAssign => Some(BinaryOp::BitXor),
            AssignOp::ShlAssign => Some(BinaryOp::Shl),
            AssignOp::ShrAssign => Some(BinaryOp::Shr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "++")]
    PreInc,
    #[serde(rename = "--")]
    PreDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostfixOp {
    #[serde(rename = "++")]
    Inc,
    #[serde(rename = "--")]
    Dec,
}

impl PostfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Literal {
        value: Literal,
        #[serde(default)]
        span: Span,
    },
    Id(Ident),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Member {
        base: Box<Expr>,
        field: Ident,
        #[serde(default)]
        span: Span,
    },
    /// `name(args)`: a function call, or a constructor call when `name` is a type.
    Call {
        callee: Ident,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        span: Span,
    },
    Cast {
        ty: UsageType,
        expr: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        #[serde(rename = "else")]
        else_: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `compile name(args)`
    Compile {
        function: Ident,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `sampler_state { ... }`
    SamplerState {
        states: Vec<PassState>,
        #[serde(default)]
        span: Span,
    },
    /// `(expr)` kept for span fidelity.
    Paren {
        expr: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Id(id) => id.span,
            Expr::Literal { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Postfix { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Compile { span, .. }
            | Expr::SamplerState { span, .. }
            | Expr::Paren { span, .. } => *span,
        }
    }
}
