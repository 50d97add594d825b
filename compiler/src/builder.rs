// builder.rs — Terse constructors for parse trees
//
// Lets tests, benches and embedders assemble `ast` trees without a parser.
// All nodes get an empty span; callers needing locations set `span` fields
// directly.

use crate::ast::*;

pub fn ident(name: &str) -> Ident {
    Ident {
        name: name.to_string(),
        span: Span::default(),
    }
}

pub fn program(decls: Vec<Decl>) -> Program {
    Program {
        decls,
        span: Span::default(),
    }
}

// ── Types ──

pub fn ty(name: &str) -> UsageType {
    UsageType {
        usages: Vec::new(),
        ty: TypeRef::Named(ident(name)),
    }
}

pub fn ty_with(usages: &[Usage], name: &str) -> UsageType {
    UsageType {
        usages: usages.to_vec(),
        ty: TypeRef::Named(ident(name)),
    }
}

pub fn struct_ty(def: StructDef) -> UsageType {
    UsageType {
        usages: Vec::new(),
        ty: TypeRef::Struct(def),
    }
}

pub fn struct_def(name: &str, fields: Vec<VariableDecl>) -> StructDef {
    StructDef {
        name: ident(name),
        fields,
        span: Span::default(),
    }
}

pub fn field(ty_name: &str, name: &str) -> VariableDecl {
    var_decl(ty(ty_name), vec![var(name)])
}

pub fn field_sem(ty_name: &str, name: &str, semantic: &str) -> VariableDecl {
    var_decl(ty(ty_name), vec![var_sem(name, semantic)])
}

pub fn type_decl(name: &str, fields: Vec<VariableDecl>) -> TypeDecl {
    TypeDecl {
        def: struct_def(name, fields),
        span: Span::default(),
    }
}

pub fn struct_decl(name: &str, fields: Vec<VariableDecl>) -> Decl {
    Decl::Type(type_decl(name, fields))
}

pub fn typedef_decl(ty: UsageType, alias: &str) -> TypedefDecl {
    TypedefDecl {
        ty,
        alias: ident(alias),
        span: Span::default(),
    }
}

pub fn typedef(ty: UsageType, alias: &str) -> Decl {
    Decl::Typedef(typedef_decl(ty, alias))
}

/// `cbuffer name : semantic { fields };`
pub fn cbuffer(name: &str, semantic: Option<&str>, fields: Vec<VariableDecl>) -> Decl {
    Decl::Cbuffer(CbufferDecl {
        name: ident(name),
        semantic: semantic.map(String::from),
        annotation: None,
        fields,
        span: Span::default(),
    })
}

/// A stray `;` at file scope.
pub fn empty_decl() -> Decl {
    Decl::Empty {
        span: Span::default(),
    }
}

// ── Variables ──

pub fn var(name: &str) -> Variable {
    Variable {
        name: ident(name),
        dims: Vec::new(),
        semantic: None,
        annotation: None,
        init: None,
        span: Span::default(),
    }
}

pub fn var_sem(name: &str, semantic: &str) -> Variable {
    Variable {
        semantic: Some(semantic.to_string()),
        ..var(name)
    }
}

pub fn var_init(name: &str, init: Expr) -> Variable {
    Variable {
        init: Some(Initializer::Expr { expr: init }),
        ..var(name)
    }
}

pub fn var_list(name: &str, items: Vec<Initializer>) -> Variable {
    Variable {
        init: Some(Initializer::List {
            items,
            span: Span::default(),
        }),
        ..var(name)
    }
}

pub fn var_array(name: &str, dims: Vec<Expr>) -> Variable {
    Variable { dims, ..var(name) }
}

pub fn init(expr: Expr) -> Initializer {
    Initializer::Expr { expr }
}

pub fn var_decl(ty: UsageType, vars: Vec<Variable>) -> VariableDecl {
    VariableDecl {
        ty,
        vars,
        span: Span::default(),
    }
}

pub fn global(ty: UsageType, vars: Vec<Variable>) -> Decl {
    Decl::Variable(var_decl(ty, vars))
}

pub fn annotation(decls: Vec<VariableDecl>) -> Annotation {
    Annotation {
        decls,
        span: Span::default(),
    }
}

// ── Functions ──

pub fn param(ty: UsageType, name: &str) -> Param {
    Param {
        ty,
        var: var(name),
        span: Span::default(),
    }
}

pub fn param_sem(ty: UsageType, name: &str, semantic: &str) -> Param {
    Param {
        ty,
        var: var_sem(name, semantic),
        span: Span::default(),
    }
}

pub fn param_default(ty: UsageType, name: &str, default: Expr) -> Param {
    Param {
        ty,
        var: var_init(name, default),
        span: Span::default(),
    }
}

pub fn function_def(ret: UsageType, name: &str, params: Vec<Param>) -> FunctionDef {
    FunctionDef {
        return_type: ret,
        name: ident(name),
        params,
        semantic: None,
        span: Span::default(),
    }
}

pub fn function(ret: UsageType, name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Decl {
    Decl::Function(FunctionDecl {
        def: function_def(ret, name, params),
        body: Some(block_of(body)),
        annotation: None,
        span: Span::default(),
    })
}

pub fn function_sem(
    ret: UsageType,
    name: &str,
    params: Vec<Param>,
    semantic: &str,
    body: Vec<Stmt>,
) -> Decl {
    let mut def = function_def(ret, name, params);
    def.semantic = Some(semantic.to_string());
    Decl::Function(FunctionDecl {
        def,
        body: Some(block_of(body)),
        annotation: None,
        span: Span::default(),
    })
}

pub fn forward(ret: UsageType, name: &str, params: Vec<Param>) -> Decl {
    Decl::Function(FunctionDecl {
        def: function_def(ret, name, params),
        body: None,
        annotation: None,
        span: Span::default(),
    })
}

// ── Pragmas ──

pub fn use_strict() -> Decl {
    Decl::Use(UseDecl {
        mode: ident("strict"),
        span: Span::default(),
    })
}

pub fn import(component: &str) -> Decl {
    Decl::Import(ImportDecl {
        component: ident(component),
        span: Span::default(),
    })
}

pub fn provide(module: &str) -> Decl {
    Decl::Provide(ProvideDecl {
        module: ident(module),
        span: Span::default(),
    })
}

// ── Techniques ──

pub fn technique(name: &str, passes: Vec<PassDecl>) -> Decl {
    Decl::Technique(TechniqueDecl {
        name: ident(name),
        semantic: None,
        annotation: None,
        passes,
        span: Span::default(),
    })
}

pub fn pass(name: &str, states: Vec<PassState>) -> PassDecl {
    PassDecl {
        name: Some(ident(name)),
        annotation: None,
        states,
        span: Span::default(),
    }
}

pub fn state(name: &str, value: StateValue) -> PassState {
    PassState {
        name: ident(name),
        index: None,
        value,
        span: Span::default(),
    }
}

pub fn token(value: &str) -> StateValue {
    StateValue::Token {
        value: value.to_string(),
        span: Span::default(),
    }
}

pub fn tokens(values: &[&str]) -> StateValue {
    StateValue::List {
        items: values.iter().map(|v| token(v)).collect(),
        span: Span::default(),
    }
}

pub fn state_expr(expr: Expr) -> StateValue {
    StateValue::Expr { expr }
}

pub fn partfx(name: &str, properties: Vec<PassState>, passes: Vec<PassDecl>) -> Decl {
    Decl::PartFx(PartFxDecl {
        name: ident(name),
        semantic: None,
        annotation: None,
        properties,
        passes,
        span: Span::default(),
    })
}

// ── Statements ──

pub fn block_of(stmts: Vec<Stmt>) -> Block {
    Block {
        stmts,
        span: Span::default(),
    }
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Block(block_of(stmts))
}

pub fn ret(expr: Expr) -> Stmt {
    Stmt::Return {
        expr: Some(expr),
        span: Span::default(),
    }
}

pub fn ret_void() -> Stmt {
    Stmt::Return {
        expr: None,
        span: Span::default(),
    }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr {
        expr,
        span: Span::default(),
    }
}

pub fn empty() -> Stmt {
    Stmt::Empty {
        span: Span::default(),
    }
}

pub fn if_(cond: Expr, then: Stmt, else_: Option<Stmt>) -> Stmt {
    Stmt::If {
        cond,
        then: Box::new(then),
        else_: else_.map(Box::new),
        span: Span::default(),
    }
}

pub fn while_(cond: Expr, body: Stmt) -> Stmt {
    Stmt::While {
        cond,
        body: Box::new(body),
        span: Span::default(),
    }
}

pub fn do_while(body: Stmt, cond: Expr) -> Stmt {
    Stmt::DoWhile {
        body: Box::new(body),
        cond,
        span: Span::default(),
    }
}

pub fn for_(init: Option<ForInit>, cond: Option<Expr>, step: Option<Expr>, body: Stmt) -> Stmt {
    Stmt::For {
        init,
        cond,
        step,
        body: Box::new(body),
        span: Span::default(),
    }
}

pub fn local(ty: UsageType, vars: Vec<Variable>) -> Stmt {
    Stmt::Decl {
        decl: LocalDecl::Variable(var_decl(ty, vars)),
        span: Span::default(),
    }
}

pub fn local_struct(name: &str, fields: Vec<VariableDecl>) -> Stmt {
    Stmt::Decl {
        decl: LocalDecl::Type(type_decl(name, fields)),
        span: Span::default(),
    }
}

pub fn local_typedef(ty: UsageType, alias: &str) -> Stmt {
    Stmt::Decl {
        decl: LocalDecl::Typedef(typedef_decl(ty, alias)),
        span: Span::default(),
    }
}

pub fn brk() -> Stmt {
    Stmt::Break {
        span: Span::default(),
    }
}

pub fn cont() -> Stmt {
    Stmt::Continue {
        span: Span::default(),
    }
}

pub fn discard() -> Stmt {
    Stmt::Discard {
        span: Span::default(),
    }
}

// ── Expressions ──

pub fn id(name: &str) -> Expr {
    Expr::Id(ident(name))
}

pub fn int(value: i64) -> Expr {
    Expr::Literal {
        value: Literal::Int { value },
        span: Span::default(),
    }
}

pub fn float(value: f64) -> Expr {
    Expr::Literal {
        value: Literal::Float { value },
        span: Span::default(),
    }
}

pub fn boolean(value: bool) -> Expr {
    Expr::Literal {
        value: Literal::Bool { value },
        span: Span::default(),
    }
}

pub fn string(value: &str) -> Expr {
    Expr::Literal {
        value: Literal::String {
            value: value.to_string(),
        },
        span: Span::default(),
    }
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: Span::default(),
    }
}

pub fn logical(op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Logical {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: Span::default(),
    }
}

pub fn assign(op: AssignOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Assign {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: Span::default(),
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
        span: Span::default(),
    }
}

pub fn postfix(op: PostfixOp, operand: Expr) -> Expr {
    Expr::Postfix {
        op,
        operand: Box::new(operand),
        span: Span::default(),
    }
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    Expr::Index {
        base: Box::new(base),
        index: Box::new(idx),
        span: Span::default(),
    }
}

pub fn member(base: Expr, field: &str) -> Expr {
    Expr::Member {
        base: Box::new(base),
        field: ident(field),
        span: Span::default(),
    }
}

pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: ident(callee),
        args,
        span: Span::default(),
    }
}

pub fn cast(ty: UsageType, expr: Expr) -> Expr {
    Expr::Cast {
        ty,
        expr: Box::new(expr),
        span: Span::default(),
    }
}

pub fn cond(c: Expr, then: Expr, else_: Expr) -> Expr {
    Expr::Conditional {
        cond: Box::new(c),
        then: Box::new(then),
        else_: Box::new(else_),
        span: Span::default(),
    }
}

pub fn compile(function: &str, args: Vec<Expr>) -> Expr {
    Expr::Compile {
        function: ident(function),
        args,
        span: Span::default(),
    }
}

/// `SamplerState name { states };` at file scope.
pub fn sampler_state_decl(name: &str, states: Vec<PassState>) -> Decl {
    Decl::SamplerState(SamplerStateDecl {
        name: ident(name),
        states,
        span: Span::default(),
    })
}

pub fn sampler_state(states: Vec<PassState>) -> Expr {
    Expr::SamplerState {
        states,
        span: Span::default(),
    }
}

pub fn paren(expr: Expr) -> Expr {
    Expr::Paren {
        expr: Box::new(expr),
        span: Span::default(),
    }
}
