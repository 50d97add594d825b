// expr.rs — Expression analysis
//
// One handler per expression kind. Each handler analyzes and types its
// operands first, then validates the combination and builds the node. An
// operand that was rejected drops the enclosing expression without a second
// diagnostic, so one bad leaf yields exactly one report.
//
// Preconditions: called through `AnalyzeCtx::expr` with the scope cursor at
//                the enclosing block.
// Postconditions: every returned node carries its result type.
// Failure modes: E02xx diagnostics; `None` means the expression was dropped.
// Side effects: none beyond the analysis context.

use std::sync::Arc;

use crate::analyze::AnalyzeCtx;
use crate::ast::*;
use crate::diag::codes;
use crate::id::InstrId;
use crate::ir::InstrKind;
use crate::sampler::{parse_entry, SamplerEntry, SamplerError, SamplerStates};
use crate::scope::FunctionLookup;
use crate::types::{BaseType, ScalarKind, VarType};
use crate::typing::{
    check_bitwise, check_conditional, check_logical, check_one, check_two, Bitwise, ConditionalError, OneOp,
    OpError, TwoOp,
};

fn op_info(op: &str, left: &VarType, right: &VarType) -> Vec<(&'static str, String)> {
    vec![
        ("op", op.to_string()),
        ("left", left.to_string()),
        ("right", right.to_string()),
    ]
}

fn arg_list(types: &[VarType]) -> String {
    types.iter().map(VarType::hash).collect::<Vec<_>>().join(",")
}

impl AnalyzeCtx<'_, '_> {
    /// Analyze one expression, counting it against the nesting limit.
    pub(crate) fn expr(&mut self, e: &Expr) -> Option<InstrId> {
        if !self.enter(e.span()) {
            return None;
        }
        let id = self.expr_kind(e);
        self.leave();
        id
    }

    fn expr_kind(&mut self, e: &Expr) -> Option<InstrId> {
        match e {
            Expr::Literal { value, span } => Some(self.literal(value, *span)),
            Expr::Id(id) => self.identifier(id),
            Expr::Binary { op, lhs, rhs, span } => self.binary(*op, lhs, rhs, *span),
            Expr::Logical { op, lhs, rhs, span } => self.logical(*op, lhs, rhs, *span),
            Expr::Assign { op, lhs, rhs, span } => self.assign(*op, lhs, rhs, *span),
            Expr::Unary { op, operand, span } => {
                let id = self.expr(operand)?;
                let ty = self.one_operand(OneOp::from(*op), op.symbol(), id, *span)?;
                Some(self.push_instr(InstrKind::Unary { op: *op, operand: id }, Some(ty), *span))
            }
            Expr::Postfix { op, operand, span } => {
                let id = self.expr(operand)?;
                let ty = self.one_operand(OneOp::from(*op), op.symbol(), id, *span)?;
                Some(self.push_instr(
                    InstrKind::PostfixIncDec { op: *op, operand: id },
                    Some(ty),
                    *span,
                ))
            }
            Expr::Index { base, index, span } => self.index(base, index, *span),
            Expr::Member { base, field, span } => self.member(base, field, *span),
            Expr::Call { callee, args, span } => self.call(callee, args, *span),
            Expr::Cast { ty, expr, span } => self.cast(ty, expr, *span),
            Expr::Conditional {
                cond,
                then,
                else_,
                span,
            } => self.conditional(cond, then, else_, *span),
            Expr::Compile { function, args, span } => self.compile(function, args, *span),
            Expr::SamplerState { states, span } => Some(self.sampler_state(states, *span)),
            Expr::Paren { expr, span } => {
                let inner = self.expr(expr)?;
                let ty = self.ty_of(inner);
                Some(self.push_instr(InstrKind::Complex { expr: inner }, Some(ty), *span))
            }
        }
    }

    fn literal(&mut self, value: &Literal, span: Span) -> InstrId {
        let base = match value {
            Literal::Int { .. } => self.sys.int(),
            Literal::Float { .. } => self.sys.float(),
            Literal::Bool { .. } => self.sys.bool(),
            Literal::String { .. } => self.sys.string(),
        };
        let ty = VarType::constant(base.base);
        self.push_instr(InstrKind::Literal(value.clone()), Some(ty), span)
    }

    fn identifier(&mut self, id: &Ident) -> Option<InstrId> {
        let Some(info) = self.scope.find_variable(&id.name) else {
            self.error(codes::E0111, id.span, vec![("name", id.name.clone())]);
            return None;
        };
        Some(self.push_instr(
            InstrKind::Id {
                name: id.name.clone(),
                decl: info.instr,
            },
            Some(info.ty.clone()),
            id.span,
        ))
    }

    /// Both operands are analyzed even when the first one fails.
    fn operands(&mut self, lhs: &Expr, rhs: &Expr) -> Option<(InstrId, InstrId)> {
        let l = self.expr(lhs);
        let r = self.expr(rhs);
        Some((l?, r?))
    }

    /// Every argument is analyzed; `None` if any of them was dropped.
    fn arguments(&mut self, args: &[Expr]) -> Option<Vec<InstrId>> {
        let ids: Vec<Option<InstrId>> = args.iter().map(|a| self.expr(a)).collect();
        ids.into_iter().collect()
    }

    // ── Operators ───────────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Option<InstrId> {
        let (l, r) = self.operands(lhs, rhs)?;
        let (lt, rt) = (self.ty_of(l), self.ty_of(r));
        if op.is_bitwise() {
            return match self.bitwise(TwoOp::Binary(op), (l, lhs), (r, rhs)) {
                Ok(ty) => Some(self.push_instr(InstrKind::Bitwise { op, lhs: l, rhs: r }, Some(ty), span)),
                Err(e) => {
                    self.error_with_hint(codes::E0222, span, op_info(op.symbol(), &lt, &rt), e.to_string());
                    None
                }
            };
        }
        let comparison = op.is_relational() || op.is_equality();
        match check_two(self.sys, TwoOp::Binary(op), &lt, &rt) {
            Ok(ty) => {
                let kind = if comparison {
                    InstrKind::Relational { op, lhs: l, rhs: r }
                } else {
                    InstrKind::Arithmetic { op, lhs: l, rhs: r }
                };
                Some(self.push_instr(kind, Some(ty), span))
            }
            Err(e) => {
                let code = if comparison { codes::E0204 } else { codes::E0201 };
                self.error_with_hint(code, span, op_info(op.symbol(), &lt, &rt), e.to_string());
                None
            }
        }
    }

    fn logical(&mut self, op: LogicalOp, lhs: &Expr, rhs: &Expr, span: Span) -> Option<InstrId> {
        let (l, r) = self.operands(lhs, rhs)?;
        let (lt, rt) = (self.ty_of(l), self.ty_of(r));
        match check_logical(self.sys, op, &lt, &rt) {
            Ok(ty) => Some(self.push_instr(InstrKind::Logical { op, lhs: l, rhs: r }, Some(ty), span)),
            Err(e) => {
                self.error_with_hint(codes::E0205, span, op_info(op.symbol(), &lt, &rt), e.to_string());
                None
            }
        }
    }

    fn assign(&mut self, op: AssignOp, lhs: &Expr, rhs: &Expr, span: Span) -> Option<InstrId> {
        let (l, r) = self.operands(lhs, rhs)?;
        let (lt, rt) = (self.ty_of(l), self.ty_of(r));
        let two = TwoOp::Assign(op);
        let checked = if two.is_bitwise() {
            self.bitwise(two, (l, lhs), (r, rhs))
        } else {
            check_two(self.sys, two, &lt, &rt)
        };
        match checked {
            Ok(ty) => Some(self.push_instr(InstrKind::Assignment { op, lhs: l, rhs: r }, Some(ty), span)),
            Err(e) => {
                let code = if op == AssignOp::Assign {
                    codes::E0202
                } else {
                    codes::E0203
                };
                self.error_with_hint(code, span, op_info(op.symbol(), &lt, &rt), e.to_string());
                None
            }
        }
    }

    /// Type a bitwise operation, warning once per bool operand promoted to int.
    fn bitwise(&mut self, op: TwoOp, left: (InstrId, &Expr), right: (InstrId, &Expr)) -> Result<VarType, OpError> {
        let (lt, rt) = (self.ty_of(left.0), self.ty_of(right.0));
        let Bitwise {
            ty,
            promoted_left,
            promoted_right,
        } = check_bitwise(self.sys, op, &lt, &rt)?;
        for (promoted, from, operand) in [(promoted_left, &lt, left.1), (promoted_right, &rt, right.1)] {
            if promoted {
                let to = self
                    .sys
                    .vector_of(ScalarKind::Int, from.base.length())
                    .map(|b| b.name.clone())
                    .unwrap_or_else(|| "int".to_string());
                let info = vec![("from", from.to_string()), ("to", to), ("op", op.symbol().to_string())];
                self.warning(codes::W0203, operand.span(), info);
            }
        }
        Ok(ty)
    }

    fn one_operand(&mut self, op: OneOp, symbol: &str, operand: InstrId, span: Span) -> Option<VarType> {
        let t = self.ty_of(operand);
        match check_one(self.sys, op, &t) {
            Ok(ty) => Some(ty),
            Err(e) => {
                let info = vec![("op", symbol.to_string()), ("operand", t.to_string())];
                self.error_with_hint(codes::E0206, span, info, e.to_string());
                None
            }
        }
    }

    fn conditional(&mut self, cond: &Expr, then: &Expr, else_: &Expr, span: Span) -> Option<InstrId> {
        let c = self.expr(cond);
        let t = self.expr(then);
        let e = self.expr(else_);
        let (c, t, e) = (c?, t?, e?);
        let (ct, tt, et) = (self.ty_of(c), self.ty_of(t), self.ty_of(e));
        match check_conditional(&ct, &tt, &et) {
            Ok(ty) => Some(self.push_instr(
                InstrKind::Conditional {
                    cond: c,
                    then: t,
                    else_: e,
                },
                Some(ty),
                span,
            )),
            Err(ConditionalError::ConditionNotBool) => {
                self.error(codes::E0207, cond.span(), vec![("found", ct.to_string())]);
                None
            }
            Err(ConditionalError::BranchesDiffer) => {
                let info = vec![("left", tt.to_string()), ("right", et.to_string())];
                self.error(codes::E0208, span, info);
                None
            }
        }
    }

    /// Casts target scalars, vectors and matrices; an inline struct target is
    /// rejected without being declared.
    fn cast(&mut self, ty: &UsageType, expr: &Expr, span: Span) -> Option<InstrId> {
        if let TypeRef::Struct(def) = &ty.ty {
            let operand = self.expr(expr)?;
            let info = vec![("from", self.ty_of(operand).to_string()), ("to", def.name.name.clone())];
            self.error(codes::E0209, span, info);
            return None;
        }
        let target = self.resolve_type(ty, &mut Vec::new());
        let operand = self.expr(expr);
        let (target, operand) = (target?, operand?);
        let from = self.ty_of(operand);
        if !(target.is_scalar() || target.is_vector() || target.is_matrix()) {
            let info = vec![("from", from.to_string()), ("to", target.to_string())];
            self.error(codes::E0209, span, info);
            return None;
        }
        if !from.readable() {
            self.error(codes::E0210, expr.span(), vec![("type", from.to_string())]);
            return None;
        }
        Some(self.push_instr(
            InstrKind::Cast { operand },
            Some(target.plain().read_only()),
            span,
        ))
    }

    // ── Postfix ─────────────────────────────────────────────────────────

    fn index(&mut self, base: &Expr, index: &Expr, span: Span) -> Option<InstrId> {
        let (b, i) = self.operands(base, index)?;
        let bt = self.ty_of(b);
        let Some(element) = bt.element() else {
            self.error(codes::E0212, base.span(), vec![("type", bt.to_string())]);
            return None;
        };
        let it = self.ty_of(i);
        if !it.is_exactly("int") {
            self.error(codes::E0213, index.span(), vec![("found", it.to_string())]);
            return None;
        }
        Some(self.push_instr(InstrKind::PostfixIndex { base: b, index: i }, Some(element), span))
    }

    /// `.field` on a struct, or a swizzle on a vector. The result inherits
    /// the base's readability and writability.
    fn member(&mut self, base: &Expr, field: &Ident, span: Span) -> Option<InstrId> {
        let b = self.expr(base)?;
        let bt = self.ty_of(b);
        let name = &field.name;
        let found = if bt.is_array() {
            None
        } else if bt.is_complex() {
            bt.base.field(name).map(|f| f.ty.clone())
        } else if bt.base.is_vector() {
            self.sys
                .swizzle_type(&bt.base, name)
                .map(|(t, writable)| if writable { t } else { t.read_only() })
        } else {
            None
        };
        let Some(mut ty) = found else {
            let info = vec![("type", bt.to_string()), ("field", name.clone())];
            self.error(codes::E0214, field.span, info);
            return None;
        };
        if !bt.writable() {
            ty = ty.read_only();
        }
        if !bt.readable() {
            ty = ty.write_only();
        }
        Some(self.push_instr(
            InstrKind::PostfixPoint {
                base: b,
                field: name.clone(),
            },
            Some(ty),
            span,
        ))
    }

    // ── Calls ───────────────────────────────────────────────────────────

    /// A callee naming a visible type is a constructor; anything else goes
    /// through overload resolution.
    fn call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> Option<InstrId> {
        if let Some(base) = self.scope.find_type(&callee.name) {
            return self.constructor(base, callee, args, span);
        }
        let ids = self.arguments(args)?;
        let types: Vec<VarType> = ids.iter().map(|&id| self.ty_of(id)).collect();
        let sig = match self.scope.find_function(&callee.name, &types) {
            FunctionLookup::Found(sig) => sig,
            FunctionLookup::NotFound => {
                let info = vec![("name", callee.name.clone())];
                if self.scope.has_function_named(&callee.name) {
                    let hint = format!("no overload takes ({})", arg_list(&types));
                    self.error_with_hint(codes::E0215, callee.span, info, hint);
                } else {
                    self.error(codes::E0215, callee.span, info);
                }
                return None;
            }
            FunctionLookup::Ambiguous => {
                let hint = format!("several overloads take ({})", arg_list(&types));
                self.error_with_hint(codes::E0216, callee.span, vec![("name", callee.name.clone())], hint);
                return None;
            }
        };

        let mut ok = true;
        for ((arg, ty), param) in args.iter().zip(&types).zip(&sig.params) {
            let writes = param.ty.has_usage(Usage::Out) || param.ty.has_usage(Usage::Inout);
            let reads = !param.ty.has_usage(Usage::Out);
            if writes && !ty.writable() {
                self.error(codes::E0211, arg.span(), vec![("type", ty.to_string())]);
                ok = false;
            } else if reads && !ty.readable() {
                self.error(codes::E0210, arg.span(), vec![("type", ty.to_string())]);
                ok = false;
            }
        }
        if !ok {
            return None;
        }
        let ty = sig.return_type.plain().read_only();
        Some(self.push_instr(InstrKind::FunctionCall { sig, args: ids }, Some(ty), span))
    }

    /// Argument shapes are not matched against the constructed type.
    fn constructor(&mut self, base: Arc<BaseType>, callee: &Ident, args: &[Expr], span: Span) -> Option<InstrId> {
        let ids = self.arguments(args)?;
        if base.is_void() || base.is_sampler() {
            self.error_with_hint(
                codes::E0217,
                callee.span,
                vec![("name", callee.name.clone())],
                "void and sampler types have no constructor",
            );
            return None;
        }
        let mut ok = true;
        for (&id, arg) in ids.iter().zip(args) {
            let ty = self.ty_of(id);
            if !ty.readable() {
                self.error(codes::E0210, arg.span(), vec![("type", ty.to_string())]);
                ok = false;
            }
        }
        if !ok {
            return None;
        }
        Some(self.push_instr(
            InstrKind::ConstructorCall { args: ids },
            Some(VarType::new(base).read_only()),
            span,
        ))
    }

    /// `compile f(args)`: resolved in the global scope, with `args` bound to
    /// the uniform parameters.
    fn compile(&mut self, function: &Ident, args: &[Expr], span: Span) -> Option<InstrId> {
        let ids = self.arguments(args)?;
        let types: Vec<VarType> = ids.iter().map(|&id| self.ty_of(id)).collect();
        match self.scope.find_shader_function(&function.name, &types) {
            FunctionLookup::Found(sig) => {
                let ty = sig.return_type.plain().read_only();
                Some(self.push_instr(InstrKind::Compile { sig, args: ids }, Some(ty), span))
            }
            FunctionLookup::NotFound => {
                self.error(codes::E0218, function.span, vec![("name", function.name.clone())]);
                None
            }
            FunctionLookup::Ambiguous => {
                self.error(codes::E0216, function.span, vec![("name", function.name.clone())]);
                None
            }
        }
    }

    // ── Sampler state ───────────────────────────────────────────────────

    fn sampler_state(&mut self, states: &[PassState], span: Span) -> InstrId {
        let mut out = SamplerStates::default();
        for st in states {
            let name = &st.name.name;
            if st.index.is_some() {
                self.error(codes::E0220, st.span, vec![("name", name.clone())]);
                continue;
            }
            match parse_entry(name, &st.value) {
                Ok(SamplerEntry::Texture(tex)) => {
                    if self.scope.find_variable(&tex).is_none() {
                        self.error(codes::E0219, st.value.span(), vec![("name", tex)]);
                        continue;
                    }
                    out.apply(SamplerEntry::Texture(tex));
                }
                Ok(entry) => out.apply(entry),
                Err(SamplerError::UnknownState(state)) => {
                    self.dropped_state(codes::W0201, st.span, vec![("name", state)]);
                }
                Err(SamplerError::UnsupportedValue { state, value }) => {
                    self.dropped_state(codes::W0202, st.span, vec![("value", value), ("name", state)]);
                }
                Err(e @ SamplerError::BadTexture) => {
                    let info = vec![("name", "{...}".to_string())];
                    self.error_with_hint(codes::E0219, st.value.span(), info, e.to_string());
                }
            }
        }
        let ty = self.sys.find_type("sampler").map(VarType::new);
        self.push_instr(InstrKind::SamplerState { states: out }, ty, span)
    }
}
