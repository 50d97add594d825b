// typing.rs — Operator typing rules
//
// Pure functions over `VarType`: given operand types and an operator, return
// the result type or the reason the combination is rejected. The analyzer
// maps each `OpError` to the diagnostic code of the expression kind.
//
// Preconditions: operand types are fully resolved.
// Postconditions: successful results are read-only; only lvalues are writable.
// Failure modes: `OpError`.
// Side effects: none.

use std::fmt;

use crate::ast::{AssignOp, BinaryOp, LogicalOp, PostfixOp, UnaryOp};
use crate::system_scope::SystemScope;
use crate::types::{ScalarKind, VarType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    /// Arrays, samplers, structs (outside `=`/`==`/`!=`) or `%`.
    Unsupported(&'static str),
    NotReadable,
    NotWritable,
    /// Operand shapes do not combine under this operator.
    Incompatible,
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::Unsupported(what) => write!(f, "{} not supported here", what),
            OpError::NotReadable => write!(f, "operand cannot be read"),
            OpError::NotWritable => write!(f, "target cannot be written"),
            OpError::Incompatible => write!(f, "operand types are incompatible"),
        }
    }
}

impl std::error::Error for OpError {}

/// Either side of a two-operand expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoOp {
    Binary(BinaryOp),
    Assign(AssignOp),
}

impl TwoOp {
    pub fn symbol(self) -> &'static str {
        match self {
            TwoOp::Binary(op) => op.symbol(),
            TwoOp::Assign(op) => op.symbol(),
        }
    }

    /// The binary operator applied, if any (`a += b` applies `+`).
    fn applied(self) -> Option<BinaryOp> {
        match self {
            TwoOp::Binary(op) => Some(op),
            TwoOp::Assign(op) => op.binary(),
        }
    }

    pub fn is_bitwise(self) -> bool {
        self.applied().is_some_and(BinaryOp::is_bitwise)
    }

    /// The arithmetic operator applied, for `+ - * / %` and their compound forms.
    fn arithmetic(self) -> Option<BinaryOp> {
        self.applied()
            .filter(|op| !op.is_relational() && !op.is_equality() && !op.is_bitwise())
    }
}

/// Prefix and postfix one-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneOp {
    Plus,
    Minus,
    Not,
    Inc,
    Dec,
}

impl From<UnaryOp> for OneOp {
    fn from(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Plus => OneOp::Plus,
            UnaryOp::Minus => OneOp::Minus,
            UnaryOp::Not => OneOp::Not,
            UnaryOp::PreInc => OneOp::Inc,
            UnaryOp::PreDec => OneOp::Dec,
        }
    }
}

impl From<PostfixOp> for OneOp {
    fn from(op: PostfixOp) -> Self {
        match op {
            PostfixOp::Inc => OneOp::Inc,
            PostfixOp::Dec => OneOp::Dec,
        }
    }
}

fn is_opaque(t: &VarType) -> bool {
    t.is_array() || t.base.is_sampler()
}

fn derived(t: &VarType) -> VarType {
    t.plain().read_only()
}

// ── Two operands ────────────────────────────────────────────────────────────

/// Readability of the operands and writability of an assignment target.
fn check_access(op: TwoOp, left: &VarType, right: &VarType) -> Result<(), OpError> {
    match op {
        TwoOp::Assign(a) => {
            if !left.writable() {
                return Err(OpError::NotWritable);
            }
            if a != AssignOp::Assign && !left.readable() {
                return Err(OpError::NotReadable);
            }
            if !right.readable() {
                return Err(OpError::NotReadable);
            }
        }
        TwoOp::Binary(_) => {
            if !left.readable() || !right.readable() {
                return Err(OpError::NotReadable);
            }
        }
    }
    Ok(())
}

/// Result type of `left op right` for arithmetic, bitwise, relational,
/// equality and assignment operators. An assignment only succeeds when the
/// value it stores has exactly the target's type.
pub fn check_two(sys: &SystemScope, op: TwoOp, left: &VarType, right: &VarType) -> Result<VarType, OpError> {
    if op.is_bitwise() {
        return check_bitwise(sys, op, left, right).map(|b| b.ty);
    }
    if is_opaque(left) || is_opaque(right) {
        return Err(OpError::Unsupported("arrays and samplers are"));
    }
    if matches!(op, TwoOp::Binary(BinaryOp::Rem) | TwoOp::Assign(AssignOp::RemAssign)) {
        return Err(OpError::Unsupported("'%' is"));
    }
    check_access(op, left, right)?;

    if left.is_complex() || right.is_complex() {
        return match op {
            TwoOp::Assign(AssignOp::Assign) if left.is_equal(right) => Ok(derived(left)),
            TwoOp::Binary(b)
                if b.is_equality()
                    && left.is_equal(right)
                    && !left.contains_array()
                    && !left.contains_sampler() =>
            {
                Ok(sys.bool().read_only())
            }
            _ => Err(OpError::Unsupported("struct operands are")),
        };
    }

    let arith = op.arithmetic();

    if left.is_equal(right) {
        return match (op, arith) {
            (_, Some(BinaryOp::Div)) if left.is_matrix() => Err(OpError::Incompatible),
            (_, Some(_)) => Ok(derived(left)),
            (TwoOp::Binary(b), None) if b.is_relational() => {
                if left.is_scalar() {
                    Ok(sys.bool().read_only())
                } else {
                    Err(OpError::Incompatible)
                }
            }
            (TwoOp::Binary(_), None) => Ok(sys.bool().read_only()),
            (TwoOp::Assign(_), None) => Ok(derived(left)),
        };
    }

    let arith = match arith {
        Some(a) => a,
        None => return Err(OpError::Incompatible),
    };
    let result = mixed_shape(arith, left, right)?;
    if matches!(op, TwoOp::Assign(_)) && !result.is_equal(left) {
        return Err(OpError::Incompatible);
    }
    Ok(result)
}

/// Arithmetic between operands of different types: scalar broadcast and
/// matrix/vector products.
fn mixed_shape(arith: BinaryOp, left: &VarType, right: &VarType) -> Result<VarType, OpError> {
    if left.is_bool_based() || right.is_bool_based() {
        return Err(OpError::Incompatible);
    }
    if left.is_float_based() != right.is_float_based() {
        return Err(OpError::Incompatible);
    }
    if left.is_scalar() {
        return Ok(derived(right));
    }
    if right.is_scalar() {
        return Ok(derived(left));
    }
    if arith == BinaryOp::Mul {
        if left.is_matrix() && right.is_vector() && left.base.length() == right.base.length() {
            return Ok(derived(right));
        }
        if left.is_vector() && right.is_matrix() && left.base.length() == right.base.length() {
            return Ok(derived(left));
        }
    }
    Err(OpError::Incompatible)
}

// ── Bitwise ─────────────────────────────────────────────────────────────────

/// A typed bitwise or shift expression. `promoted_*` is set when a bool
/// operand was converted to int of the same length.
#[derive(Debug, Clone)]
pub struct Bitwise {
    pub ty: VarType,
    pub promoted_left: bool,
    pub promoted_right: bool,
}

/// Int view of a bitwise operand: itself when int-based, the int scalar or
/// vector of equal length when bool-based.
fn int_operand(sys: &SystemScope, t: &VarType) -> Result<(VarType, bool), OpError> {
    if !(t.is_scalar() || t.is_vector()) {
        return Err(OpError::Incompatible);
    }
    if t.is_int_based() {
        return Ok((derived(t), false));
    }
    if t.is_bool_based() {
        let base = sys
            .vector_of(ScalarKind::Int, t.base.length())
            .ok_or(OpError::Incompatible)?;
        return Ok((VarType::new(base).read_only(), true));
    }
    Err(OpError::Incompatible)
}

/// `& | ^ << >>` and their compound assignments. Operands are int scalars or
/// vectors; bool operands are promoted to int. A scalar operand broadcasts to
/// the other side's vector.
pub fn check_bitwise(sys: &SystemScope, op: TwoOp, left: &VarType, right: &VarType) -> Result<Bitwise, OpError> {
    if left.is_complex() || right.is_complex() {
        return Err(OpError::Unsupported("struct operands are"));
    }
    if is_opaque(left) || is_opaque(right) {
        return Err(OpError::Unsupported("arrays and samplers are"));
    }
    check_access(op, left, right)?;

    let (l, promoted_left) = int_operand(sys, left)?;
    let (r, promoted_right) = int_operand(sys, right)?;
    let ty = if l.is_equal(&r) || r.is_scalar() {
        l
    } else if l.is_scalar() {
        r
    } else {
        return Err(OpError::Incompatible);
    };
    if matches!(op, TwoOp::Assign(_)) && !ty.is_equal(left) {
        return Err(OpError::Incompatible);
    }
    Ok(Bitwise {
        ty,
        promoted_left,
        promoted_right,
    })
}

// ── One operand ─────────────────────────────────────────────────────────────

pub fn check_one(sys: &SystemScope, op: OneOp, operand: &VarType) -> Result<VarType, OpError> {
    if operand.is_complex() {
        return Err(OpError::Unsupported("struct operands are"));
    }
    if is_opaque(operand) {
        return Err(OpError::Unsupported("arrays and samplers are"));
    }
    if !operand.readable() {
        return Err(OpError::NotReadable);
    }
    if matches!(op, OneOp::Inc | OneOp::Dec) && !operand.writable() {
        return Err(OpError::NotWritable);
    }
    if op == OneOp::Not {
        return if operand.is_exactly("bool") {
            Ok(sys.bool().read_only())
        } else {
            Err(OpError::Incompatible)
        };
    }
    if operand.is_bool_based() {
        return Err(OpError::Incompatible);
    }
    Ok(derived(operand))
}

// ── Logical and conditional ─────────────────────────────────────────────────

pub fn check_logical(sys: &SystemScope, _op: LogicalOp, left: &VarType, right: &VarType) -> Result<VarType, OpError> {
    if !left.is_exactly("bool") || !right.is_exactly("bool") {
        return Err(OpError::Incompatible);
    }
    if !left.readable() || !right.readable() {
        return Err(OpError::NotReadable);
    }
    Ok(sys.bool().read_only())
}

/// Why a `c ? a : b` expression is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalError {
    ConditionNotBool,
    BranchesDiffer,
}

pub fn check_conditional(cond: &VarType, then: &VarType, else_: &VarType) -> Result<VarType, ConditionalError> {
    if !cond.is_exactly("bool") {
        return Err(ConditionalError::ConditionNotBool);
    }
    if !then.is_equal(else_) {
        return Err(ConditionalError::BranchesDiffer);
    }
    Ok(then.clone().read_only())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Usage;
    use crate::system_scope::build_system_scope;
    use crate::types::ArrayLen;

    fn t(sys: &SystemScope, name: &str) -> VarType {
        VarType::new(sys.find_type(name).unwrap())
    }

    fn bin(op: BinaryOp) -> TwoOp {
        TwoOp::Binary(op)
    }

    fn assign(op: AssignOp) -> TwoOp {
        TwoOp::Assign(op)
    }

    /// Result type hash, or the rejection.
    fn two(sys: &SystemScope, op: TwoOp, l: &VarType, r: &VarType) -> Result<String, OpError> {
        check_two(sys, op, l, r).map(|t| t.hash())
    }

    #[test]
    fn same_type_arithmetic_keeps_type() {
        let sys = build_system_scope();
        let r = check_two(&sys, bin(BinaryOp::Add), &sys.float(), &sys.float()).unwrap();
        assert_eq!(r.hash(), "float");
        assert!(!r.writable());
    }

    #[test]
    fn scalar_broadcasts_to_vector() {
        let sys = build_system_scope();
        let f3 = t(&sys, "float3");
        assert_eq!(two(&sys, bin(BinaryOp::Mul), &sys.float(), &f3), Ok("float3".to_string()));
        assert_eq!(two(&sys, bin(BinaryOp::Sub), &f3, &sys.float()), Ok("float3".to_string()));
    }

    #[test]
    fn int_and_float_do_not_mix() {
        let sys = build_system_scope();
        assert_eq!(
            two(&sys, bin(BinaryOp::Add), &sys.int(), &t(&sys, "float2")),
            Err(OpError::Incompatible)
        );
    }

    #[test]
    fn remainder_is_rejected() {
        let sys = build_system_scope();
        assert!(matches!(
            check_two(&sys, bin(BinaryOp::Rem), &sys.int(), &sys.int()),
            Err(OpError::Unsupported(_))
        ));
        assert!(matches!(
            check_two(&sys, assign(AssignOp::RemAssign), &sys.int(), &sys.int()),
            Err(OpError::Unsupported(_))
        ));
    }

    #[test]
    fn matrix_vector_product() {
        let sys = build_system_scope();
        let m = t(&sys, "float4x4");
        let v = t(&sys, "float4");
        assert_eq!(two(&sys, bin(BinaryOp::Mul), &m, &v), Ok("float4".to_string()));
        assert_eq!(two(&sys, bin(BinaryOp::Mul), &v, &m), Ok("float4".to_string()));
        assert_eq!(
            two(&sys, bin(BinaryOp::Mul), &t(&sys, "float4x3"), &v),
            Err(OpError::Incompatible)
        );
        assert_eq!(two(&sys, bin(BinaryOp::Div), &m, &m), Err(OpError::Incompatible));
    }

    #[test]
    fn compound_assignment_keeps_target_type() {
        let sys = build_system_scope();
        let f3 = t(&sys, "float3");
        let m = t(&sys, "float4x4");
        let v = t(&sys, "float4");
        assert_eq!(
            two(&sys, assign(AssignOp::AddAssign), &f3, &sys.float()),
            Ok("float3".to_string())
        );
        assert_eq!(
            two(&sys, assign(AssignOp::AddAssign), &sys.float(), &f3),
            Err(OpError::Incompatible)
        );
        assert_eq!(two(&sys, assign(AssignOp::MulAssign), &m, &v), Err(OpError::Incompatible));
        assert_eq!(two(&sys, assign(AssignOp::MulAssign), &v, &m), Ok("float4".to_string()));
    }

    #[test]
    fn relational_needs_scalars() {
        let sys = build_system_scope();
        assert_eq!(two(&sys, bin(BinaryOp::Lt), &sys.float(), &sys.float()), Ok("bool".to_string()));
        let v = t(&sys, "float2");
        assert_eq!(two(&sys, bin(BinaryOp::Lt), &v, &v), Err(OpError::Incompatible));
        assert_eq!(two(&sys, bin(BinaryOp::Eq), &v, &v), Ok("bool".to_string()));
    }

    #[test]
    fn assignment_needs_writable_target() {
        let sys = build_system_scope();
        let u = sys.float().with_usage(Usage::Uniform);
        assert_eq!(
            two(&sys, assign(AssignOp::Assign), &u, &sys.float()),
            Err(OpError::NotWritable)
        );
        let out = sys.float().with_usage(Usage::Out);
        assert!(check_two(&sys, assign(AssignOp::Assign), &out, &sys.float()).is_ok());
        assert_eq!(
            two(&sys, assign(AssignOp::AddAssign), &out, &sys.float()),
            Err(OpError::NotReadable)
        );
        assert_eq!(
            two(&sys, assign(AssignOp::Assign), &sys.float(), &sys.int()),
            Err(OpError::Incompatible)
        );
    }

    #[test]
    fn struct_operands_allow_assign_and_equality() {
        let sys = build_system_scope();
        let s = VarType::new(std::sync::Arc::new(crate::types::BaseType::structure("S", vec![])));
        assert!(check_two(&sys, assign(AssignOp::Assign), &s, &s).is_ok());
        assert_eq!(two(&sys, bin(BinaryOp::Ne), &s, &s), Ok("bool".to_string()));
        assert!(check_two(&sys, bin(BinaryOp::Add), &s, &s).is_err());
    }

    #[test]
    fn arrays_are_opaque_to_operators() {
        let sys = build_system_scope();
        let arr = sys.float().with_dims(vec![ArrayLen::Fixed(2)]);
        assert!(matches!(
            check_two(&sys, bin(BinaryOp::Add), &arr, &arr),
            Err(OpError::Unsupported(_))
        ));
        assert!(matches!(check_one(&sys, OneOp::Minus, &arr), Err(OpError::Unsupported(_))));
    }

    #[test]
    fn bitwise_on_ints_broadcasts_scalars() {
        let sys = build_system_scope();
        let i2 = t(&sys, "int2");
        let b = check_bitwise(&sys, bin(BinaryOp::BitAnd), &i2, &sys.int()).unwrap();
        assert_eq!(b.ty.hash(), "int2");
        assert!(!b.promoted_left && !b.promoted_right);
        assert_eq!(two(&sys, bin(BinaryOp::Shl), &sys.int(), &i2), Ok("int2".to_string()));
        assert_eq!(
            two(&sys, bin(BinaryOp::BitOr), &i2, &t(&sys, "int3")),
            Err(OpError::Incompatible)
        );
    }

    #[test]
    fn bitwise_promotes_bool_and_rejects_float() {
        let sys = build_system_scope();
        let b = check_bitwise(&sys, bin(BinaryOp::BitXor), &sys.bool(), &sys.int()).unwrap();
        assert_eq!(b.ty.hash(), "int");
        assert!(b.promoted_left);
        assert!(!b.promoted_right);
        let b3 = check_bitwise(&sys, bin(BinaryOp::BitAnd), &t(&sys, "bool3"), &sys.int()).unwrap();
        assert_eq!(b3.ty.hash(), "int3");
        assert!(matches!(
            check_bitwise(&sys, bin(BinaryOp::Shr), &sys.float(), &sys.int()),
            Err(OpError::Incompatible)
        ));
    }

    #[test]
    fn bitwise_assignment_keeps_target_type() {
        let sys = build_system_scope();
        let i2 = t(&sys, "int2");
        assert_eq!(two(&sys, assign(AssignOp::OrAssign), &i2, &sys.int()), Ok("int2".to_string()));
        assert_eq!(
            two(&sys, assign(AssignOp::ShlAssign), &sys.int(), &i2),
            Err(OpError::Incompatible)
        );
        assert_eq!(
            two(&sys, assign(AssignOp::AndAssign), &sys.bool(), &sys.bool()),
            Err(OpError::Incompatible)
        );
        let c = sys.int().with_usage(Usage::Const);
        assert_eq!(
            two(&sys, assign(AssignOp::XorAssign), &c, &sys.int()),
            Err(OpError::NotWritable)
        );
    }

    #[test]
    fn one_operand_rules() {
        let sys = build_system_scope();
        let one = |op, t: &VarType| check_one(&sys, op, t).map(|t| t.hash());
        assert_eq!(one(OneOp::Not, &sys.bool()), Ok("bool".to_string()));
        assert_eq!(one(OneOp::Not, &sys.int()), Err(OpError::Incompatible));
        assert_eq!(one(OneOp::Minus, &sys.bool()), Err(OpError::Incompatible));
        assert_eq!(one(OneOp::Minus, &sys.float()), Ok("float".to_string()));
        let c = sys.int().with_usage(Usage::Const);
        assert_eq!(one(OneOp::Inc, &c), Err(OpError::NotWritable));
        assert_eq!(OneOp::from(PostfixOp::Dec), OneOp::Dec);
    }

    #[test]
    fn logical_and_conditional() {
        let sys = build_system_scope();
        assert!(check_logical(&sys, LogicalOp::And, &sys.bool(), &sys.bool()).is_ok());
        assert!(matches!(
            check_logical(&sys, LogicalOp::Or, &sys.bool(), &sys.int()),
            Err(OpError::Incompatible)
        ));
        assert!(matches!(
            check_conditional(&sys.int(), &sys.float(), &sys.float()),
            Err(ConditionalError::ConditionNotBool)
        ));
        assert!(matches!(
            check_conditional(&sys.bool(), &sys.float(), &sys.int()),
            Err(ConditionalError::BranchesDiffer)
        ));
        assert_eq!(check_conditional(&sys.bool(), &sys.int(), &sys.int()).unwrap().hash(), "int");
    }
}
