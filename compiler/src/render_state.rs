// render_state.rs — Pass render-state vocabulary
//
// Maps the `NAME = VALUE;` entries of a pass body onto a closed set of render
// states. Composite names (SRCBLEND, BLENDFUNC, BLENDEQUATIONSEPARATE, ...)
// expand into their color/alpha components. Names and values are
// case-insensitive.
//
// Preconditions: VertexShader/PixelShader entries are filtered out by the caller.
// Postconditions: a rejected entry leaves the state map untouched.
// Failure modes: `StateError` (reported as warnings, or errors in strict mode).
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ast::StateValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderState {
    BlendEnable,
    CullFaceEnable,
    ZEnable,
    ZWriteEnable,
    DitherEnable,
    ScissorTestEnable,
    StencilTestEnable,
    PolygonOffsetFillEnable,
    CullFace,
    FrontFace,
    SrcBlendColor,
    DestBlendColor,
    SrcBlendAlpha,
    DestBlendAlpha,
    BlendEquationColor,
    BlendEquationAlpha,
    ZFunc,
}

impl RenderState {
    pub fn name(self) -> &'static str {
        match self {
            RenderState::BlendEnable => "BLENDENABLE",
            RenderState::CullFaceEnable => "CULLFACEENABLE",
            RenderState::ZEnable => "ZENABLE",
            RenderState::ZWriteEnable => "ZWRITEENABLE",
            RenderState::DitherEnable => "DITHERENABLE",
            RenderState::ScissorTestEnable => "SCISSORTESTENABLE",
            RenderState::StencilTestEnable => "STENCILTESTENABLE",
            RenderState::PolygonOffsetFillEnable => "POLYGONOFFSETFILLENABLE",
            RenderState::CullFace => "CULLFACE",
            RenderState::FrontFace => "FRONTFACE",
            RenderState::SrcBlendColor => "SRCBLENDCOLOR",
            RenderState::DestBlendColor => "DESTBLENDCOLOR",
            RenderState::SrcBlendAlpha => "SRCBLENDALPHA",
            RenderState::DestBlendAlpha => "DESTBLENDALPHA",
            RenderState::BlendEquationColor => "BLENDEQUATIONCOLOR",
            RenderState::BlendEquationAlpha => "BLENDEQUATIONALPHA",
            RenderState::ZFunc => "ZFUNC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderStateValue {
    True,
    False,
    Front,
    Back,
    FrontAndBack,
    Cw,
    Ccw,
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    FuncAdd,
    FuncSubtract,
    FuncReverseSubtract,
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl RenderStateValue {
    pub fn name(self) -> &'static str {
        use RenderStateValue::*;
        match self {
            True => "TRUE",
            False => "FALSE",
            Front => "FRONT",
            Back => "BACK",
            FrontAndBack => "FRONT_AND_BACK",
            Cw => "CW",
            Ccw => "CCW",
            Zero => "ZERO",
            One => "ONE",
            SrcColor => "SRCCOLOR",
            InvSrcColor => "INVSRCCOLOR",
            SrcAlpha => "SRCALPHA",
            InvSrcAlpha => "INVSRCALPHA",
            DestAlpha => "DESTALPHA",
            InvDestAlpha => "INVDESTALPHA",
            DestColor => "DESTCOLOR",
            InvDestColor => "INVDESTCOLOR",
            SrcAlphaSat => "SRCALPHASAT",
            FuncAdd => "FUNCADD",
            FuncSubtract => "FUNCSUBTRACT",
            FuncReverseSubtract => "FUNCREVERSESUBTRACT",
            Never => "NEVER",
            Less => "LESS",
            Equal => "EQUAL",
            LessEqual => "LESSEQUAL",
            Greater => "GREATER",
            NotEqual => "NOTEQUAL",
            GreaterEqual => "GREATEREQUAL",
            Always => "ALWAYS",
        }
    }
}

/// Final state assignments of a pass, ordered for stable output.
pub type RenderStates = BTreeMap<RenderState, RenderStateValue>;

/// A state name as written, before expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateName {
    Direct(RenderState),
    SrcBlend,
    DestBlend,
    BlendFunc,
    BlendFuncSeparate,
    BlendEquation,
    BlendEquationSeparate,
    /// Recognized but not expressible on the target.
    AlphaBlendEnable,
    AlphaTestEnable,
}

/// Which value vocabulary a state accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Bool,
    Cull,
    Winding,
    BlendFactor,
    BlendEquation,
    Compare,
    Unsupported,
}

fn parse_name(name: &str) -> Option<StateName> {
    use RenderState as R;
    let n = match name {
        "BLENDENABLE" => StateName::Direct(R::BlendEnable),
        "CULLFACEENABLE" => StateName::Direct(R::CullFaceEnable),
        "ZENABLE" => StateName::Direct(R::ZEnable),
        "ZWRITEENABLE" => StateName::Direct(R::ZWriteEnable),
        "DITHERENABLE" => StateName::Direct(R::DitherEnable),
        "SCISSORTESTENABLE" => StateName::Direct(R::ScissorTestEnable),
        "STENCILTESTENABLE" => StateName::Direct(R::StencilTestEnable),
        "POLYGONOFFSETFILLENABLE" => StateName::Direct(R::PolygonOffsetFillEnable),
        "CULLFACE" => StateName::Direct(R::CullFace),
        "FRONTFACE" => StateName::Direct(R::FrontFace),
        "SRCBLENDCOLOR" => StateName::Direct(R::SrcBlendColor),
        "DESTBLENDCOLOR" => StateName::Direct(R::DestBlendColor),
        "SRCBLENDALPHA" => StateName::Direct(R::SrcBlendAlpha),
        "DESTBLENDALPHA" => StateName::Direct(R::DestBlendAlpha),
        "BLENDEQUATIONCOLOR" => StateName::Direct(R::BlendEquationColor),
        "BLENDEQUATIONALPHA" => StateName::Direct(R::BlendEquationAlpha),
        "ZFUNC" => StateName::Direct(R::ZFunc),
        "SRCBLEND" => StateName::SrcBlend,
        "DESTBLEND" => StateName::DestBlend,
        "BLENDFUNC" => StateName::BlendFunc,
        "BLENDFUNCSEPARATE" => StateName::BlendFuncSeparate,
        "BLENDEQUATION" => StateName::BlendEquation,
        "BLENDEQUATIONSEPARATE" => StateName::BlendEquationSeparate,
        "ALPHABLENDENABLE" => StateName::AlphaBlendEnable,
        "ALPHATESTENABLE" => StateName::AlphaTestEnable,
        _ => return None,
    };
    Some(n)
}

fn value_class(name: StateName) -> ValueClass {
    use RenderState as R;
    match name {
        StateName::Direct(
            R::BlendEnable
            | R::CullFaceEnable
            | R::ZEnable
            | R::ZWriteEnable
            | R::DitherEnable
            | R::ScissorTestEnable
            | R::StencilTestEnable
            | R::PolygonOffsetFillEnable,
        ) => ValueClass::Bool,
        StateName::Direct(R::CullFace) => ValueClass::Cull,
        StateName::Direct(R::FrontFace) => ValueClass::Winding,
        StateName::Direct(R::SrcBlendColor | R::DestBlendColor | R::SrcBlendAlpha | R::DestBlendAlpha)
        | StateName::SrcBlend
        | StateName::DestBlend
        | StateName::BlendFunc
        | StateName::BlendFuncSeparate => ValueClass::BlendFactor,
        StateName::Direct(R::BlendEquationColor | R::BlendEquationAlpha)
        | StateName::BlendEquation
        | StateName::BlendEquationSeparate => ValueClass::BlendEquation,
        StateName::Direct(R::ZFunc) => ValueClass::Compare,
        StateName::AlphaBlendEnable | StateName::AlphaTestEnable => ValueClass::Unsupported,
    }
}

fn parse_value(class: ValueClass, value: &str) -> Option<RenderStateValue> {
    use RenderStateValue::*;
    let v = match (class, value) {
        (ValueClass::Bool, "TRUE") => True,
        (ValueClass::Bool, "FALSE") => False,
        (ValueClass::Cull, "FRONT") => Front,
        (ValueClass::Cull, "BACK") => Back,
        (ValueClass::Cull, "FRONT_AND_BACK") => FrontAndBack,
        (ValueClass::Winding, "CW") => Cw,
        (ValueClass::Winding, "CCW") => Ccw,
        (ValueClass::BlendFactor, "ZERO") => Zero,
        (ValueClass::BlendFactor, "ONE") => One,
        (ValueClass::BlendFactor, "SRCCOLOR") => SrcColor,
        (ValueClass::BlendFactor, "INVSRCCOLOR") => InvSrcColor,
        (ValueClass::BlendFactor, "SRCALPHA") => SrcAlpha,
        (ValueClass::BlendFactor, "INVSRCALPHA") => InvSrcAlpha,
        (ValueClass::BlendFactor, "DESTALPHA") => DestAlpha,
        (ValueClass::BlendFactor, "INVDESTALPHA") => InvDestAlpha,
        (ValueClass::BlendFactor, "DESTCOLOR") => DestColor,
        (ValueClass::BlendFactor, "INVDESTCOLOR") => InvDestColor,
        (ValueClass::BlendFactor, "SRCALPHASAT") => SrcAlphaSat,
        (ValueClass::BlendEquation, "FUNCADD" | "ADD") => FuncAdd,
        (ValueClass::BlendEquation, "FUNCSUBTRACT" | "SUBTRACT") => FuncSubtract,
        (ValueClass::BlendEquation, "FUNCREVERSESUBTRACT" | "REVERSESUBTRACT") => FuncReverseSubtract,
        (ValueClass::Compare, "NEVER") => Never,
        (ValueClass::Compare, "LESS") => Less,
        (ValueClass::Compare, "EQUAL") => Equal,
        (ValueClass::Compare, "LESSEQUAL") => LessEqual,
        (ValueClass::Compare, "GREATER") => Greater,
        (ValueClass::Compare, "NOTEQUAL") => NotEqual,
        (ValueClass::Compare, "GREATEREQUAL") => GreaterEqual,
        (ValueClass::Compare, "ALWAYS") => Always,
        _ => return None,
    };
    Some(v)
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    UnknownState(String),
    UnsupportedValue { state: String, value: String },
    Malformed { state: String, reason: &'static str },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::UnknownState(name) => write!(f, "unknown render state '{}'", name),
            StateError::UnsupportedValue { state, value } => {
                write!(f, "unsupported value '{}' for '{}'", value, state)
            }
            StateError::Malformed { state, reason } => write!(f, "'{}': {}", state, reason),
        }
    }
}

impl std::error::Error for StateError {}

// ── Application ─────────────────────────────────────────────────────────────

/// Leaf tokens of a state value, uppercased. `None` for expression values.
fn tokens(value: &StateValue) -> Option<Vec<String>> {
    match value {
        StateValue::Token { value, .. } => Some(vec![value.to_ascii_uppercase()]),
        StateValue::List { items, .. } => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    StateValue::Token { value, .. } => out.push(value.to_ascii_uppercase()),
                    StateValue::List { .. } | StateValue::Expr { .. } => return None,
                }
            }
            Some(out)
        }
        StateValue::Expr { .. } => None,
    }
}

/// Apply one `name = value` entry to `states`.
pub fn apply_state(states: &mut RenderStates, name: &str, value: &StateValue) -> Result<(), StateError> {
    let upper = name.to_ascii_uppercase();
    let parsed = parse_name(&upper).ok_or_else(|| StateError::UnknownState(upper.clone()))?;
    let class = value_class(parsed);
    let values = tokens(value).ok_or_else(|| StateError::Malformed {
        state: upper.clone(),
        reason: "expected a value token or a list of value tokens",
    })?;
    if values.is_empty() {
        return Err(StateError::Malformed {
            state: upper,
            reason: "empty value list",
        });
    }

    let mut resolved = Vec::with_capacity(values.len());
    for v in &values {
        match parse_value(class, v) {
            Some(rv) => resolved.push(rv),
            None => {
                return Err(StateError::UnsupportedValue {
                    state: upper,
                    value: v.clone(),
                })
            }
        }
    }

    use RenderState as R;
    let arity = |n: usize, upper: &str| -> Result<(), StateError> {
        if resolved.len() == n {
            Ok(())
        } else if n == 1 {
            Err(StateError::Malformed {
                state: upper.to_string(),
                reason: "expected a single value",
            })
        } else {
            Err(StateError::Malformed {
                state: upper.to_string(),
                reason: if n == 2 { "expected two values" } else { "expected four values" },
            })
        }
    };

    match parsed {
        StateName::BlendFunc => {
            arity(2, &upper)?;
            states.insert(R::SrcBlendColor, resolved[0]);
            states.insert(R::SrcBlendAlpha, resolved[0]);
            states.insert(R::DestBlendColor, resolved[1]);
            states.insert(R::DestBlendAlpha, resolved[1]);
        }
        StateName::BlendFuncSeparate => {
            arity(4, &upper)?;
            states.insert(R::SrcBlendColor, resolved[0]);
            states.insert(R::DestBlendColor, resolved[1]);
            states.insert(R::SrcBlendAlpha, resolved[2]);
            states.insert(R::DestBlendAlpha, resolved[3]);
        }
        StateName::BlendEquationSeparate => {
            arity(2, &upper)?;
            states.insert(R::BlendEquationColor, resolved[0]);
            states.insert(R::BlendEquationAlpha, resolved[1]);
        }
        StateName::SrcBlend => {
            arity(1, &upper)?;
            states.insert(R::SrcBlendColor, resolved[0]);
            states.insert(R::SrcBlendAlpha, resolved[0]);
        }
        StateName::DestBlend => {
            arity(1, &upper)?;
            states.insert(R::DestBlendColor, resolved[0]);
            states.insert(R::DestBlendAlpha, resolved[0]);
        }
        StateName::BlendEquation => {
            arity(1, &upper)?;
            states.insert(R::BlendEquationColor, resolved[0]);
            states.insert(R::BlendEquationAlpha, resolved[0]);
        }
        StateName::Direct(state) => {
            arity(1, &upper)?;
            states.insert(state, resolved[0]);
        }
        // unreachable: parse_value rejects every value for these
        StateName::AlphaBlendEnable | StateName::AlphaTestEnable => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder as b;

    #[test]
    fn simple_state_is_case_insensitive() {
        let mut s = RenderStates::new();
        apply_state(&mut s, "zWriteEnable", &b::token("false")).unwrap();
        assert_eq!(s.get(&RenderState::ZWriteEnable), Some(&RenderStateValue::False));
    }

    #[test]
    fn blendfunc_expands_to_color_and_alpha() {
        let mut s = RenderStates::new();
        apply_state(&mut s, "BLENDFUNC", &b::tokens(&["SRCALPHA", "INVSRCALPHA"])).unwrap();
        assert_eq!(s.get(&RenderState::SrcBlendColor), Some(&RenderStateValue::SrcAlpha));
        assert_eq!(s.get(&RenderState::SrcBlendAlpha), Some(&RenderStateValue::SrcAlpha));
        assert_eq!(s.get(&RenderState::DestBlendColor), Some(&RenderStateValue::InvSrcAlpha));
        assert_eq!(s.get(&RenderState::DestBlendAlpha), Some(&RenderStateValue::InvSrcAlpha));
    }

    #[test]
    fn blendfunc_separate_orders_components() {
        let mut s = RenderStates::new();
        apply_state(
            &mut s,
            "BLENDFUNCSEPARATE",
            &b::tokens(&["ONE", "ZERO", "SRCALPHA", "DESTALPHA"]),
        )
        .unwrap();
        assert_eq!(s.get(&RenderState::SrcBlendColor), Some(&RenderStateValue::One));
        assert_eq!(s.get(&RenderState::DestBlendColor), Some(&RenderStateValue::Zero));
        assert_eq!(s.get(&RenderState::SrcBlendAlpha), Some(&RenderStateValue::SrcAlpha));
        assert_eq!(s.get(&RenderState::DestBlendAlpha), Some(&RenderStateValue::DestAlpha));
    }

    #[test]
    fn equation_aliases() {
        let mut s = RenderStates::new();
        apply_state(&mut s, "BLENDEQUATION", &b::token("SUBTRACT")).unwrap();
        assert_eq!(s.get(&RenderState::BlendEquationColor), Some(&RenderStateValue::FuncSubtract));
        assert_eq!(s.get(&RenderState::BlendEquationAlpha), Some(&RenderStateValue::FuncSubtract));
        apply_state(&mut s, "BLENDEQUATIONSEPARATE", &b::tokens(&["ADD", "REVERSESUBTRACT"])).unwrap();
        assert_eq!(s.get(&RenderState::BlendEquationColor), Some(&RenderStateValue::FuncAdd));
        assert_eq!(
            s.get(&RenderState::BlendEquationAlpha),
            Some(&RenderStateValue::FuncReverseSubtract)
        );
    }

    #[test]
    fn single_item_list_is_a_single_value() {
        let mut s = RenderStates::new();
        apply_state(&mut s, "CULLFACE", &b::tokens(&["FRONT_AND_BACK"])).unwrap();
        assert_eq!(s.get(&RenderState::CullFace), Some(&RenderStateValue::FrontAndBack));
    }

    #[test]
    fn rejections_leave_states_untouched() {
        let mut s = RenderStates::new();
        assert_eq!(
            apply_state(&mut s, "FOG", &b::token("TRUE")),
            Err(StateError::UnknownState("FOG".into()))
        );
        assert_eq!(
            apply_state(&mut s, "ZFUNC", &b::token("SOMETIMES")),
            Err(StateError::UnsupportedValue {
                state: "ZFUNC".into(),
                value: "SOMETIMES".into()
            })
        );
        assert!(matches!(
            apply_state(&mut s, "ALPHABLENDENABLE", &b::token("TRUE")),
            Err(StateError::UnsupportedValue { .. })
        ));
        assert!(matches!(
            apply_state(&mut s, "BLENDFUNC", &b::tokens(&["ONE"])),
            Err(StateError::Malformed { .. })
        ));
        assert!(matches!(
            apply_state(&mut s, "ZENABLE", &b::tokens(&["TRUE", "FALSE"])),
            Err(StateError::Malformed { .. })
        ));
        assert!(s.is_empty());
    }
}
