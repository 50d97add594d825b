// entry.rs — Vertex and pixel entry-point shape rules
//
// A function named in a pass's VertexShader/PixelShader state must have a
// return type and parameter list the pipeline can bind. These checks look
// only at the signature, never the body.
//
// Preconditions: the signature's types are resolved.
// Postconditions: none.
// Failure modes: `EntryError` naming the first violated rule.
// Side effects: none.

use std::fmt;

use crate::scope::{FunctionSig, ParamSig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryError {
    /// Return type is neither void, float4 nor a bindable struct.
    ReturnType,
    /// float4 return without the required semantic.
    ReturnSemantic(&'static str),
    /// Struct return with a field lacking a semantic, duplicate semantics,
    /// a sampler or a nested struct.
    ReturnStruct,
    /// The first varying parameter is a struct without unique semantics.
    ParamStruct,
    /// A varying parameter follows the varying struct parameter.
    ExtraParam,
    /// A varying parameter has no semantic.
    ParamSemantic,
    /// Pixel shaders cannot take varying samplers.
    SamplerParam,
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryError::ReturnType => write!(f, "return type must be void, float4 or a struct"),
            EntryError::ReturnSemantic(sem) => {
                write!(f, "float4 return value needs the '{}' semantic", sem)
            }
            EntryError::ReturnStruct => write!(
                f,
                "returned struct needs a unique semantic on every field and no samplers or nested structs"
            ),
            EntryError::ParamStruct => {
                write!(f, "varying struct parameter needs a unique semantic on every field")
            }
            EntryError::ExtraParam => {
                write!(f, "only uniform parameters may follow a varying struct parameter")
            }
            EntryError::ParamSemantic => write!(f, "every varying parameter needs a semantic"),
            EntryError::SamplerParam => write!(f, "samplers must be passed as uniform parameters"),
        }
    }
}

impl std::error::Error for EntryError {}

pub fn check_vertex_entry(sig: &FunctionSig) -> Result<(), EntryError> {
    let ret = &sig.return_type;
    if ret.is_void() {
        // nothing to bind
    } else if ret.is_complex() && !ret.is_array() {
        let base = &ret.base;
        if base.has_field_without_semantic()
            || !base.has_all_unique_semantics()
            || base.contains_sampler()
            || base.contains_struct()
        {
            return Err(EntryError::ReturnStruct);
        }
    } else if ret.is_exactly("float4") {
        if sig.semantic.as_deref() != Some("POSITION") {
            return Err(EntryError::ReturnSemantic("POSITION"));
        }
    } else {
        return Err(EntryError::ReturnType);
    }
    check_varying_params(&sig.params)
}

pub fn check_pixel_entry(sig: &FunctionSig) -> Result<(), EntryError> {
    let ret = &sig.return_type;
    if ret.is_exactly("float4") {
        if sig.semantic.as_deref() != Some("COLOR") {
            return Err(EntryError::ReturnSemantic("COLOR"));
        }
    } else if !ret.is_void() {
        return Err(EntryError::ReturnType);
    }
    if sig
        .params
        .iter()
        .any(|p| !p.ty.is_uniform() && p.ty.contains_sampler())
    {
        return Err(EntryError::SamplerParam);
    }
    check_varying_params(&sig.params)
}

/// The first varying parameter picks the convention: no semantic means all
/// varyings arrive in one struct, otherwise every varying has a semantic.
fn check_varying_params(params: &[ParamSig]) -> Result<(), EntryError> {
    let mut varying = params.iter().filter(|p| !p.ty.is_uniform());
    let first = match varying.next() {
        Some(p) => p,
        None => return Ok(()),
    };

    if first.semantic.is_none() {
        if !first.ty.is_complex() || first.ty.is_array() || !first.ty.base.has_all_unique_semantics() {
            return Err(EntryError::ParamStruct);
        }
        if varying.next().is_some() {
            return Err(EntryError::ExtraParam);
        }
        return Ok(());
    }

    for p in std::iter::once(first).chain(varying) {
        if p.ty.is_complex() {
            if !p.ty.base.has_all_unique_semantics() {
                return Err(EntryError::ParamStruct);
            }
        } else if p.semantic.is_none() {
            return Err(EntryError::ParamSemantic);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::{Span, Usage};
    use crate::scope::FunctionOrigin;
    use crate::system_scope::build_system_scope;
    use crate::types::{BaseType, Field, VarType};

    fn param(name: &str, ty: VarType, semantic: Option<&str>) -> ParamSig {
        ParamSig {
            name: name.into(),
            ty,
            semantic: semantic.map(String::from),
            has_default: false,
        }
    }

    fn sig(ret: VarType, semantic: Option<&str>, params: Vec<ParamSig>) -> FunctionSig {
        FunctionSig::new(
            "main",
            ret,
            params,
            semantic.map(String::from),
            FunctionOrigin::User {
                implemented: true,
                instr: None,
            },
            Span::default(),
        )
    }

    fn vs_out(sys: &crate::system_scope::SystemScope, semantics: &[Option<&str>]) -> VarType {
        let fields = semantics
            .iter()
            .enumerate()
            .map(|(i, s)| Field {
                name: format!("f{}", i),
                ty: sys.float4(),
                semantic: s.map(String::from),
            })
            .collect();
        VarType::new(Arc::new(BaseType::structure("VS_OUT", fields)))
    }

    #[test]
    fn vertex_float4_needs_position() {
        let sys = build_system_scope();
        assert!(check_vertex_entry(&sig(sys.float4(), Some("POSITION"), vec![])).is_ok());
        assert_eq!(
            check_vertex_entry(&sig(sys.float4(), None, vec![])),
            Err(EntryError::ReturnSemantic("POSITION"))
        );
        assert_eq!(
            check_vertex_entry(&sig(sys.float(), None, vec![])),
            Err(EntryError::ReturnType)
        );
    }

    #[test]
    fn vertex_struct_return_needs_unique_semantics() {
        let sys = build_system_scope();
        let ok = vs_out(&sys, &[Some("POSITION"), Some("TEXCOORD0")]);
        assert!(check_vertex_entry(&sig(ok, None, vec![])).is_ok());
        let dup = vs_out(&sys, &[Some("POSITION"), Some("POSITION")]);
        assert_eq!(check_vertex_entry(&sig(dup, None, vec![])), Err(EntryError::ReturnStruct));
        let missing = vs_out(&sys, &[Some("POSITION"), None]);
        assert_eq!(
            check_vertex_entry(&sig(missing, None, vec![])),
            Err(EntryError::ReturnStruct)
        );
    }

    #[test]
    fn pixel_float4_needs_color() {
        let sys = build_system_scope();
        assert!(check_pixel_entry(&sig(sys.float4(), Some("COLOR"), vec![])).is_ok());
        assert!(check_pixel_entry(&sig(sys.void(), None, vec![])).is_ok());
        assert_eq!(
            check_pixel_entry(&sig(sys.float4(), Some("POSITION"), vec![])),
            Err(EntryError::ReturnSemantic("COLOR"))
        );
    }

    #[test]
    fn params_by_semantic_or_by_struct() {
        let sys = build_system_scope();
        let by_sem = vec![
            param("pos", sys.float4(), Some("POSITION")),
            param("uv", sys.float4(), Some("TEXCOORD0")),
            param("k", sys.float().with_usage(Usage::Uniform), None),
        ];
        assert!(check_vertex_entry(&sig(sys.void(), None, by_sem)).is_ok());

        let missing = vec![
            param("pos", sys.float4(), Some("POSITION")),
            param("uv", sys.float4(), None),
        ];
        assert_eq!(
            check_vertex_entry(&sig(sys.void(), None, missing)),
            Err(EntryError::ParamSemantic)
        );

        let input = vs_out(&sys, &[Some("POSITION")]);
        let by_struct = vec![param("input", input.clone(), None)];
        assert!(check_vertex_entry(&sig(sys.void(), None, by_struct)).is_ok());

        let extra = vec![param("input", input, None), param("x", sys.float(), Some("X"))];
        assert_eq!(
            check_vertex_entry(&sig(sys.void(), None, extra)),
            Err(EntryError::ExtraParam)
        );

        let scalar = vec![param("x", sys.float(), None)];
        assert_eq!(
            check_vertex_entry(&sig(sys.void(), None, scalar)),
            Err(EntryError::ParamStruct)
        );
    }

    #[test]
    fn pixel_rejects_varying_sampler() {
        let sys = build_system_scope();
        let sampler = VarType::new(sys.find_type("sampler2D").unwrap());
        let varying = vec![param("s", sampler.clone(), Some("TEXCOORD0"))];
        assert_eq!(
            check_pixel_entry(&sig(sys.void(), None, varying)),
            Err(EntryError::SamplerParam)
        );
        let uniform = vec![param("s", sampler.with_usage(Usage::Uniform), None)];
        assert!(check_pixel_entry(&sig(sys.void(), None, uniform)).is_ok());
    }
}
