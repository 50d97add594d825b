// sampler.rs — sampler_state { ... } vocabulary
//
// Recognizes TEXTURE, ADDRESSU/V and MIN/MAGFILTER entries. Filter names are
// normalized to their GL spellings (POINT → NEAREST). The TEXTURE target is
// returned by name; resolving it against the scope is the analyzer's job.

use std::fmt;

use serde::Serialize;

use crate::ast::{Expr, StateValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressMode {
    Wrap,
    Clamp,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl AddressMode {
    pub fn name(self) -> &'static str {
        match self {
            AddressMode::Wrap => "WRAP",
            AddressMode::Clamp => "CLAMP",
            AddressMode::Mirror => "MIRROR",
        }
    }
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::Nearest => "NEAREST",
            Filter::Linear => "LINEAR",
            Filter::NearestMipmapNearest => "NEAREST_MIPMAP_NEAREST",
            Filter::LinearMipmapNearest => "LINEAR_MIPMAP_NEAREST",
            Filter::NearestMipmapLinear => "NEAREST_MIPMAP_LINEAR",
            Filter::LinearMipmapLinear => "LINEAR_MIPMAP_LINEAR",
        }
    }
}

/// One recognized sampler entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerEntry {
    Texture(String),
    AddressU(AddressMode),
    AddressV(AddressMode),
    MinFilter(Filter),
    MagFilter(Filter),
}

impl SamplerEntry {
    pub fn state_name(&self) -> &'static str {
        match self {
            SamplerEntry::Texture(_) => "TEXTURE",
            SamplerEntry::AddressU(_) => "ADDRESSU",
            SamplerEntry::AddressV(_) => "ADDRESSV",
            SamplerEntry::MinFilter(_) => "MINFILTER",
            SamplerEntry::MagFilter(_) => "MAGFILTER",
        }
    }

    pub fn value_name(&self) -> &str {
        match self {
            SamplerEntry::Texture(t) => t,
            SamplerEntry::AddressU(m) | SamplerEntry::AddressV(m) => m.name(),
            SamplerEntry::MinFilter(f) | SamplerEntry::MagFilter(f) => f.name(),
        }
    }
}

/// The accumulated state of one sampler_state block. Later entries win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamplerStates {
    pub texture: Option<String>,
    pub address_u: Option<AddressMode>,
    pub address_v: Option<AddressMode>,
    pub min_filter: Option<Filter>,
    pub mag_filter: Option<Filter>,
}

impl SamplerStates {
    pub fn apply(&mut self, entry: SamplerEntry) {
        match entry {
            SamplerEntry::Texture(t) => self.texture = Some(t),
            SamplerEntry::AddressU(m) => self.address_u = Some(m),
            SamplerEntry::AddressV(m) => self.address_v = Some(m),
            SamplerEntry::MinFilter(f) => self.min_filter = Some(f),
            SamplerEntry::MagFilter(f) => self.mag_filter = Some(f),
        }
    }

    /// `TEXTURE=tex ADDRESSU=WRAP ...` for the IR dump, set fields only.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(t) = &self.texture {
            parts.push(format!("TEXTURE={}", t));
        }
        if let Some(m) = self.address_u {
            parts.push(format!("ADDRESSU={}", m.name()));
        }
        if let Some(m) = self.address_v {
            parts.push(format!("ADDRESSV={}", m.name()));
        }
        if let Some(f) = self.min_filter {
            parts.push(format!("MINFILTER={}", f.name()));
        }
        if let Some(f) = self.mag_filter {
            parts.push(format!("MAGFILTER={}", f.name()));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    UnknownState(String),
    UnsupportedValue { state: String, value: String },
    /// TEXTURE needs a single name: `<tex>` or `tex`.
    BadTexture,
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::UnknownState(s) => write!(f, "unknown sampler state '{}'", s),
            SamplerError::UnsupportedValue { state, value } => {
                write!(f, "unsupported value '{}' for '{}'", value, state)
            }
            SamplerError::BadTexture => write!(f, "texture must be given by name"),
        }
    }
}

impl std::error::Error for SamplerError {}

pub fn parse_address(value: &str) -> Option<AddressMode> {
    match value {
        "WRAP" => Some(AddressMode::Wrap),
        "CLAMP" => Some(AddressMode::Clamp),
        "MIRROR" => Some(AddressMode::Mirror),
        _ => None,
    }
}

pub fn parse_filter(value: &str) -> Option<Filter> {
    match value {
        "POINT" | "NEAREST" => Some(Filter::Nearest),
        "LINEAR" => Some(Filter::Linear),
        "POINT_MIPMAP_POINT" | "NEAREST_MIPMAP_NEAREST" => Some(Filter::NearestMipmapNearest),
        "LINEAR_MIPMAP_POINT" | "LINEAR_MIPMAP_NEAREST" => Some(Filter::LinearMipmapNearest),
        "POINT_MIPMAP_LINEAR" | "NEAREST_MIPMAP_LINEAR" => Some(Filter::NearestMipmapLinear),
        "LINEAR_MIPMAP_LINEAR" => Some(Filter::LinearMipmapLinear),
        _ => None,
    }
}

fn single_token(value: &StateValue) -> Option<&str> {
    match value {
        StateValue::Token { value, .. } => Some(value.as_str()),
        StateValue::Expr { expr: Expr::Id(id) } => Some(id.name.as_str()),
        StateValue::List { .. } | StateValue::Expr { .. } => None,
    }
}

/// Parse one `NAME = value;` entry of a sampler_state block.
pub fn parse_entry(name: &str, value: &StateValue) -> Result<SamplerEntry, SamplerError> {
    let upper = name.to_ascii_uppercase();
    if upper == "TEXTURE" {
        return single_token(value)
            .map(|t| SamplerEntry::Texture(t.trim_start_matches('<').trim_end_matches('>').to_string()))
            .ok_or(SamplerError::BadTexture);
    }
    let raw = single_token(value).map(str::to_ascii_uppercase);
    let unsupported = |upper: &str, raw: Option<String>| SamplerError::UnsupportedValue {
        state: upper.to_string(),
        value: raw.unwrap_or_else(|| "{...}".to_string()),
    };
    match upper.as_str() {
        "ADDRESSU" | "ADDRESSV" => {
            let mode = match raw.as_deref().and_then(parse_address) {
                Some(m) => m,
                None => return Err(unsupported(&upper, raw)),
            };
            Ok(if upper == "ADDRESSU" {
                SamplerEntry::AddressU(mode)
            } else {
                SamplerEntry::AddressV(mode)
            })
        }
        "MINFILTER" | "MAGFILTER" => {
            let filter = match raw.as_deref().and_then(parse_filter) {
                Some(f) => f,
                None => return Err(unsupported(&upper, raw)),
            };
            Ok(if upper == "MINFILTER" {
                SamplerEntry::MinFilter(filter)
            } else {
                SamplerEntry::MagFilter(filter)
            })
        }
        _ => Err(SamplerError::UnknownState(upper)),
    }
}
