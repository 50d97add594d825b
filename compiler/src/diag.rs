// diag.rs — Deferred diagnostics model
//
// Provides the shared diagnostic types used across all analysis phases.
// Entries store a stable code plus structured key/value info; the human text
// is rendered from the per-code template registry only when a report is
// requested.
//
// Preconditions: none.
// Postconditions: `Diagnostics::resolve` renders every recorded entry exactly once.
// Failure modes: none (a missing template key renders as `{key}` verbatim).
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0215`, `W0401`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DiagCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // Declarations and scope
    pub const E0101: DiagCode = DiagCode("E0101"); // variable redefinition
    pub const E0102: DiagCode = DiagCode("E0102"); // system variable redefinition
    pub const E0103: DiagCode = DiagCode("E0103"); // struct field redefinition
    pub const E0104: DiagCode = DiagCode("E0104"); // annotation variable redefinition
    pub const E0105: DiagCode = DiagCode("E0105"); // type redefinition
    pub const E0106: DiagCode = DiagCode("E0106"); // system type redefinition
    pub const E0107: DiagCode = DiagCode("E0107"); // function redefinition
    pub const E0108: DiagCode = DiagCode("E0108"); // function return type differs from declaration
    pub const E0109: DiagCode = DiagCode("E0109"); // technique redefinition
    pub const E0110: DiagCode = DiagCode("E0110"); // imported component not found
    pub const E0111: DiagCode = DiagCode("E0111"); // unknown variable
    pub const E0112: DiagCode = DiagCode("E0112"); // unknown type
    pub const E0113: DiagCode = DiagCode("E0113"); // vector<>/matrix<> type syntax
    pub const E0114: DiagCode = DiagCode("E0114"); // invalid initializer
    pub const E0115: DiagCode = DiagCode("E0115"); // invalid array dimension
    pub const E0116: DiagCode = DiagCode("E0116"); // builtin function redefinition
    pub const E0117: DiagCode = DiagCode("E0117"); // parameter needs default value
    pub const E0118: DiagCode = DiagCode("E0118"); // typedef with usage qualifiers

    // Expressions and types
    pub const E0201: DiagCode = DiagCode("E0201"); // invalid arithmetic operation
    pub const E0202: DiagCode = DiagCode("E0202"); // invalid assignment
    pub const E0203: DiagCode = DiagCode("E0203"); // invalid compound assignment
    pub const E0204: DiagCode = DiagCode("E0204"); // invalid relational operation
    pub const E0205: DiagCode = DiagCode("E0205"); // invalid logical operation
    pub const E0206: DiagCode = DiagCode("E0206"); // invalid unary operation
    pub const E0207: DiagCode = DiagCode("E0207"); // conditional needs bool
    pub const E0208: DiagCode = DiagCode("E0208"); // conditional branch types differ
    pub const E0209: DiagCode = DiagCode("E0209"); // invalid cast
    pub const E0210: DiagCode = DiagCode("E0210"); // not readable
    pub const E0211: DiagCode = DiagCode("E0211"); // not writable
    pub const E0212: DiagCode = DiagCode("E0212"); // index on non-array
    pub const E0213: DiagCode = DiagCode("E0213"); // index not int
    pub const E0214: DiagCode = DiagCode("E0214"); // unknown field
    pub const E0215: DiagCode = DiagCode("E0215"); // not a function
    pub const E0216: DiagCode = DiagCode("E0216"); // ambiguous call
    pub const E0217: DiagCode = DiagCode("E0217"); // constructor target not a type
    pub const E0218: DiagCode = DiagCode("E0218"); // compile target not a function
    pub const E0219: DiagCode = DiagCode("E0219"); // sampler texture unknown
    pub const E0220: DiagCode = DiagCode("E0220"); // indexed state unsupported
    pub const E0221: DiagCode = DiagCode("E0221"); // invalid function return type
    pub const E0222: DiagCode = DiagCode("E0222"); // invalid bitwise operation

    // Statements and functions
    pub const E0301: DiagCode = DiagCode("E0301"); // void return expected
    pub const E0302: DiagCode = DiagCode("E0302"); // empty return in non-void function
    pub const E0303: DiagCode = DiagCode("E0303"); // return type mismatch
    pub const E0304: DiagCode = DiagCode("E0304"); // missing return
    pub const E0305: DiagCode = DiagCode("E0305"); // unreachable code
    pub const E0306: DiagCode = DiagCode("E0306"); // if condition not bool
    pub const E0307: DiagCode = DiagCode("E0307"); // while condition not bool
    pub const E0308: DiagCode = DiagCode("E0308"); // do-while condition not bool
    pub const E0309: DiagCode = DiagCode("E0309"); // for condition not bool

    // Effects, techniques and entry points
    pub const E0401: DiagCode = DiagCode("E0401"); // invalid vertex entry point
    pub const E0402: DiagCode = DiagCode("E0402"); // invalid pixel entry point
    pub const E0403: DiagCode = DiagCode("E0403"); // function used in both stages
    pub const E0404: DiagCode = DiagCode("E0404"); // builtin unavailable in stage
    pub const E0405: DiagCode = DiagCode("E0405"); // invalid particle routine
    pub const E0406: DiagCode = DiagCode("E0406"); // particle vertex shader params mismatch

    // Warnings
    pub const W0101: DiagCode = DiagCode("W0101"); // module name overridden
    pub const W0102: DiagCode = DiagCode("W0102"); // cbuffer bound to a non-b register
    pub const W0103: DiagCode = DiagCode("W0103"); // empty declaration
    pub const W0201: DiagCode = DiagCode("W0201"); // unsupported sampler state
    pub const W0202: DiagCode = DiagCode("W0202"); // unsupported sampler state value
    pub const W0203: DiagCode = DiagCode("W0203"); // implicit bool to int conversion
    pub const W0401: DiagCode = DiagCode("W0401"); // unsupported render state
    pub const W0402: DiagCode = DiagCode("W0402"); // unsupported render state value
    pub const W0403: DiagCode = DiagCode("W0403"); // malformed state block
    pub const W0404: DiagCode = DiagCode("W0404"); // incomplete pass
    pub const W0405: DiagCode = DiagCode("W0405"); // incomplete technique

    // Critical
    pub const C0001: DiagCode = DiagCode("C0001"); // nesting too deep
}

/// Message template for a code. `{key}` placeholders are filled from the
/// diagnostic's info pairs at report time.
pub fn template(code: DiagCode) -> &'static str {
    match code.0 {
        "E0101" => "variable '{name}' is already defined in this scope",
        "E0102" => "variable '{name}' collides with a system variable",
        "E0103" => "field '{name}' is already defined in struct",
        "E0104" => "annotation variable '{name}' is already defined",
        "E0105" => "type '{name}' is already defined in this scope",
        "E0106" => "type '{name}' collides with a system type",
        "E0107" => "function '{name}' is already defined",
        "E0108" => "function '{name}' was declared with return type '{expected}', not '{found}'",
        "E0109" => "technique '{name}' is already defined",
        "E0110" => "imported component '{name}' does not exist",
        "E0111" => "unknown variable '{name}'",
        "E0112" => "'{name}' is not a type",
        "E0113" => "vector<...> and matrix<...> type syntax is not supported",
        "E0114" => "invalid initializer for variable '{name}'",
        "E0115" => "invalid array dimension for '{name}': {reason}",
        "E0116" => "function '{name}' collides with a builtin function",
        "E0117" => "parameter '{name}' of function '{func}' needs a default value",
        "E0118" => "typedef '{name}' cannot carry usage qualifiers",
        "E0201" => "invalid operation '{op}' between '{left}' and '{right}'",
        "E0202" => "invalid assignment '{op}' from '{right}' to '{left}'",
        "E0203" => "invalid compound assignment '{op}' between '{left}' and '{right}'",
        "E0204" => "invalid relational operation '{op}' between '{left}' and '{right}'",
        "E0205" => "invalid logical operation '{op}' between '{left}' and '{right}'",
        "E0206" => "invalid unary operation '{op}' on '{operand}'",
        "E0207" => "conditional expression needs a 'bool' condition, found '{found}'",
        "E0208" => "conditional branches have different types '{left}' and '{right}'",
        "E0209" => "cannot cast '{from}' to '{to}'",
        "E0210" => "value of type '{type}' cannot be read",
        "E0211" => "value of type '{type}' cannot be written",
        "E0212" => "indexed expression of type '{type}' is not an array",
        "E0213" => "array index must be 'int', found '{found}'",
        "E0214" => "type '{type}' has no field '{field}'",
        "E0215" => "'{name}' is not a function",
        "E0216" => "cannot choose between overloads of '{name}'",
        "E0217" => "'{name}' is not a type and cannot be constructed",
        "E0218" => "'{name}' is not a function that can be compiled",
        "E0219" => "sampler texture '{name}' is not a known variable",
        "E0220" => "indexed state '{name}' is not supported",
        "E0221" => "function '{name}' cannot return '{type}'",
        "E0222" => "invalid bitwise operation '{op}' between '{left}' and '{right}'",
        "E0301" => "Invalid return statement. Expression with 'void' type expected.",
        "E0302" => "Invalid return statement. Expression with '{expected}' type expected.",
        "E0303" => "Invalid return statement. Expected '{expected}', found '{found}'.",
        "E0304" => "function '{name}' has no return statement",
        "E0305" => "unreachable code",
        "E0306" => "if condition must be 'bool', found '{found}'",
        "E0307" => "while condition must be 'bool', found '{found}'",
        "E0308" => "do-while condition must be 'bool', found '{found}'",
        "E0309" => "for condition must be 'bool', found '{found}'",
        "E0401" => "function '{name}' cannot be used as a vertex shader",
        "E0402" => "function '{name}' cannot be used as a pixel shader",
        "E0403" => "function '{name}' is used as both vertex and pixel shader",
        "E0404" => "function '{name}' calls '{callee}', which is unavailable in {stage} shaders",
        "E0405" => "function '{name}' is not a valid {routine}",
        "E0406" => "vertex shader '{name}' must take the particle instance type '{type}'",
        "W0101" => "module name '{old}' is overridden by '{new}'",
        "W0102" => "cbuffer '{name}' is bound to '{register}'; constant buffers use 'b' registers",
        "W0103" => "empty declaration ';' is ignored",
        "W0201" => "unsupported sampler state '{name}' is ignored",
        "W0202" => "unsupported value '{value}' for sampler state '{name}' is ignored",
        "W0203" => "implicit conversion from '{from}' to '{to}' in '{op}'",
        "W0401" => "unsupported render state '{name}' is ignored",
        "W0402" => "unsupported value '{value}' for render state '{name}' is ignored",
        "W0403" => "malformed state block for '{name}': {reason}",
        "W0404" => "pass '{name}' is incomplete",
        "W0405" => "technique '{name}' is incomplete",
        "C0001" => "nesting deeper than {limit} levels; analysis aborted",
        _ => "unknown diagnostic",
    }
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
    Critical,
}

impl fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
            DiagLevel::Critical => "critical",
        })
    }
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A single recorded diagnostic. The message is not stored; see [`Diagnostic::message`].
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub level: DiagLevel,
    pub span: Option<Span>,
    pub info: Vec<(&'static str, String)>,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagLevel, code: DiagCode, span: Option<Span>) -> Self {
        Self {
            code,
            level,
            span,
            info: Vec::new(),
            hint: None,
        }
    }

    /// Attach one template argument.
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.info.push((key, value.into()));
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render the message from the code's template.
    pub fn message(&self) -> String {
        render(template(self.code), &self.info)
    }
}

fn render(template: &str, info: &[(&'static str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match info.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.level, self.code, self.message())?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Report ───────────────────────────────────────────────────────────────

/// A resolved, user-facing diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub code: DiagCode,
    pub level: DiagLevel,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{}:{}: ", self.file, span)?,
            None => write!(f, "{}: ", self.file)?,
        }
        write!(f, "{}[{}]: {}", self.level, self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Sink ─────────────────────────────────────────────────────────────────

/// Accumulates diagnostics for one analysis call.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    warnings_as_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record warnings at error level from now on.
    pub fn with_warnings_as_errors(mut self, on: bool) -> Self {
        self.warnings_as_errors = on;
        self
    }

    pub fn push(&mut self, mut diag: Diagnostic) {
        if self.warnings_as_errors && diag.level == DiagLevel::Warning {
            diag.level = DiagLevel::Error;
        }
        self.entries.push(diag);
    }

    pub fn error(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        let mut d = Diagnostic::new(DiagLevel::Error, code, Some(span));
        d.info = info;
        self.push(d);
    }

    pub fn warning(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        let mut d = Diagnostic::new(DiagLevel::Warning, code, Some(span));
        d.info = info;
        self.push(d);
    }

    pub fn critical(&mut self, code: DiagCode, span: Span, info: Vec<(&'static str, String)>) {
        let mut d = Diagnostic::new(DiagLevel::Critical, code, Some(span));
        d.info = info;
        self.push(d);
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| matches!(d.level, DiagLevel::Error | DiagLevel::Critical))
    }

    pub fn has_critical(&self) -> bool {
        self.entries.iter().any(|d| d.level == DiagLevel::Critical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Render all entries for `file`. Templates are consulted only here.
    pub fn resolve(&self, file: &str) -> Vec<ReportEntry> {
        self.entries
            .iter()
            .map(|d| ReportEntry {
                code: d.code,
                level: d.level,
                file: file.to_string(),
                span: d.span,
                message: d.message(),
                hint: d.hint.clone(),
            })
            .collect()
    }
}
