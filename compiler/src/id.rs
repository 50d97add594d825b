// id.rs — Stable identifiers for analysis artifacts
//
// Arena handles are dense u32 indices allocated in creation (source) order.
// Function identities are content-derived so they stay stable across runs
// and across separate analyses of the same source.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Handle of an IR node inside an `ir::Ir` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstrId(pub u32);

/// Handle of a scope inside a `scope::ProgramScope` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl InstrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deterministic function identity: 16 hex chars of SHA-256 over the
/// signature (origin, name, parameter type hashes, return type hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionId(pub String);

impl FunctionId {
    pub fn compute(origin: &str, name: &str, params: &[String], ret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(origin.as_bytes());
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                hasher.update(b",");
            }
            hasher.update(p.as_bytes());
        }
        hasher.update(b"\0");
        hasher.update(ret.as_bytes());
        let hash = hasher.finalize();
        // Truncate to first 8 bytes → 16 hex chars
        FunctionId(hash[..8].iter().map(|b| format!("{:02x}", b)).collect())
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocator for arena handles. Produces monotonically increasing IDs in
/// allocation (source) order, ensuring deterministic assignment.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_instr: u32,
    next_scope: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_instr(&mut self) -> InstrId {
        let id = InstrId(self.next_instr);
        self.next_instr += 1;
        id
    }

    pub fn alloc_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.next_scope);
        self.next_scope += 1;
        id
    }
}
