// fxc — Effect compiler front-end
//
// Library root. Semantic analysis of effect and particle-effect parse trees:
// the system scope bootstrap, the type model, scoped symbol tables, the IR
// graph, and the analyzer passes that build it.

pub mod analyze;
pub mod ast;
pub mod builder;
pub mod classify;
pub mod diag;
mod effect;
pub mod entry;
mod expr;
pub mod id;
pub mod ir;
pub mod render_state;
pub mod sampler;
pub mod scope;
mod stmt;
pub mod system_scope;
pub mod types;
pub mod typing;
