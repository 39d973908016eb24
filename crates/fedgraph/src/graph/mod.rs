//! In-memory dataflow graphs, their serialized definitions and a small evaluator.

mod context;
mod def;
pub mod deps;
mod session;

pub use context::{Graph, GraphId, Op, TensorHandle, Variable};
pub use def::{GraphDef, NodeDef};
pub use session::Session;

/// How a graph resolves a requested node name that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Append `_1`, `_2`, ... until the name is free.
    #[default]
    Uniquify,
    /// Fail with [`Error::NameCollision`](crate::Error::NameCollision).
    Reject,
}
