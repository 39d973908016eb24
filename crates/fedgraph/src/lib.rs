//! Graph-binding layer for federated computations.
//!
//! `fedgraph` maps structural computation types (tensors, named tuples, sequences) onto an
//! in-memory dataflow [`Graph`](graph::Graph) and back. Parameters are *stamped* into a graph as
//! placeholders, results are *captured* from values living in a graph, and a serializable
//! [`Binding`](binding::Binding) records where every piece of a type lives. The
//! [`graph::deps`] module analyses serialized graph definitions to sequence initialization ops.

pub mod binding;
pub mod data;
mod env;
pub mod error;
pub mod graph;
pub mod tensor;
pub mod types;
pub mod value;

pub use binding::{
    assemble_result_from_graph, capture_result_from_graph, compute_map_from_bindings,
    extract_tensor_names_from_binding, stamp_parameter_in_graph, Binding,
};
pub use data::Dataset;
pub use error::{Error, Result};
pub use graph::{Graph, GraphDef, NodeDef, Session, TensorHandle};
pub use tensor::{DType, Dimension, HostTensor, Shape};
pub use types::{to_type, ContainerKind, IntoType, Type};
pub use value::{Structure, Value};
