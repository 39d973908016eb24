//! Bindings between structural types and graph tensors.
//!
//! The three traversals here (stamping parameters, capturing results and assembling results)
//! all visit named tuple elements in declared order, so a binding produced by one can be
//! consumed by the others.

mod assemble;
mod capture;
mod maps;
mod stamp;
mod wire;

pub use assemble::assemble_result_from_graph;
pub use capture::capture_result_from_graph;
pub use maps::{compute_map_from_bindings, extract_tensor_names_from_binding};
pub use stamp::stamp_parameter_in_graph;
pub use wire::{Binding, BindingVariant, NamedTupleBinding, SequenceBinding, TensorBinding};
