//! Tensor metadata and host-side values.
//!
//! [`DType`] and [`Shape`] describe graph tensors and structural tensor types; [`HostTensor`]
//! holds concrete values for constants, dataset slices and session results.

pub mod dtype;
mod host_tensor;
pub mod shape;

pub use dtype::DType;
pub use host_tensor::{HostElement, HostTensor};
pub use shape::{Dimension, Shape};
