//! Error taxonomy shared by every binding and graph operation.

use thiserror::Error;

/// Failures surfaced synchronously to the immediate caller.
///
/// Graph mutations performed before an error are not rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or type description cannot be mapped onto a structural type, or the number of
    /// supplied elements/keys disagrees with the declared type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// A binding has none of its variants populated.
    #[error("binding has no recognized variant populated")]
    UnknownBindingVariant,
    /// A binding references a name absent from the provided lookup table.
    #[error("name `{name}` is not present in the lookup table")]
    LookupFailure { name: String },
    /// A node or tensor reference does not resolve, or resolves to the wrong kind of tensor.
    #[error("graph reference error: {0}")]
    GraphReference(String),
    /// Two bindings being mapped onto each other have different shapes, or tensors that must
    /// share a shape (stacked rows, dataset slices) do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// The graph rejects a node name that is already taken.
    #[error("node name `{name}` is already used in this graph")]
    NameCollision { name: String },
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl Error {
    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch(msg.into())
    }

    pub(crate) fn graph_reference(msg: impl Into<String>) -> Self {
        Error::GraphReference(msg.into())
    }

    pub(crate) fn shape_mismatch(msg: impl Into<String>) -> Self {
        Error::ShapeMismatch(msg.into())
    }

    pub(crate) fn lookup(name: impl Into<String>) -> Self {
        Error::LookupFailure { name: name.into() }
    }
}

/// Serialization failures for bindings and graph definitions.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
