use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, WireError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorBinding {
    pub tensor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceBinding {
    pub variant_tensor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedTupleBinding {
    #[serde(default)]
    pub element: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingVariant {
    Tensor(TensorBinding),
    Sequence(SequenceBinding),
    Tuple(NamedTupleBinding),
}

impl BindingVariant {
    pub fn kind(&self) -> &'static str {
        match self {
            BindingVariant::Tensor(_) => "tensor",
            BindingVariant::Sequence(_) => "sequence",
            BindingVariant::Tuple(_) => "tuple",
        }
    }
}

/// Where the parts of a typed value live inside a graph.
///
/// Mirrors the paired type: tensors name a graph tensor, sequences name the `variant` tensor
/// of their dataset, and tuples hold one binding per element. A binding with no variant can be
/// decoded but every consumer rejects it with [`Error::UnknownBindingVariant`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default)]
    pub binding: Option<BindingVariant>,
}

impl Binding {
    pub fn tensor(tensor_name: impl Into<String>) -> Self {
        Self::from(BindingVariant::Tensor(TensorBinding {
            tensor_name: tensor_name.into(),
        }))
    }

    pub fn sequence(variant_tensor_name: impl Into<String>) -> Self {
        Self::from(BindingVariant::Sequence(SequenceBinding {
            variant_tensor_name: variant_tensor_name.into(),
        }))
    }

    pub fn tuple(element: Vec<Binding>) -> Self {
        Self::from(BindingVariant::Tuple(NamedTupleBinding { element }))
    }

    /// The populated variant, or [`Error::UnknownBindingVariant`] when none is.
    pub fn variant(&self) -> Result<&BindingVariant> {
        self.binding.as_ref().ok_or(Error::UnknownBindingVariant)
    }

    /// Name of the populated variant, if any.
    pub fn which(&self) -> Option<&'static str> {
        self.binding.as_ref().map(BindingVariant::kind)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(WireError::from)?)
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src).map_err(WireError::from)?)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self).map_err(WireError::from)?)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes).map_err(WireError::from)?)
    }
}

impl From<BindingVariant> for Binding {
    fn from(variant: BindingVariant) -> Self {
        Self {
            binding: Some(variant),
        }
    }
}
