//! Enumerates the element types a graph tensor can carry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical dtype identifier shared by graph tensors, host arrays and tensor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    /// 32-bit signed integer; the default for language-level integers.
    I32,
    I64,
    /// 32-bit float; the default for language-level floats.
    F32,
    F64,
    String,
    /// Opaque handle type used to pass datasets through the graph.
    Variant,
}

impl DType {
    /// Canonical lower-case name used in type strings (`int32`, `float32`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::String => "string",
            DType::Variant => "variant",
        }
    }

    /// Reconstructs a `DType` from its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(DType::Bool),
            "int32" => Some(DType::I32),
            "int64" => Some(DType::I64),
            "float32" => Some(DType::F32),
            "float64" => Some(DType::F64),
            "string" => Some(DType::String),
            "variant" => Some(DType::Variant),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Returns `true` for dtypes whose values can be cast between each other.
    pub fn is_numeric(self) -> bool {
        self == DType::Bool || self.is_integer() || self.is_floating()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
