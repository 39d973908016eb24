//! Short-hand type descriptions accepted wherever a [`Type`] is expected.

use super::{NamedTupleType, SequenceType, TensorType, Type};
use crate::error::Result;
use crate::tensor::{DType, Shape};

/// Conversion from a type-like description into a structural [`Type`].
///
/// Implemented for full types, bare dtypes, `(dtype, shape)` pairs, lists of named or
/// positional element types, and the textual form (`"<a=int32,b=bool>*"`).
pub trait IntoType {
    fn into_type(self) -> Result<Type>;
}

/// Coerces a type-like description, failing with a type mismatch if it is not recognized.
pub fn to_type(description: impl IntoType) -> Result<Type> {
    description.into_type()
}

impl IntoType for Type {
    fn into_type(self) -> Result<Type> {
        Ok(self)
    }
}

impl IntoType for &Type {
    fn into_type(self) -> Result<Type> {
        Ok(self.clone())
    }
}

impl IntoType for DType {
    fn into_type(self) -> Result<Type> {
        Ok(Type::scalar(self))
    }
}

impl IntoType for TensorType {
    fn into_type(self) -> Result<Type> {
        Ok(Type::Tensor(self))
    }
}

impl IntoType for NamedTupleType {
    fn into_type(self) -> Result<Type> {
        Ok(Type::NamedTuple(self))
    }
}

impl IntoType for SequenceType {
    fn into_type(self) -> Result<Type> {
        Ok(Type::Sequence(self))
    }
}

impl IntoType for (DType, Shape) {
    fn into_type(self) -> Result<Type> {
        Ok(Type::tensor(self.0, self.1))
    }
}

impl IntoType for (DType, Vec<Option<usize>>) {
    fn into_type(self) -> Result<Type> {
        Ok(Type::tensor(self.0, Shape::from_partial(&self.1)))
    }
}

impl<const N: usize> IntoType for (DType, [Option<usize>; N]) {
    fn into_type(self) -> Result<Type> {
        Ok(Type::tensor(self.0, Shape::from_partial(&self.1)))
    }
}

impl IntoType for &str {
    fn into_type(self) -> Result<Type> {
        self.parse()
    }
}

impl IntoType for String {
    fn into_type(self) -> Result<Type> {
        self.as_str().parse()
    }
}

impl IntoType for Vec<Type> {
    fn into_type(self) -> Result<Type> {
        Ok(Type::unnamed(self))
    }
}

impl IntoType for Vec<(&str, Type)> {
    fn into_type(self) -> Result<Type> {
        Type::named(self)
    }
}

impl IntoType for Vec<(String, Type)> {
    fn into_type(self) -> Result<Type> {
        Type::named(self)
    }
}

impl IntoType for Vec<(Option<String>, Type)> {
    fn into_type(self) -> Result<Type> {
        Type::named_tuple(self)
    }
}
