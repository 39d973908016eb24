//! Structural computation types.
//!
//! A [`Type`] is one of three variants: a tensor with a dtype and shape, a named tuple of
//! optionally named elements, or a sequence of elements of one type. Named tuples may remember
//! the native container they were captured from ([`ContainerKind`]) so results can be rebuilt
//! in the same shape; the tag never participates in type equality.

mod coerce;
mod text;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::{DType, Shape};

pub use coerce::{to_type, IntoType};

/// Native container a named tuple was captured from, each with a fixed field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Positional sequence.
    List,
    /// Positional tuple.
    Tuple,
    /// Unordered mapping; elements are kept in lexicographic key order.
    Dict,
    /// Mapping that preserves insertion order.
    OrderedDict,
    /// Named tuple class with declared field order.
    NamedTuple { name: String },
    /// Attribute-bearing record class with declared field order.
    Record { name: String },
}

impl ContainerKind {
    /// Containers whose elements are addressed by name and therefore need every element named.
    pub fn requires_names(&self) -> bool {
        !matches!(self, ContainerKind::List | ContainerKind::Tuple)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorType {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorType {
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self { dtype, shape }
    }

    pub fn is_assignable_from(&self, other: &TensorType) -> bool {
        self.dtype == other.dtype && self.shape.is_assignable_from(&other.shape)
    }
}

/// Ordered elements with optional, unique names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NamedTupleWire")]
pub struct NamedTupleType {
    elements: Vec<(Option<String>, Type)>,
    container: Option<ContainerKind>,
}

/// Decoded form of [`NamedTupleType`], validated through the same constructors.
#[derive(Deserialize)]
struct NamedTupleWire {
    elements: Vec<(Option<String>, Type)>,
    #[serde(default)]
    container: Option<ContainerKind>,
}

impl TryFrom<NamedTupleWire> for NamedTupleType {
    type Error = Error;

    fn try_from(wire: NamedTupleWire) -> Result<Self> {
        let tuple = NamedTupleType::new(wire.elements)?;
        match wire.container {
            Some(container) => tuple.with_container(container),
            None => Ok(tuple),
        }
    }
}

impl NamedTupleType {
    /// Validates that named elements carry distinct names.
    pub fn new(elements: Vec<(Option<String>, Type)>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for name in elements.iter().filter_map(|(name, _)| name.as_deref()) {
            if !seen.insert(name) {
                return Err(Error::type_mismatch(format!(
                    "duplicate element name `{name}` in named tuple"
                )));
            }
        }
        Ok(Self {
            elements,
            container: None,
        })
    }

    /// Attaches a container tag. Name-addressed containers require every element to be named.
    pub fn with_container(mut self, container: ContainerKind) -> Result<Self> {
        if container.requires_names() && !self.all_named() {
            return Err(Error::type_mismatch(format!(
                "container {container:?} needs every element of {self} to be named"
            )));
        }
        self.container = Some(container);
        Ok(self)
    }

    pub fn elements(&self) -> &[(Option<String>, Type)] {
        &self.elements
    }

    pub fn container(&self) -> Option<&ContainerKind> {
        self.container.as_ref()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.elements
            .iter()
            .find(|(element_name, _)| element_name.as_deref() == Some(name))
            .map(|(_, ty)| ty)
    }

    /// True when every element has a name; vacuously true for the empty tuple.
    pub fn all_named(&self) -> bool {
        self.elements.iter().all(|(name, _)| name.is_some())
    }

    pub fn none_named(&self) -> bool {
        self.elements.iter().all(|(name, _)| name.is_none())
    }
}

impl PartialEq for NamedTupleType {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceType {
    element: Box<Type>,
}

impl SequenceType {
    pub fn new(element: Type) -> Self {
        Self {
            element: Box::new(element),
        }
    }

    pub fn element(&self) -> &Type {
        &self.element
    }
}

/// Structural type of a value crossing the graph boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Tensor(TensorType),
    NamedTuple(NamedTupleType),
    Sequence(SequenceType),
}

impl Type {
    pub fn tensor(dtype: DType, shape: Shape) -> Self {
        Type::Tensor(TensorType::new(dtype, shape))
    }

    pub fn scalar(dtype: DType) -> Self {
        Type::tensor(dtype, Shape::scalar())
    }

    pub fn sequence(element: Type) -> Self {
        Type::Sequence(SequenceType::new(element))
    }

    pub fn named_tuple(elements: Vec<(Option<String>, Type)>) -> Result<Self> {
        NamedTupleType::new(elements).map(Type::NamedTuple)
    }

    /// Named tuple whose elements are all named.
    pub fn named<N: Into<String>>(elements: impl IntoIterator<Item = (N, Type)>) -> Result<Self> {
        Type::named_tuple(
            elements
                .into_iter()
                .map(|(name, ty)| (Some(name.into()), ty))
                .collect(),
        )
    }

    /// Named tuple whose elements are all positional.
    pub fn unnamed(elements: impl IntoIterator<Item = Type>) -> Self {
        Type::NamedTuple(NamedTupleType {
            elements: elements.into_iter().map(|ty| (None, ty)).collect(),
            container: None,
        })
    }

    /// Tags a named tuple with its native container; other variants are rejected.
    pub fn with_container(self, container: ContainerKind) -> Result<Self> {
        match self {
            Type::NamedTuple(tuple) => tuple.with_container(container).map(Type::NamedTuple),
            other => Err(Error::type_mismatch(format!(
                "only named tuples carry a container, found {other}"
            ))),
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Type::Tensor(_))
    }

    pub fn is_named_tuple(&self) -> bool {
        matches!(self, Type::NamedTuple(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Type::Sequence(_))
    }

    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            Type::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    pub fn as_named_tuple(&self) -> Option<&NamedTupleType> {
        match self {
            Type::NamedTuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SequenceType> {
        match self {
            Type::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Container tag of a named tuple, if any.
    pub fn container(&self) -> Option<&ContainerKind> {
        self.as_named_tuple().and_then(NamedTupleType::container)
    }

    /// Whether a value of type `other` may be used where `self` is declared.
    ///
    /// Dynamic dimensions accept any extent. Element names must agree wherever the declared
    /// tuple names an element.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Tensor(target), Type::Tensor(source)) => target.is_assignable_from(source),
            (Type::Sequence(target), Type::Sequence(source)) => {
                target.element().is_assignable_from(source.element())
            }
            (Type::NamedTuple(target), Type::NamedTuple(source)) => {
                target.len() == source.len()
                    && target.elements().iter().zip(source.elements()).all(
                        |((target_name, target_ty), (source_name, source_ty))| {
                            let names_agree = match target_name {
                                Some(name) => source_name.as_deref() == Some(name.as_str()),
                                None => true,
                            };
                            names_agree && target_ty.is_assignable_from(source_ty)
                        },
                    )
            }
            _ => false,
        }
    }
}

impl From<DType> for Type {
    fn from(dtype: DType) -> Self {
        Type::scalar(dtype)
    }
}

impl From<TensorType> for Type {
    fn from(tensor: TensorType) -> Self {
        Type::Tensor(tensor)
    }
}

impl From<NamedTupleType> for Type {
    fn from(tuple: NamedTupleType) -> Self {
        Type::NamedTuple(tuple)
    }
}

impl From<SequenceType> for Type {
    fn from(sequence: SequenceType) -> Self {
        Type::Sequence(sequence)
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dtype)?;
        if self.shape.rank() > 0 {
            write!(f, "{}", self.shape)?;
        }
        Ok(())
    }
}

impl fmt::Display for NamedTupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (index, (name, ty)) in self.elements.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            if let Some(name) = name {
                write!(f, "{name}=")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(">")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Tensor(tensor) => write!(f, "{tensor}"),
            Type::NamedTuple(tuple) => write!(f, "{tuple}"),
            Type::Sequence(sequence) => write!(f, "{}*", sequence.element()),
        }
    }
}
