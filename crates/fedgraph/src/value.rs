//! Native nested values exchanged with the binding layer.
//!
//! [`Value`] is what the capturer inspects and what the stamper and assembler hand back: language
//! scalars, host arrays, graph handles, datasets, and the native containers that can hold them.
//! [`Structure`] is the typed skeleton used for dataset elements and accumulator lists.

use std::collections::BTreeMap;

use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::graph::{TensorHandle, Variable};
use crate::tensor::HostTensor;
use crate::types::ContainerKind;

/// Instance of a named-tuple or record class: a class name plus fields in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRecord {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl NamedRecord {
    pub fn new<N: Into<String>>(
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Structural tuple value whose elements may or may not carry names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnonymousTuple {
    pub elements: Vec<(Option<String>, Value)>,
}

impl AnonymousTuple {
    pub fn new(elements: Vec<(Option<String>, Value)>) -> Self {
        Self { elements }
    }

    pub fn all_named(&self) -> bool {
        self.elements.iter().all(|(name, _)| name.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    /// Language-level integer; captured as `int32`.
    Int(i64),
    /// Language-level float; captured as `float32`.
    Float(f64),
    Str(String),
    /// Dense host array; rank-0 arrays stand in for explicitly sized scalars.
    Array(HostTensor),
    Tensor(TensorHandle),
    Variable(Variable),
    Dataset(Dataset),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    OrderedDict(Vec<(String, Value)>),
    NamedTuple(NamedRecord),
    Record(NamedRecord),
    Anonymous(AnonymousTuple),
    /// Foreign object the binding layer does not understand, described by its kind.
    Opaque(String),
}

impl Value {
    /// Short description of the value kind used in error messages.
    pub fn kind(&self) -> &str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Tensor(_) => "tensor",
            Value::Variable(_) => "variable",
            Value::Dataset(_) => "dataset",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::OrderedDict(_) => "ordered dict",
            Value::NamedTuple(_) => "named tuple",
            Value::Record(_) => "record",
            Value::Anonymous(_) => "anonymous tuple",
            Value::Opaque(kind) => kind,
        }
    }

    /// Named fields of a mapping, record or fully named anonymous tuple, in canonical order.
    pub fn named_elements(&self) -> Option<Vec<(&str, &Value)>> {
        match self {
            Value::Dict(map) => Some(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
            Value::OrderedDict(entries) => {
                Some(entries.iter().map(|(k, v)| (k.as_str(), v)).collect())
            }
            Value::NamedTuple(record) | Value::Record(record) => {
                Some(record.fields.iter().map(|(k, v)| (k.as_str(), v)).collect())
            }
            Value::Anonymous(tuple) if tuple.all_named() && !tuple.elements.is_empty() => Some(
                tuple
                    .elements
                    .iter()
                    .filter_map(|(k, v)| k.as_deref().map(|k| (k, v)))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Elements of a positional container in order.
    pub fn positional_elements(&self) -> Option<Vec<&Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.iter().collect()),
            Value::Anonymous(tuple) => Some(tuple.elements.iter().map(|(_, v)| v).collect()),
            _ => None,
        }
    }

    /// Looks up a named element of a container value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Dict(map) => map.get(name),
            Value::OrderedDict(entries) => entries.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Value::NamedTuple(record) | Value::Record(record) => record
                .fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v),
            Value::Anonymous(tuple) => tuple
                .elements
                .iter()
                .find(|(k, _)| k.as_deref() == Some(name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up an element by position; mappings use their canonical order.
    pub fn element(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) | Value::Tuple(items) => items.get(index),
            Value::Dict(map) => map.values().nth(index),
            Value::OrderedDict(entries) => entries.get(index).map(|(_, v)| v),
            Value::NamedTuple(record) | Value::Record(record) => {
                record.fields.get(index).map(|(_, v)| v)
            }
            Value::Anonymous(tuple) => tuple.elements.get(index).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorHandle> {
        match self {
            Value::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Value::Dataset(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&HostTensor> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Rebuilds a native container from ordered elements according to `container`.
    ///
    /// Without a tag the result is an [`AnonymousTuple`]. Name-addressed containers require
    /// every element to be named.
    pub fn from_container(
        container: Option<&ContainerKind>,
        elements: Vec<(Option<String>, Value)>,
    ) -> Result<Value> {
        let Some(container) = container else {
            return Ok(Value::Anonymous(AnonymousTuple::new(elements)));
        };
        let positional = |elements: Vec<(Option<String>, Value)>| {
            elements.into_iter().map(|(_, value)| value).collect()
        };
        let named = |elements: Vec<(Option<String>, Value)>| {
            elements
                .into_iter()
                .map(|(name, value)| {
                    name.map(|name| (name, value)).ok_or_else(|| {
                        Error::type_mismatch(format!(
                            "container {container:?} cannot hold an unnamed element"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
        };
        Ok(match container {
            ContainerKind::List => Value::List(positional(elements)),
            ContainerKind::Tuple => Value::Tuple(positional(elements)),
            ContainerKind::Dict => Value::Dict(named(elements)?.into_iter().collect()),
            ContainerKind::OrderedDict => Value::OrderedDict(named(elements)?),
            ContainerKind::NamedTuple { name } => Value::NamedTuple(NamedRecord {
                type_name: name.clone(),
                fields: named(elements)?,
            }),
            ContainerKind::Record { name } => Value::Record(NamedRecord {
                type_name: name.clone(),
                fields: named(elements)?,
            }),
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<HostTensor> for Value {
    fn from(value: HostTensor) -> Self {
        Value::Array(value)
    }
}

impl From<TensorHandle> for Value {
    fn from(value: TensorHandle) -> Self {
        Value::Tensor(value)
    }
}

impl From<Dataset> for Value {
    fn from(value: Dataset) -> Self {
        Value::Dataset(value)
    }
}

/// Nested skeleton with leaves of type `T` and tuple nodes tagged by their container.
#[derive(Debug, Clone, PartialEq)]
pub enum Structure<T> {
    Leaf(T),
    Tuple {
        elements: Vec<(Option<String>, Structure<T>)>,
        container: Option<ContainerKind>,
    },
}

impl<T> Structure<T> {
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Structure::Leaf(leaf) => Some(leaf),
            Structure::Tuple { .. } => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Structure<T>> {
        match self {
            Structure::Tuple { elements, .. } => elements
                .iter()
                .find(|(element_name, _)| element_name.as_deref() == Some(name))
                .map(|(_, element)| element),
            Structure::Leaf(_) => None,
        }
    }

    pub fn element(&self, index: usize) -> Option<&Structure<T>> {
        match self {
            Structure::Tuple { elements, .. } => elements.get(index).map(|(_, element)| element),
            Structure::Leaf(_) => None,
        }
    }

    /// Leaves in depth-first, left-to-right order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'s>(&'s self, out: &mut Vec<&'s T>) {
        match self {
            Structure::Leaf(leaf) => out.push(leaf),
            Structure::Tuple { elements, .. } => {
                for (_, element) in elements {
                    element.collect_leaves(out);
                }
            }
        }
    }

    /// Rebuilds the structure with every leaf transformed, stopping at the first error.
    pub fn try_map<U>(self, f: &mut impl FnMut(T) -> Result<U>) -> Result<Structure<U>> {
        Ok(match self {
            Structure::Leaf(leaf) => Structure::Leaf(f(leaf)?),
            Structure::Tuple {
                elements,
                container,
            } => Structure::Tuple {
                elements: elements
                    .into_iter()
                    .map(|(name, element)| Ok((name, element.try_map(&mut *f)?)))
                    .collect::<Result<Vec<_>>>()?,
                container,
            },
        })
    }

    /// Same as [`Structure::try_map`] but borrowing the leaves.
    pub fn try_map_ref<U>(&self, f: &mut impl FnMut(&T) -> Result<U>) -> Result<Structure<U>> {
        Ok(match self {
            Structure::Leaf(leaf) => Structure::Leaf(f(leaf)?),
            Structure::Tuple {
                elements,
                container,
            } => Structure::Tuple {
                elements: elements
                    .iter()
                    .map(|(name, element)| Ok((name.clone(), element.try_map_ref(&mut *f)?)))
                    .collect::<Result<Vec<_>>>()?,
                container: container.clone(),
            },
        })
    }

    /// Converts into a native [`Value`], rebuilding each tuple with its container tag.
    pub fn into_value(self, leaf: &mut impl FnMut(T) -> Value) -> Result<Value> {
        match self {
            Structure::Leaf(value) => Ok(leaf(value)),
            Structure::Tuple {
                elements,
                container,
            } => {
                let elements = elements
                    .into_iter()
                    .map(|(name, element)| Ok((name, element.into_value(&mut *leaf)?)))
                    .collect::<Result<Vec<_>>>()?;
                Value::from_container(container.as_ref(), elements)
            }
        }
    }
}

impl Structure<HostTensor> {
    /// Native value whose leaves are host arrays.
    pub fn to_value(&self) -> Result<Value> {
        self.clone().into_value(&mut Value::Array)
    }
}
