//! Building datasets out of native element values.
//!
//! Elements are first gathered leaf by leaf into a list structure (one accumulator per tensor in
//! the element type), then each accumulator is stacked into a slice tensor. Accumulators for
//! named tuples use `OrderedDict` containers, positional ones use `Tuple`.

use crate::error::{Error, Result};
use crate::graph::{Graph, TensorHandle};
use crate::tensor::{DType, HostTensor};
use crate::types::{ContainerKind, IntoType, NamedTupleType, TensorType, Type};
use crate::value::{Structure, Value};

use super::Dataset;

/// Accumulator container for a named tuple: all-named (or empty) tuples become `OrderedDict`,
/// all-positional ones `Tuple`.
fn list_container(tuple: &NamedTupleType) -> Result<ContainerKind> {
    if tuple.all_named() {
        Ok(ContainerKind::OrderedDict)
    } else if tuple.none_named() {
        Ok(ContainerKind::Tuple)
    } else {
        Err(Error::type_mismatch(format!(
            "elements of {tuple} must be either all named or all unnamed"
        )))
    }
}

fn unsupported_sequence(ty: &Type) -> Error {
    Error::type_mismatch(format!("dataset elements cannot contain the sequence {ty}"))
}

/// One empty accumulator per tensor of `element_type`.
pub fn make_empty_list_structure_for_element_type_spec(
    element_type: impl IntoType,
) -> Result<Structure<Vec<HostTensor>>> {
    empty_list_structure(&element_type.into_type()?)
}

fn empty_list_structure(ty: &Type) -> Result<Structure<Vec<HostTensor>>> {
    match ty {
        Type::Tensor(_) => Ok(Structure::Leaf(Vec::new())),
        Type::NamedTuple(tuple) => {
            let container = list_container(tuple)?;
            let elements = tuple
                .elements()
                .iter()
                .map(|(name, element)| Ok((name.clone(), empty_list_structure(element)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Structure::Tuple {
                elements,
                container: Some(container),
            })
        }
        Type::Sequence(_) => Err(unsupported_sequence(ty)),
    }
}

/// Appends the leaves of `value` to the matching accumulators of `structure`.
///
/// `Value::None` is ignored. Mappings must carry exactly the declared keys, positional
/// containers exactly the declared number of elements.
pub fn append_to_list_structure_for_element_type_spec(
    structure: &mut Structure<Vec<HostTensor>>,
    value: &Value,
    element_type: impl IntoType,
) -> Result<()> {
    if matches!(value, Value::None) {
        return Ok(());
    }
    append(structure, value, &element_type.into_type()?)
}

fn append(structure: &mut Structure<Vec<HostTensor>>, value: &Value, ty: &Type) -> Result<()> {
    match (structure, ty) {
        (Structure::Leaf(column), Type::Tensor(tensor_type)) => {
            column.push(leaf_tensor(value, tensor_type)?);
            Ok(())
        }
        (Structure::Tuple { elements, .. }, Type::NamedTuple(tuple))
            if elements.len() == tuple.len() =>
        {
            let children = tuple_children(value, tuple)?;
            for ((accumulator, (_, element_type)), child) in elements
                .iter_mut()
                .map(|(_, accumulator)| accumulator)
                .zip(tuple.elements())
                .zip(children)
            {
                append(accumulator, child, element_type)?;
            }
            Ok(())
        }
        (_, Type::Sequence(_)) => Err(unsupported_sequence(ty)),
        _ => Err(Error::type_mismatch(format!(
            "list structure does not match the element type {ty}"
        ))),
    }
}

/// Children of a container value in the declared element order of `tuple`.
fn tuple_children<'v>(value: &'v Value, tuple: &NamedTupleType) -> Result<Vec<&'v Value>> {
    if let Some(named) = value.named_elements() {
        if !tuple.all_named() {
            return Err(Error::type_mismatch(format!(
                "a {} value cannot populate the partially unnamed {tuple}",
                value.kind()
            )));
        }
        let keys_match = named.len() == tuple.len()
            && named
                .iter()
                .all(|(key, _)| tuple.field(key).is_some());
        if !keys_match {
            let keys: Vec<&str> = named.iter().map(|(key, _)| *key).collect();
            return Err(Error::type_mismatch(format!(
                "keys {keys:?} of a {} value do not match {tuple}",
                value.kind()
            )));
        }
        return tuple
            .elements()
            .iter()
            .map(|(name, _)| {
                name.as_deref()
                    .and_then(|name| value.field(name))
                    .ok_or_else(|| Error::type_mismatch(format!("missing element of {tuple}")))
            })
            .collect();
    }
    if let Some(items) = value.positional_elements() {
        if items.len() != tuple.len() {
            return Err(Error::type_mismatch(format!(
                "{} elements of a {} value do not match the {} elements of {tuple}",
                items.len(),
                value.kind(),
                tuple.len()
            )));
        }
        return Ok(items);
    }
    Err(Error::type_mismatch(format!(
        "a {} value cannot populate {tuple}",
        value.kind()
    )))
}

/// Host tensor of the declared dtype and shape for a leaf value.
fn leaf_tensor(value: &Value, target: &TensorType) -> Result<HostTensor> {
    let tensor = host_tensor(value, target.dtype)?;
    if !target.shape.is_assignable_from(&tensor.shape()) {
        return Err(Error::type_mismatch(format!(
            "a value of shape {} does not fit {target}",
            tensor.shape()
        )));
    }
    Ok(tensor)
}

fn host_tensor(value: &Value, dtype: DType) -> Result<HostTensor> {
    let tensor = match value {
        Value::Bool(v) => HostTensor::from(*v),
        Value::Int(v) => HostTensor::from(*v),
        Value::Float(v) => HostTensor::from(*v),
        Value::Str(v) => HostTensor::from(v.as_str()),
        Value::Array(array) => array.clone(),
        Value::List(items) | Value::Tuple(items) if items.is_empty() => {
            return HostTensor::zeros(dtype, &[0]);
        }
        Value::List(items) | Value::Tuple(items) => {
            let rows = items
                .iter()
                .map(|item| host_tensor(item, dtype))
                .collect::<Result<Vec<_>>>()?;
            return HostTensor::stack(&rows);
        }
        other => {
            return Err(Error::type_mismatch(format!(
                "cannot convert a {} value into a {dtype} tensor",
                other.kind()
            )))
        }
    };
    tensor.cast(dtype)
}

/// Stacks each accumulator into a slice tensor with a new leading axis.
///
/// Empty accumulators become zero-row tensors whose remaining dims follow the declared shape,
/// with dynamic dims set to zero.
pub fn to_tensor_slices_from_list_structure_for_element_type_spec(
    structure: Structure<Vec<HostTensor>>,
    element_type: impl IntoType,
) -> Result<Structure<HostTensor>> {
    to_slices(structure, &element_type.into_type()?)
}

fn to_slices(structure: Structure<Vec<HostTensor>>, ty: &Type) -> Result<Structure<HostTensor>> {
    match (structure, ty) {
        (Structure::Leaf(column), Type::Tensor(tensor_type)) => {
            if column.is_empty() {
                let mut dims = vec![0];
                dims.extend(tensor_type.shape.zeroed_dims());
                return HostTensor::zeros(tensor_type.dtype, &dims).map(Structure::Leaf);
            }
            HostTensor::stack(&column).map(Structure::Leaf)
        }
        (
            Structure::Tuple {
                elements,
                container,
            },
            Type::NamedTuple(tuple),
        ) if elements.len() == tuple.len() => {
            let elements = elements
                .into_iter()
                .zip(tuple.elements())
                .map(|((name, element), (_, element_type))| {
                    Ok((name, to_slices(element, element_type)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Structure::Tuple {
                elements,
                container,
            })
        }
        (_, Type::Sequence(_)) => Err(unsupported_sequence(ty)),
        _ => Err(Error::type_mismatch(format!(
            "list structure does not match the element type {ty}"
        ))),
    }
}

/// Zero-filled element of `element_type`; dynamic dims become zero.
pub fn make_dummy_element_for_type_spec(element_type: impl IntoType) -> Result<Structure<HostTensor>> {
    dummy_element(&element_type.into_type()?)
}

fn dummy_element(ty: &Type) -> Result<Structure<HostTensor>> {
    match ty {
        Type::Tensor(tensor_type) => {
            HostTensor::zeros(tensor_type.dtype, &tensor_type.shape.zeroed_dims()).map(Structure::Leaf)
        }
        Type::NamedTuple(tuple) => {
            let container = list_container(tuple)?;
            let elements = tuple
                .elements()
                .iter()
                .map(|(name, element)| Ok((name.clone(), dummy_element(element)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Structure::Tuple {
                elements,
                container: Some(container),
            })
        }
        Type::Sequence(_) => Err(unsupported_sequence(ty)),
    }
}

/// Builds a dataset holding `elements` in order, in `graph` or eagerly when `graph` is `None`.
///
/// All elements but the last are stacked into one slice segment and the last one is appended
/// as its own segment, so a short final batch still fits. If the elements cannot be stacked
/// together, every element becomes its own segment.
pub fn make_data_set_from_elements(
    mut graph: Option<&mut Graph>,
    elements: &[Value],
    element_type: impl IntoType,
) -> Result<Dataset> {
    let element_type = element_type.into_type()?;
    let dataset = match elements.split_last() {
        None => {
            let dummy = dummy_element(&element_type)?;
            let slices = dummy.try_map(&mut |leaf| HostTensor::stack(std::slice::from_ref(&leaf)))?;
            Dataset::from_slice_rows(graph.as_deref_mut(), slices, 1)?
                .take(graph.as_deref_mut(), 0)?
        }
        Some((_, [])) => make_segment(graph.as_deref_mut(), elements, &element_type)?,
        Some((last, head)) => match make_segment(graph.as_deref_mut(), head, &element_type) {
            Ok(first) => {
                let last = make_segment(
                    graph.as_deref_mut(),
                    std::slice::from_ref(last),
                    &element_type,
                )?;
                first.concatenate(graph.as_deref_mut(), &last)?
            }
            Err(Error::ShapeMismatch(reason)) => {
                tracing::debug!(
                    %reason,
                    elements = elements.len(),
                    "elements do not stack; using one segment per element"
                );
                let mut dataset = make_segment(
                    graph.as_deref_mut(),
                    std::slice::from_ref(&elements[0]),
                    &element_type,
                )?;
                for element in &elements[1..] {
                    let segment = make_segment(
                        graph.as_deref_mut(),
                        std::slice::from_ref(element),
                        &element_type,
                    )?;
                    dataset = dataset.concatenate(graph.as_deref_mut(), &segment)?;
                }
                dataset
            }
            Err(err) => return Err(err),
        },
    };
    if !element_type.is_assignable_from(dataset.element_type()) {
        return Err(Error::type_mismatch(format!(
            "elements of type {} do not match the declared {element_type}",
            dataset.element_type()
        )));
    }
    Ok(dataset)
}

/// Slice dataset over `elements`; `None` elements contribute no row.
fn make_segment(graph: Option<&mut Graph>, elements: &[Value], element_type: &Type) -> Result<Dataset> {
    let mut structure = empty_list_structure(element_type)?;
    let mut rows = 0;
    for element in elements {
        if matches!(element, Value::None) {
            continue;
        }
        append(&mut structure, element, element_type)?;
        rows += 1;
    }
    Dataset::from_slice_rows(graph, to_slices(structure, element_type)?, rows)
}

/// Wraps a graph `variant` tensor as a dataset of `element_type`.
pub fn make_dataset_from_variant_tensor(
    variant: &TensorHandle,
    element_type: impl IntoType,
) -> Result<Dataset> {
    Dataset::from_variant(variant.clone(), element_type)
}
