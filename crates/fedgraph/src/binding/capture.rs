use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::graph::{Graph, TensorHandle};
use crate::tensor::{DType, HostTensor, Shape};
use crate::types::{ContainerKind, Type};
use crate::value::Value;

use super::Binding;

/// Derives the type of `result` and a binding locating its parts in `graph`.
///
/// Host scalars and arrays are embedded as constants, reference tensors are read through an
/// identity, and datasets that do not live in `graph` get a fresh `variant` placeholder.
/// Containers record their [`ContainerKind`] on the resulting named tuple type.
pub fn capture_result_from_graph(result: &Value, graph: &mut Graph) -> Result<(Type, Binding)> {
    match result {
        Value::Str(text) => capture_constant(HostTensor::from(text.as_str()), graph),
        Value::Bool(flag) => capture_constant(HostTensor::from(*flag), graph),
        Value::Int(number) => {
            let number = i32::try_from(*number).map_err(|_| {
                Error::type_mismatch(format!("integer {number} does not fit into int32"))
            })?;
            capture_constant(HostTensor::from(number), graph)
        }
        Value::Float(number) => capture_constant(HostTensor::from(*number as f32), graph),
        Value::Array(array) => capture_constant(array.clone(), graph),
        Value::Tensor(tensor) => capture_tensor(tensor, graph),
        Value::Variable(variable) => {
            let read = variable.read_value(graph)?;
            capture_tensor(&read, graph)
        }
        Value::Dataset(dataset) => capture_dataset(dataset, graph),
        Value::List(items) => capture_elements(
            items.iter().map(|item| (None, item)),
            Some(ContainerKind::List),
            graph,
        ),
        Value::Tuple(items) => capture_elements(
            items.iter().map(|item| (None, item)),
            Some(ContainerKind::Tuple),
            graph,
        ),
        Value::Dict(map) => capture_elements(
            map.iter().map(|(key, item)| (Some(key.as_str()), item)),
            Some(ContainerKind::Dict),
            graph,
        ),
        Value::OrderedDict(entries) => capture_elements(
            entries.iter().map(|(key, item)| (Some(key.as_str()), item)),
            Some(ContainerKind::OrderedDict),
            graph,
        ),
        Value::NamedTuple(record) => capture_elements(
            record.fields.iter().map(|(key, item)| (Some(key.as_str()), item)),
            Some(ContainerKind::NamedTuple {
                name: record.type_name.clone(),
            }),
            graph,
        ),
        Value::Record(record) => capture_elements(
            record.fields.iter().map(|(key, item)| (Some(key.as_str()), item)),
            Some(ContainerKind::Record {
                name: record.type_name.clone(),
            }),
            graph,
        ),
        Value::Anonymous(tuple) => capture_elements(
            tuple
                .elements
                .iter()
                .map(|(name, item)| (name.as_deref(), item)),
            None,
            graph,
        ),
        Value::None | Value::Opaque(_) => Err(Error::type_mismatch(format!(
            "cannot capture a {} value; expected a tensor, dataset, host value or container",
            result.kind()
        ))),
    }
}

fn capture_constant(value: HostTensor, graph: &mut Graph) -> Result<(Type, Binding)> {
    let tensor = graph.constant(None, value)?;
    Ok((Type::Tensor(tensor.tensor_type()), Binding::tensor(tensor.name())))
}

fn capture_tensor(tensor: &TensorHandle, graph: &mut Graph) -> Result<(Type, Binding)> {
    graph.ensure_owned(tensor)?;
    let tensor = if tensor.is_ref() {
        graph.identity(tensor, None)?
    } else {
        tensor.clone()
    };
    Ok((Type::Tensor(tensor.tensor_type()), Binding::tensor(tensor.name())))
}

fn capture_dataset(dataset: &Dataset, graph: &mut Graph) -> Result<(Type, Binding)> {
    let variant = match dataset.variant_tensor() {
        Some(variant) if graph.contains(variant) => variant.clone(),
        _ => {
            let placeholder = graph.placeholder("Placeholder", DType::Variant, Shape::scalar())?;
            tracing::debug!(
                variant = %placeholder.name(),
                element = %dataset.element_type(),
                "dataset is not in the graph; binding a fresh variant placeholder"
            );
            placeholder
        }
    };
    Ok((
        Type::sequence(dataset.element_type().clone()),
        Binding::sequence(variant.name()),
    ))
}

fn capture_elements<'v>(
    elements: impl IntoIterator<Item = (Option<&'v str>, &'v Value)>,
    container: Option<ContainerKind>,
    graph: &mut Graph,
) -> Result<(Type, Binding)> {
    let mut types = Vec::new();
    let mut bindings = Vec::new();
    for (name, value) in elements {
        let (ty, binding) = capture_result_from_graph(value, graph)?;
        types.push((name.map(str::to_string), ty));
        bindings.push(binding);
    }
    let ty = Type::named_tuple(types)?;
    let ty = match container {
        Some(container) => ty.with_container(container)?,
        None => ty,
    };
    Ok((ty, Binding::tuple(bindings)))
}
