use std::collections::HashMap;

use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::graph::TensorHandle;
use crate::types::{IntoType, Type};
use crate::value::Value;

use super::{Binding, BindingVariant};

/// Rebuilds a value of `result_type` from the tensors a binding names.
///
/// `output_map` resolves tensor names, typically [`Graph::tensor_table`](crate::Graph::tensor_table)
/// or the outputs of an imported graph. Named tuples come back in their tagged container, or as
/// an anonymous tuple when untagged.
pub fn assemble_result_from_graph(
    result_type: impl IntoType,
    binding: &Binding,
    output_map: &HashMap<String, TensorHandle>,
) -> Result<Value> {
    assemble(&result_type.into_type()?, binding, output_map)
}

fn lookup(output_map: &HashMap<String, TensorHandle>, name: &str) -> Result<TensorHandle> {
    output_map.get(name).cloned().ok_or_else(|| Error::lookup(name))
}

fn assemble(
    ty: &Type,
    binding: &Binding,
    output_map: &HashMap<String, TensorHandle>,
) -> Result<Value> {
    match (ty, binding.variant()?) {
        (Type::Tensor(tensor_type), BindingVariant::Tensor(tensor)) => {
            let handle = lookup(output_map, &tensor.tensor_name)?;
            if !tensor_type.is_assignable_from(&handle.tensor_type()) {
                return Err(Error::type_mismatch(format!(
                    "tensor {handle} does not have the declared type {ty}"
                )));
            }
            Ok(Value::Tensor(handle))
        }
        (Type::Sequence(sequence), BindingVariant::Sequence(binding)) => {
            let variant = lookup(output_map, &binding.variant_tensor_name)?;
            Ok(Value::Dataset(Dataset::from_variant(
                variant,
                sequence.element(),
            )?))
        }
        (Type::NamedTuple(tuple), BindingVariant::Tuple(binding)) => {
            if tuple.len() != binding.element.len() {
                return Err(Error::type_mismatch(format!(
                    "a tuple binding with {} elements cannot hold {ty}",
                    binding.element.len()
                )));
            }
            let elements = tuple
                .elements()
                .iter()
                .zip(&binding.element)
                .map(|((name, element_type), element)| {
                    Ok((name.clone(), assemble(element_type, element, output_map)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Value::from_container(tuple.container(), elements)
        }
        (ty, variant) => Err(Error::type_mismatch(format!(
            "a {} binding cannot hold a value of type {ty}",
            variant.kind()
        ))),
    }
}
