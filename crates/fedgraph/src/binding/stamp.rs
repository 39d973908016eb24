use crate::data::Dataset;
use crate::error::Result;
use crate::graph::Graph;
use crate::tensor::{DType, Shape};
use crate::types::{IntoType, Type};
use crate::value::Value;

use super::Binding;

/// Creates placeholders in `graph` for a parameter of the given type.
///
/// Tensors become one placeholder named `parameter_name`; sequences become a scalar `variant`
/// placeholder wrapped in a graph-resident [`Dataset`]; named tuples stamp each element under
/// `<parameter_name>_<element name>` (or `_<index>` when unnamed). The returned value is rebuilt
/// with the type's container tag.
pub fn stamp_parameter_in_graph(
    parameter_name: &str,
    parameter_type: impl IntoType,
    graph: &mut Graph,
) -> Result<(Value, Binding)> {
    let parameter_type = parameter_type.into_type()?;
    tracing::debug!(parameter = parameter_name, ty = %parameter_type, "stamping parameter");
    stamp(parameter_name, &parameter_type, graph)
}

fn stamp(name: &str, ty: &Type, graph: &mut Graph) -> Result<(Value, Binding)> {
    match ty {
        Type::Tensor(tensor) => {
            let placeholder = graph.placeholder(name, tensor.dtype, tensor.shape.clone())?;
            let binding = Binding::tensor(placeholder.name());
            Ok((Value::Tensor(placeholder), binding))
        }
        Type::Sequence(sequence) => {
            let variant = graph.placeholder(name, DType::Variant, Shape::scalar())?;
            let binding = Binding::sequence(variant.name());
            let dataset = Dataset::from_variant(variant, sequence.element())?;
            Ok((Value::Dataset(dataset), binding))
        }
        Type::NamedTuple(tuple) => {
            let mut values = Vec::with_capacity(tuple.len());
            let mut bindings = Vec::with_capacity(tuple.len());
            for (index, (element_name, element_type)) in tuple.elements().iter().enumerate() {
                let element_key = match element_name {
                    Some(element_name) => format!("{name}_{element_name}"),
                    None => format!("{name}_{index}"),
                };
                let (value, binding) = stamp(&element_key, element_type, graph)?;
                values.push((element_name.clone(), value));
                bindings.push(binding);
            }
            let value = Value::from_container(tuple.container(), values)?;
            Ok((value, Binding::tuple(bindings)))
        }
    }
}
