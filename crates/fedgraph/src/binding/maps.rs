use std::collections::BTreeSet;

use crate::error::{Error, Result};

use super::{Binding, BindingVariant};

/// Every tensor name a binding references, variant tensors of sequences included.
pub fn extract_tensor_names_from_binding(binding: &Binding) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    collect_names(binding, &mut names)?;
    Ok(names)
}

fn collect_names(binding: &Binding, names: &mut BTreeSet<String>) -> Result<()> {
    match binding.variant()? {
        BindingVariant::Tensor(tensor) => {
            names.insert(tensor.tensor_name.clone());
        }
        BindingVariant::Sequence(sequence) => {
            names.insert(sequence.variant_tensor_name.clone());
        }
        BindingVariant::Tuple(tuple) => {
            for element in &tuple.element {
                collect_names(element, names)?;
            }
        }
    }
    Ok(())
}

/// Pairs each tensor name of `source` with the name in the same position of `target`.
///
/// Pairs are listed depth-first, left to right. Both bindings must have identical shape.
pub fn compute_map_from_bindings(
    source: &Binding,
    target: &Binding,
) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    map_into(source, target, &mut pairs)?;
    Ok(pairs)
}

fn map_into(source: &Binding, target: &Binding, pairs: &mut Vec<(String, String)>) -> Result<()> {
    match (source.variant()?, target.variant()?) {
        (BindingVariant::Tensor(from), BindingVariant::Tensor(to)) => {
            pairs.push((from.tensor_name.clone(), to.tensor_name.clone()));
        }
        (BindingVariant::Sequence(from), BindingVariant::Sequence(to)) => {
            pairs.push((
                from.variant_tensor_name.clone(),
                to.variant_tensor_name.clone(),
            ));
        }
        (BindingVariant::Tuple(from), BindingVariant::Tuple(to)) => {
            if from.element.len() != to.element.len() {
                return Err(Error::shape_mismatch(format!(
                    "tuple bindings have {} and {} elements",
                    from.element.len(),
                    to.element.len()
                )));
            }
            for (from, to) in from.element.iter().zip(&to.element) {
                map_into(from, to, pairs)?;
            }
        }
        (from, to) => {
            return Err(Error::shape_mismatch(format!(
                "cannot map a {} binding onto a {} binding",
                from.kind(),
                to.kind()
            )))
        }
    }
    Ok(())
}
