use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graph::{Graph, TensorHandle};
use crate::tensor::{DType, HostTensor, Shape};
use crate::types::{IntoType, Type};
use crate::value::Structure;

/// Where the rows of a [`Dataset`] come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    /// Rows are produced by the op behind this `variant` tensor.
    Graph(TensorHandle),
    /// Rows are held on the host.
    Eager(Arc<Vec<Structure<HostTensor>>>),
}

/// Ordered stream of elements of one structural type.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    element_type: Type,
    source: DatasetSource,
}

impl Dataset {
    /// Wraps a graph `variant` tensor together with the type of its elements.
    pub fn from_variant(variant: TensorHandle, element_type: impl IntoType) -> Result<Self> {
        if variant.dtype() != DType::Variant {
            return Err(Error::graph_reference(format!(
                "{variant} is not a dataset variant tensor"
            )));
        }
        Ok(Dataset {
            element_type: element_type.into_type()?,
            source: DatasetSource::Graph(variant),
        })
    }

    /// Single-element dataset.
    pub fn from_tensors(graph: Option<&mut Graph>, element: Structure<HostTensor>) -> Result<Self> {
        let element_type = structure_type(&element, false)?;
        let source = match graph {
            Some(graph) => DatasetSource::Graph(graph.tensor_dataset(element)?),
            None => DatasetSource::Eager(Arc::new(vec![element])),
        };
        Ok(Dataset {
            element_type,
            source,
        })
    }

    /// One element per index along the shared leading axis of every leaf.
    ///
    /// A structure without leaves has no axis to slice and yields no rows.
    pub fn from_tensor_slices(
        graph: Option<&mut Graph>,
        slices: Structure<HostTensor>,
    ) -> Result<Self> {
        let rows = leading_rows(&slices)?.unwrap_or(0);
        Self::from_slice_rows(graph, slices, rows)
    }

    /// Like [`Dataset::from_tensor_slices`] with the row count given up front, so leafless
    /// structures still produce `rows` (empty) elements.
    pub(crate) fn from_slice_rows(
        graph: Option<&mut Graph>,
        slices: Structure<HostTensor>,
        rows: usize,
    ) -> Result<Self> {
        let element_type = structure_type(&slices, true)?;
        let sliced = slice_rows(&slices, rows)?;
        let source = match graph {
            Some(graph) => DatasetSource::Graph(graph.tensor_slice_dataset(slices, rows)?),
            None => DatasetSource::Eager(Arc::new(sliced)),
        };
        Ok(Dataset {
            element_type,
            source,
        })
    }

    /// Scalar `int64` elements `start, start + step, ...` up to but excluding `stop`.
    pub fn range(graph: Option<&mut Graph>, start: i64, stop: i64, step: i64) -> Result<Self> {
        if step == 0 {
            return Err(Error::type_mismatch("range step must be non-zero"));
        }
        let source = match graph {
            Some(graph) => DatasetSource::Graph(graph.range_dataset(start, stop, step)?),
            None => DatasetSource::Eager(Arc::new(range_rows(start, stop, step))),
        };
        Ok(Dataset {
            element_type: Type::scalar(DType::I64),
            source,
        })
    }

    pub fn element_type(&self) -> &Type {
        &self.element_type
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Backing `variant` tensor of a graph-resident dataset.
    pub fn variant_tensor(&self) -> Option<&TensorHandle> {
        match &self.source {
            DatasetSource::Graph(variant) => Some(variant),
            DatasetSource::Eager(_) => None,
        }
    }

    pub fn is_eager(&self) -> bool {
        matches!(self.source, DatasetSource::Eager(_))
    }

    /// Rows of `self` followed by rows of `other`.
    ///
    /// The element type keeps the dimensions both inputs agree on and relaxes the others.
    pub fn concatenate(&self, graph: Option<&mut Graph>, other: &Dataset) -> Result<Dataset> {
        let element_type = compatible_type(&self.element_type, &other.element_type)
            .ok_or_else(|| {
                Error::type_mismatch(format!(
                    "cannot concatenate datasets of {} and {}",
                    self.element_type, other.element_type
                ))
            })?;
        let source = match (&self.source, &other.source, graph) {
            (DatasetSource::Eager(first), DatasetSource::Eager(second), _) => {
                DatasetSource::Eager(Arc::new(first.iter().chain(second.iter()).cloned().collect()))
            }
            (DatasetSource::Graph(first), DatasetSource::Graph(second), Some(graph)) => {
                DatasetSource::Graph(graph.concatenate_dataset(first, second)?)
            }
            _ => {
                return Err(Error::graph_reference(
                    "concatenated datasets must both be eager or both live in the given graph",
                ))
            }
        };
        Ok(Dataset {
            element_type,
            source,
        })
    }

    /// First `count` rows; a negative count keeps every row.
    pub fn take(&self, graph: Option<&mut Graph>, count: i64) -> Result<Dataset> {
        let source = match (&self.source, graph) {
            (DatasetSource::Eager(rows), _) => {
                let keep = usize::try_from(count).unwrap_or(rows.len());
                DatasetSource::Eager(Arc::new(rows.iter().take(keep).cloned().collect()))
            }
            (DatasetSource::Graph(variant), Some(graph)) => {
                DatasetSource::Graph(graph.take_dataset(variant, count)?)
            }
            (DatasetSource::Graph(variant), None) => {
                return Err(Error::graph_reference(format!(
                    "{variant} needs its graph to derive a new dataset"
                )))
            }
        };
        Ok(Dataset {
            element_type: self.element_type.clone(),
            source,
        })
    }
}

/// Structural type of a host structure, optionally dropping the leading (row) axis of each leaf.
pub(crate) fn structure_type(structure: &Structure<HostTensor>, sliced: bool) -> Result<Type> {
    match structure {
        Structure::Leaf(tensor) => {
            let shape = if sliced {
                tensor
                    .shape()
                    .without_leading()
                    .ok_or_else(|| Error::shape_mismatch("cannot slice a scalar tensor"))?
            } else {
                tensor.shape()
            };
            Ok(Type::tensor(tensor.dtype(), shape))
        }
        Structure::Tuple {
            elements,
            container,
        } => {
            let elements = elements
                .iter()
                .map(|(name, element)| Ok((name.clone(), structure_type(element, sliced)?)))
                .collect::<Result<Vec<_>>>()?;
            let ty = Type::named_tuple(elements)?;
            match container {
                Some(container) => ty.with_container(container.clone()),
                None => Ok(ty),
            }
        }
    }
}

/// Shared leading extent of every leaf, or `None` when the structure has no leaves.
pub(crate) fn leading_rows(slices: &Structure<HostTensor>) -> Result<Option<usize>> {
    let lengths = slices
        .leaves()
        .iter()
        .map(|leaf| {
            leaf.dims()
                .first()
                .copied()
                .ok_or_else(|| Error::shape_mismatch("cannot slice a scalar tensor"))
        })
        .collect::<Result<Vec<usize>>>()?;
    let Some(&count) = lengths.first() else {
        return Ok(None);
    };
    if lengths.iter().any(|&len| len != count) {
        return Err(Error::shape_mismatch(format!(
            "slices disagree on their leading dimension: {lengths:?}"
        )));
    }
    Ok(Some(count))
}

/// Splits every leaf along its leading axis and regroups the pieces into `rows` rows.
pub(crate) fn slice_rows(
    slices: &Structure<HostTensor>,
    rows: usize,
) -> Result<Vec<Structure<HostTensor>>> {
    if let Some(count) = leading_rows(slices)? {
        if count != rows {
            return Err(Error::shape_mismatch(format!(
                "slices hold {count} rows, expected {rows}"
            )));
        }
    }
    let columns = slices.try_map_ref(&mut |leaf: &HostTensor| leaf.unstack())?;
    (0..rows)
        .map(|row| columns.try_map_ref(&mut |column: &Vec<HostTensor>| Ok(column[row].clone())))
        .collect()
}

/// Rows of an `int64` range; stops early instead of overflowing.
pub(crate) fn range_rows(start: i64, stop: i64, step: i64) -> Vec<Structure<HostTensor>> {
    let mut rows = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        rows.push(Structure::Leaf(HostTensor::from(current)));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    rows
}

/// Least specific type both inputs can be assigned to, keeping the first input's container tags.
fn compatible_type(first: &Type, second: &Type) -> Option<Type> {
    match (first, second) {
        (Type::Tensor(a), Type::Tensor(b)) if a.dtype == b.dtype => {
            let shape: Shape = a.shape.most_specific_compatible(&b.shape)?;
            Some(Type::tensor(a.dtype, shape))
        }
        (Type::Sequence(a), Type::Sequence(b)) => {
            compatible_type(a.element(), b.element()).map(Type::sequence)
        }
        (Type::NamedTuple(a), Type::NamedTuple(b)) if a.len() == b.len() => {
            let elements = a
                .elements()
                .iter()
                .zip(b.elements())
                .map(|((name_a, ty_a), (name_b, ty_b))| {
                    (name_a == name_b)
                        .then(|| compatible_type(ty_a, ty_b))
                        .flatten()
                        .map(|ty| (name_a.clone(), ty))
                })
                .collect::<Option<Vec<_>>>()?;
            let ty = Type::named_tuple(elements).ok()?;
            match a.container() {
                Some(container) => ty.with_container(container.clone()).ok(),
                None => Some(ty),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_counts_down_with_negative_step() {
        let rows = range_rows(3, 0, -1);
        let values: Vec<i64> = rows
            .iter()
            .map(|row| {
                let view = row.as_leaf().unwrap().as_array::<i64>().unwrap();
                *view.iter().next().unwrap()
            })
            .collect();
        assert_eq!(values, vec![3, 2, 1]);
    }

    #[test]
    fn concatenation_relaxes_disagreeing_dims() {
        let first = Type::tensor(DType::F32, Shape::from_static(&[3]));
        let second = Type::tensor(DType::F32, Shape::from_static(&[2]));
        assert_eq!(
            compatible_type(&first, &second).unwrap().to_string(),
            "float32[?]"
        );
        let other_dtype = Type::tensor(DType::I32, Shape::from_static(&[3]));
        assert!(compatible_type(&first, &other_dtype).is_none());
    }
}
