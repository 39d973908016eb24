//! Host evaluator for graphs built by this crate.

use std::collections::HashMap;

use super::context::{Graph, NodePayload, NodeRecord, Op, TensorHandle};
use crate::data::{range_rows, slice_rows, Dataset, DatasetSource};
use crate::error::{Error, Result};
use crate::tensor::{DType, HostTensor};
use crate::value::{Structure, Value};

enum Feed {
    Tensor(HostTensor),
    Rows(Vec<Structure<HostTensor>>),
}

/// Evaluates tensors and datasets of one graph, given values for its placeholders.
pub struct Session<'g> {
    graph: &'g Graph,
    feeds: HashMap<String, Feed>,
}

impl<'g> Session<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Session {
            graph,
            feeds: HashMap::new(),
        }
    }

    /// Supplies the value of a tensor placeholder.
    pub fn feed(&mut self, placeholder: &TensorHandle, value: HostTensor) -> Result<()> {
        self.graph.ensure_owned(placeholder)?;
        if placeholder.op() != Op::Placeholder {
            return Err(Error::graph_reference(format!(
                "{placeholder} is not a placeholder"
            )));
        }
        if value.dtype() != placeholder.dtype()
            || !placeholder.shape().is_assignable_from(&value.shape())
        {
            return Err(Error::type_mismatch(format!(
                "cannot feed a {}{} value into {placeholder}",
                value.dtype(),
                value.shape()
            )));
        }
        self.feeds
            .insert(placeholder.node_name().to_string(), Feed::Tensor(value));
        Ok(())
    }

    /// Supplies the rows behind a `variant` placeholder.
    pub fn feed_dataset(&mut self, placeholder: &TensorHandle, dataset: &Dataset) -> Result<()> {
        self.graph.ensure_owned(placeholder)?;
        if placeholder.op() != Op::Placeholder || placeholder.dtype() != DType::Variant {
            return Err(Error::graph_reference(format!(
                "{placeholder} is not a variant placeholder"
            )));
        }
        let rows = self.dataset_rows(dataset)?;
        self.feeds
            .insert(placeholder.node_name().to_string(), Feed::Rows(rows));
        Ok(())
    }

    /// Computes the host value of a non-variant tensor.
    pub fn run(&self, tensor: &TensorHandle) -> Result<HostTensor> {
        self.graph.ensure_owned(tensor)?;
        self.eval_tensor(tensor.node_name())
    }

    /// Produces every row of `dataset` in order.
    pub fn dataset_rows(&self, dataset: &Dataset) -> Result<Vec<Structure<HostTensor>>> {
        match dataset.source() {
            DatasetSource::Eager(rows) => Ok(rows.to_vec()),
            DatasetSource::Graph(variant) => {
                self.graph.ensure_owned(variant)?;
                self.eval_rows(variant.node_name())
            }
        }
    }

    /// Replaces every tensor, variable and dataset inside `value` by its host contents.
    ///
    /// Datasets become lists of their rows; containers keep their kind.
    pub fn fetch_value(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::Tensor(tensor) => Value::Array(self.run(tensor)?),
            Value::Variable(variable) => Value::Array(self.run(variable.handle())?),
            Value::Dataset(dataset) => Value::List(
                self.dataset_rows(dataset)?
                    .iter()
                    .map(Structure::to_value)
                    .collect::<Result<_>>()?,
            ),
            Value::List(items) => Value::List(self.fetch_all(items)?),
            Value::Tuple(items) => Value::Tuple(self.fetch_all(items)?),
            Value::Dict(map) => Value::Dict(
                map.iter()
                    .map(|(key, item)| Ok((key.clone(), self.fetch_value(item)?)))
                    .collect::<Result<_>>()?,
            ),
            Value::OrderedDict(entries) => Value::OrderedDict(self.fetch_named(entries)?),
            Value::NamedTuple(record) => {
                let mut record = record.clone();
                record.fields = self.fetch_named(&record.fields)?;
                Value::NamedTuple(record)
            }
            Value::Record(record) => {
                let mut record = record.clone();
                record.fields = self.fetch_named(&record.fields)?;
                Value::Record(record)
            }
            Value::Anonymous(tuple) => {
                let mut tuple = tuple.clone();
                for (_, element) in tuple.elements.iter_mut() {
                    *element = self.fetch_value(element)?;
                }
                Value::Anonymous(tuple)
            }
            other => other.clone(),
        })
    }

    fn fetch_all(&self, items: &[Value]) -> Result<Vec<Value>> {
        items.iter().map(|item| self.fetch_value(item)).collect()
    }

    fn fetch_named(&self, entries: &[(String, Value)]) -> Result<Vec<(String, Value)>> {
        entries
            .iter()
            .map(|(key, item)| Ok((key.clone(), self.fetch_value(item)?)))
            .collect()
    }

    fn record(&self, node: &str) -> Result<&'g NodeRecord> {
        self.graph
            .node_record(node)
            .ok_or_else(|| Error::graph_reference(format!("unknown node `{node}`")))
    }

    fn input_node(record: &NodeRecord, position: usize) -> Result<&str> {
        record
            .inputs
            .get(position)
            .map(|input| super::deps::to_node_name(input))
            .ok_or_else(|| {
                Error::graph_reference(format!(
                    "node `{}` is missing input {position}",
                    record.name
                ))
            })
    }

    fn eval_tensor(&self, node: &str) -> Result<HostTensor> {
        let record = self.record(node)?;
        match (record.op, &record.payload) {
            (Op::Placeholder, _) => match self.feeds.get(node) {
                Some(Feed::Tensor(value)) => Ok(value.clone()),
                _ => Err(Error::lookup(format!("{node}:0"))),
            },
            (Op::Const | Op::VariableV2, NodePayload::Value(value)) => Ok(value.clone()),
            (Op::Identity, _) => self.eval_tensor(Self::input_node(record, 0)?),
            (op, _) => Err(Error::type_mismatch(format!(
                "node `{node}` ({}) has no host tensor value",
                op.as_str()
            ))),
        }
    }

    fn eval_rows(&self, node: &str) -> Result<Vec<Structure<HostTensor>>> {
        let record = self.record(node)?;
        match (record.op, &record.payload) {
            (Op::Placeholder, _) => match self.feeds.get(node) {
                Some(Feed::Rows(rows)) => Ok(rows.clone()),
                _ => Err(Error::lookup(format!("{node}:0"))),
            },
            (Op::Identity, _) => self.eval_rows(Self::input_node(record, 0)?),
            (Op::TensorDataset, NodePayload::Element(element)) => Ok(vec![element.clone()]),
            (Op::TensorSliceDataset, NodePayload::Slices { slices, rows }) => {
                slice_rows(slices, *rows)
            }
            (Op::RangeDataset, NodePayload::Range { start, stop, step }) => {
                Ok(range_rows(*start, *stop, *step))
            }
            (Op::ConcatenateDataset, _) => {
                let mut rows = self.eval_rows(Self::input_node(record, 0)?)?;
                rows.extend(self.eval_rows(Self::input_node(record, 1)?)?);
                Ok(rows)
            }
            (Op::TakeDataset, NodePayload::Count(count)) => {
                let mut rows = self.eval_rows(Self::input_node(record, 0)?)?;
                if let Ok(count) = usize::try_from(*count) {
                    rows.truncate(count);
                }
                Ok(rows)
            }
            (op, _) => Err(Error::graph_reference(format!(
                "node `{node}` ({}) does not produce a dataset",
                op.as_str()
            ))),
        }
    }
}
