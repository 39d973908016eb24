//! Graph construction: node records, output handles and name allocation.
//!
//! A [`Graph`] only ever grows. Every node has at most one output, addressed as `<node>:0`, and
//! handles carry the id of the graph that produced them so foreign tensors can be rejected.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use super::def::{GraphDef, NodeDef};
use super::NamePolicy;
use crate::env;
use crate::error::{Error, Result};
use crate::tensor::{DType, HostTensor, Shape};
use crate::types::TensorType;
use crate::value::Structure;

static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(usize);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Operation kinds the graph knows how to record and evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Placeholder,
    Const,
    VariableV2,
    Identity,
    NoOp,
    TensorDataset,
    TensorSliceDataset,
    RangeDataset,
    ConcatenateDataset,
    TakeDataset,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Placeholder => "Placeholder",
            Op::Const => "Const",
            Op::VariableV2 => "VariableV2",
            Op::Identity => "Identity",
            Op::NoOp => "NoOp",
            Op::TensorDataset => "TensorDataset",
            Op::TensorSliceDataset => "TensorSliceDataset",
            Op::RangeDataset => "RangeDataset",
            Op::ConcatenateDataset => "ConcatenateDataset",
            Op::TakeDataset => "TakeDataset",
        }
    }

    /// Ops whose output is a dataset variant.
    pub fn is_dataset(self) -> bool {
        matches!(
            self,
            Op::TensorDataset
                | Op::TensorSliceDataset
                | Op::RangeDataset
                | Op::ConcatenateDataset
                | Op::TakeDataset
        )
    }
}

/// Symbolic reference to a node output.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorHandle {
    graph: GraphId,
    node: String,
    index: usize,
    dtype: DType,
    shape: Shape,
    op: Op,
    is_ref: bool,
}

impl TensorHandle {
    /// Tensor name in `node:index` form.
    pub fn name(&self) -> String {
        format!("{}:{}", self.node, self.index)
    }

    pub fn node_name(&self) -> &str {
        &self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Op of the producing node.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Raw variable outputs are reference handles and must be read before use.
    pub fn is_ref(&self) -> bool {
        self.is_ref
    }

    pub fn tensor_type(&self) -> TensorType {
        TensorType::new(self.dtype, self.shape.clone())
    }
}

impl fmt::Display for TensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.name(), self.dtype)?;
        if self.is_ref {
            f.write_str("_ref")?;
        }
        write!(f, "{})", self.shape)
    }
}

/// Mutable state living in a graph; its raw handle is a reference tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    handle: TensorHandle,
}

impl Variable {
    pub fn handle(&self) -> &TensorHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.node_name()
    }

    /// Adds an `Identity` node `<name>/read` producing the current value.
    pub fn read_value(&self, graph: &mut Graph) -> Result<TensorHandle> {
        let read_name = format!("{}/read", self.handle.node);
        graph.identity(&self.handle, Some(&read_name))
    }
}

/// Host data attached to a node for evaluation.
#[derive(Debug, Clone)]
pub(crate) enum NodePayload {
    None,
    Value(HostTensor),
    Element(Structure<HostTensor>),
    Slices {
        slices: Structure<HostTensor>,
        rows: usize,
    },
    Range { start: i64, stop: i64, step: i64 },
    Count(i64),
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub(crate) name: String,
    pub(crate) op: Op,
    pub(crate) inputs: Vec<String>,
    pub(crate) output: Option<TensorHandle>,
    pub(crate) payload: NodePayload,
}

/// Append-only dataflow graph.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    nodes: Vec<NodeRecord>,
    index: HashMap<String, usize>,
    name_policy: NamePolicy,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Empty graph using the process-wide default [`NamePolicy`].
    pub fn new() -> Self {
        Self::with_name_policy(env::default_name_policy())
    }

    pub fn with_name_policy(name_policy: NamePolicy) -> Self {
        let id = GraphId(GRAPH_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed));
        Graph {
            id,
            nodes: Vec::new(),
            index: HashMap::new(),
            name_policy,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name_policy(&self) -> NamePolicy {
        self.name_policy
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `tensor` was produced by this graph.
    pub fn contains(&self, tensor: &TensorHandle) -> bool {
        tensor.graph == self.id
    }

    /// Resolves `base` into a free node name according to the graph's [`NamePolicy`].
    pub fn unique_name(&self, base: &str) -> Result<String> {
        if base.is_empty() || base.starts_with('^') || base.contains(':') {
            return Err(Error::graph_reference(format!(
                "`{base}` is not a valid node name"
            )));
        }
        if !self.index.contains_key(base) {
            return Ok(base.to_string());
        }
        if self.name_policy == NamePolicy::Reject {
            return Err(Error::NameCollision {
                name: base.to_string(),
            });
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !self.index.contains_key(&candidate) {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    pub fn placeholder(&mut self, name: &str, dtype: DType, shape: Shape) -> Result<TensorHandle> {
        self.add_tensor_node(name, Op::Placeholder, Vec::new(), dtype, shape, NodePayload::None)
    }

    /// Embeds a host value; the node is named `Const` unless a name is given.
    pub fn constant(&mut self, name: Option<&str>, value: HostTensor) -> Result<TensorHandle> {
        let dtype = value.dtype();
        let shape = value.shape();
        self.add_tensor_node(
            name.unwrap_or("Const"),
            Op::Const,
            Vec::new(),
            dtype,
            shape,
            NodePayload::Value(value),
        )
    }

    pub fn variable(&mut self, name: &str, initial: HostTensor) -> Result<Variable> {
        let dtype = initial.dtype();
        let shape = initial.shape();
        let handle = self.add_tensor_node(
            name,
            Op::VariableV2,
            Vec::new(),
            dtype,
            shape,
            NodePayload::Value(initial),
        )?;
        Ok(Variable { handle })
    }

    /// Forwards `input` unchanged; reading through identity drops the reference flag.
    pub fn identity(&mut self, input: &TensorHandle, name: Option<&str>) -> Result<TensorHandle> {
        self.ensure_owned(input)?;
        self.add_tensor_node(
            name.unwrap_or("Identity"),
            Op::Identity,
            vec![input.name()],
            input.dtype,
            input.shape.clone(),
            NodePayload::None,
        )
    }

    /// Adds an output-less node that runs after every node in `control_inputs`.
    pub fn no_op(&mut self, name: &str, control_inputs: &[&str]) -> Result<String> {
        for input in control_inputs {
            if !self.index.contains_key(*input) {
                return Err(Error::graph_reference(format!(
                    "control input `{input}` is not a node of {}",
                    self.id
                )));
            }
        }
        let name = self.unique_name(name)?;
        self.insert(NodeRecord {
            name: name.clone(),
            op: Op::NoOp,
            inputs: control_inputs
                .iter()
                .map(|input| format!("^{input}"))
                .collect(),
            output: None,
            payload: NodePayload::None,
        });
        Ok(name)
    }

    pub(crate) fn tensor_dataset(&mut self, element: Structure<HostTensor>) -> Result<TensorHandle> {
        self.add_variant_node(Op::TensorDataset, Vec::new(), NodePayload::Element(element))
    }

    pub(crate) fn tensor_slice_dataset(
        &mut self,
        slices: Structure<HostTensor>,
        rows: usize,
    ) -> Result<TensorHandle> {
        self.add_variant_node(
            Op::TensorSliceDataset,
            Vec::new(),
            NodePayload::Slices { slices, rows },
        )
    }

    pub(crate) fn range_dataset(&mut self, start: i64, stop: i64, step: i64) -> Result<TensorHandle> {
        self.add_variant_node(
            Op::RangeDataset,
            Vec::new(),
            NodePayload::Range { start, stop, step },
        )
    }

    pub(crate) fn concatenate_dataset(
        &mut self,
        first: &TensorHandle,
        second: &TensorHandle,
    ) -> Result<TensorHandle> {
        self.ensure_owned(first)?;
        self.ensure_owned(second)?;
        self.add_variant_node(
            Op::ConcatenateDataset,
            vec![first.name(), second.name()],
            NodePayload::None,
        )
    }

    pub(crate) fn take_dataset(&mut self, input: &TensorHandle, count: i64) -> Result<TensorHandle> {
        self.ensure_owned(input)?;
        self.add_variant_node(Op::TakeDataset, vec![input.name()], NodePayload::Count(count))
    }

    /// Looks up a tensor by its `node:index` name.
    pub fn get_tensor_by_name(&self, name: &str) -> Result<TensorHandle> {
        let invalid = || {
            Error::graph_reference(format!("`{name}` is not a tensor name of the form node:index"))
        };
        let (node, index) = name.rsplit_once(':').ok_or_else(invalid)?;
        let index: usize = index.parse().map_err(|_| invalid())?;
        let record = self.node_record(node).ok_or_else(|| {
            Error::graph_reference(format!("node `{node}` is not part of {}", self.id))
        })?;
        match &record.output {
            Some(handle) if handle.index == index => Ok(handle.clone()),
            _ => Err(Error::graph_reference(format!(
                "node `{node}` has no output {index}"
            ))),
        }
    }

    /// Every output tensor of the graph keyed by its name.
    pub fn tensor_table(&self) -> HashMap<String, TensorHandle> {
        self.nodes
            .iter()
            .filter_map(|record| record.output.as_ref())
            .map(|handle| (handle.name(), handle.clone()))
            .collect()
    }

    /// Snapshot of the node list in insertion order.
    pub fn to_graph_def(&self) -> GraphDef {
        GraphDef::new(
            self.nodes
                .iter()
                .map(|record| {
                    NodeDef::new(&record.name, record.inputs.iter()).with_op(record.op.as_str())
                })
                .collect(),
        )
    }

    pub(crate) fn node_record(&self, name: &str) -> Option<&NodeRecord> {
        self.index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub(crate) fn ensure_owned(&self, tensor: &TensorHandle) -> Result<()> {
        if self.contains(tensor) {
            Ok(())
        } else {
            Err(Error::graph_reference(format!(
                "tensor {} belongs to {}, not {}",
                tensor.name(),
                tensor.graph,
                self.id
            )))
        }
    }

    fn add_variant_node(
        &mut self,
        op: Op,
        inputs: Vec<String>,
        payload: NodePayload,
    ) -> Result<TensorHandle> {
        self.add_tensor_node(op.as_str(), op, inputs, DType::Variant, Shape::scalar(), payload)
    }

    fn add_tensor_node(
        &mut self,
        base: &str,
        op: Op,
        inputs: Vec<String>,
        dtype: DType,
        shape: Shape,
        payload: NodePayload,
    ) -> Result<TensorHandle> {
        let name = self.unique_name(base)?;
        let handle = TensorHandle {
            graph: self.id,
            node: name.clone(),
            index: 0,
            dtype,
            shape,
            op,
            is_ref: op == Op::VariableV2,
        };
        tracing::trace!(node = %name, op = op.as_str(), graph = %self.id, "adding node");
        self.insert(NodeRecord {
            name,
            op,
            inputs,
            output: Some(handle.clone()),
            payload,
        });
        Ok(handle)
    }

    fn insert(&mut self, record: NodeRecord) {
        self.index.insert(record.name.clone(), self.nodes.len());
        self.nodes.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniquifies_repeated_names() -> Result<()> {
        let mut graph = Graph::with_name_policy(NamePolicy::Uniquify);
        let a = graph.placeholder("foo", DType::I32, Shape::scalar())?;
        let b = graph.placeholder("foo", DType::I32, Shape::scalar())?;
        let c = graph.placeholder("foo", DType::I32, Shape::scalar())?;
        assert_eq!(
            [a.name(), b.name(), c.name()],
            ["foo:0", "foo_1:0", "foo_2:0"]
        );
        Ok(())
    }

    #[test]
    fn reject_policy_reports_collision() -> Result<()> {
        let mut graph = Graph::with_name_policy(NamePolicy::Reject);
        graph.placeholder("foo", DType::I32, Shape::scalar())?;
        let err = graph
            .placeholder("foo", DType::Bool, Shape::scalar())
            .unwrap_err();
        assert!(matches!(err, Error::NameCollision { name } if name == "foo"));
        Ok(())
    }

    #[test]
    fn variable_reads_through_identity() -> Result<()> {
        let mut graph = Graph::new();
        let var = graph.variable("v", HostTensor::from(3i32))?;
        assert!(var.handle().is_ref());
        let read = var.read_value(&mut graph)?;
        assert_eq!(read.name(), "v/read:0");
        assert!(!read.is_ref());
        assert_eq!(read.op(), Op::Identity);
        Ok(())
    }

    #[test]
    fn foreign_tensor_is_rejected() -> Result<()> {
        let mut first = Graph::new();
        let mut second = Graph::new();
        let x = first.placeholder("x", DType::F32, Shape::scalar())?;
        assert!(matches!(
            second.identity(&x, None),
            Err(Error::GraphReference(_))
        ));
        Ok(())
    }
}
