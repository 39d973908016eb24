//! Dependency analysis over serialized graph definitions.
//!
//! Inputs reference other nodes as `node`, `node:index` (data edge) or `^node` (control edge).
//! Both edge kinds count as dependencies.

use std::collections::{BTreeSet, HashMap};

use super::def::{GraphDef, NodeDef};
use crate::error::{Error, Result};

/// Prefix marking a control input.
pub const CONTROL_MARKER: char = '^';

/// Bare node name of an input reference: strips a leading `^` and a trailing `:<index>`.
pub fn to_node_name(reference: &str) -> &str {
    let name = reference.strip_prefix(CONTROL_MARKER).unwrap_or(reference);
    match name.rsplit_once(':') {
        Some((node, index)) if index.bytes().all(|b| b.is_ascii_digit()) => node,
        _ => name,
    }
}

fn node_index(graph_def: &GraphDef) -> HashMap<&str, &NodeDef> {
    graph_def
        .node
        .iter()
        .map(|node| (node.name.as_str(), node))
        .collect()
}

fn unknown_node(name: &str) -> Error {
    Error::graph_reference(format!("node `{name}` is not part of the graph definition"))
}

/// Names of the nodes `node_name` lists among its own inputs.
pub fn direct_dependencies(graph_def: &GraphDef, node_name: &str) -> Result<BTreeSet<String>> {
    let node = graph_def
        .node(node_name)
        .ok_or_else(|| unknown_node(node_name))?;
    Ok(node
        .input
        .iter()
        .map(|input| to_node_name(input).to_string())
        .collect())
}

/// Every node reachable from `node_name` through its inputs, excluding the node itself.
pub fn get_deps_for_graph_node(graph_def: &GraphDef, node_name: &str) -> Result<BTreeSet<String>> {
    let nodes = node_index(graph_def);
    let root = nodes
        .get(node_name)
        .copied()
        .ok_or_else(|| unknown_node(node_name))?;
    let mut deps = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for input in &node.input {
            let dep = to_node_name(input);
            if dep == node_name || deps.contains(dep) {
                continue;
            }
            let dep_node = nodes.get(dep).copied().ok_or_else(|| {
                Error::graph_reference(format!(
                    "input `{input}` of node `{}` does not resolve to a node",
                    node.name
                ))
            })?;
            deps.insert(dep.to_string());
            stack.push(dep_node);
        }
    }
    Ok(deps)
}

/// Returns a copy of `graph_def` in which every node that does not feed `init_op` runs after it.
///
/// `init_op` may be given as a bare node name, a tensor name or a control reference. The init
/// node itself and its transitive dependencies are left untouched, as are nodes that already
/// carry a `^init_op` control input, so applying the rewrite twice changes nothing.
pub fn add_control_deps_for_init_op(graph_def: &GraphDef, init_op: &str) -> Result<GraphDef> {
    let init_op = to_node_name(init_op);
    let init_deps = get_deps_for_graph_node(graph_def, init_op)?;
    let control_input = format!("{CONTROL_MARKER}{init_op}");
    let mut out = graph_def.clone();
    let mut added = 0usize;
    for node in &mut out.node {
        if node.name == init_op
            || init_deps.contains(&node.name)
            || node.input.iter().any(|input| *input == control_input)
        {
            continue;
        }
        node.input.push(control_input.clone());
        added += 1;
    }
    tracing::debug!(init_op, added, "added init control dependencies");
    Ok(out)
}
