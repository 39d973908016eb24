//! Serialized graph definitions consumed by the dependency analyzer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// One node of a serialized graph: name, op kind and ordered input references.
///
/// Inputs are either data references (`node` or `node:index`) or control references (`^node`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub input: Vec<String>,
}

impl NodeDef {
    pub fn new<S: Into<String>>(name: impl Into<String>, inputs: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            op: String::new(),
            input: inputs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = op.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphDef {
    #[serde(default)]
    pub node: Vec<NodeDef>,
}

impl GraphDef {
    pub fn new(node: Vec<NodeDef>) -> Self {
        Self { node }
    }

    pub fn node(&self, name: &str) -> Option<&NodeDef> {
        self.node.iter().find(|node| node.name == name)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(WireError::from)?)
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src).map_err(WireError::from)?)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self).map_err(WireError::from)?)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes).map_err(WireError::from)?)
    }
}

/// Compact `name(input,...)` listing, e.g. `foo(^abc),bar(foo,^abc)`.
impl fmt::Display for GraphDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, node) in self.node.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}({})", node.name, node.input.join(","))?;
        }
        Ok(())
    }
}
