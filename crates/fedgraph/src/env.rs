use std::env;
use std::sync::OnceLock;

use crate::graph::NamePolicy;

static FEDGRAPH_NAME_POLICY: OnceLock<NamePolicy> = OnceLock::new();

fn parse_name_policy(value: &str) -> Option<NamePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "uniquify" | "unique" | "suffix" => Some(NamePolicy::Uniquify),
        "reject" | "strict" | "error" => Some(NamePolicy::Reject),
        _ => None,
    }
}

/// Collision policy applied by [`Graph::new`](crate::graph::Graph::new).
pub(crate) fn default_name_policy() -> NamePolicy {
    *FEDGRAPH_NAME_POLICY.get_or_init(|| match env::var("FEDGRAPH_NAME_POLICY") {
        Ok(value) if !value.trim().is_empty() => parse_name_policy(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "ignoring unrecognized FEDGRAPH_NAME_POLICY");
            NamePolicy::Uniquify
        }),
        _ => NamePolicy::Uniquify,
    })
}
