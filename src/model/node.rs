use std::collections::BTreeMap;

use serde::Serialize;

/// A single execution step: the source file it runs and any named capabilities.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSpec {
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<String, String>,
}

impl NodeSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            capabilities: BTreeMap::new(),
        }
    }
}
