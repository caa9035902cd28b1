use std::collections::{BTreeMap, HashMap};

use crate::{
    Result,
    graph::WorkflowGraph,
    model::{Contract, Edge, NodeSpec, Trigger},
    parser,
};

/// A validated workflow specification.
///
/// Built once by [`crate::parse`] (or by hand in tests) and never mutated by
/// derivation or synthesis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub name: String,
    /// `major.minor`
    pub version: String,
    pub description: String,
    pub triggers: Vec<Trigger>,
    pub nodes: HashMap<String, NodeSpec>,
    pub edges: Vec<Edge>,
    pub config: WorkflowConfig,
    pub deployment: DeploymentConfig,
    pub contract: Option<Contract>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Workflow {
    /// Parse and validate a YAML workflow document.
    pub fn from_yaml(s: &str) -> Result<Self> {
        parser::parse(s).map_err(Into::into)
    }

    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_trigger(
        mut self,
        trigger: Trigger,
    ) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_node(
        mut self,
        name: impl Into<String>,
        node: NodeSpec,
    ) -> Self {
        self.nodes.insert(name.into(), node);
        self
    }

    pub fn with_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    pub fn with_contract(
        mut self,
        contract: Contract,
    ) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn has_webhook_trigger(&self) -> bool {
        self.triggers.iter().any(Trigger::is_webhook)
    }

    pub fn has_cron_trigger(&self) -> bool {
        self.triggers.iter().any(Trigger::is_cron)
    }

    /// Node names in sorted order.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Directed graph over the nodes and the edges whose endpoints are declared.
    pub fn graph(&self) -> WorkflowGraph {
        WorkflowGraph::new(self)
    }
}

/// Execution settings; unknown keys are kept in `extras`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowConfig {
    pub timeout: Option<String>,
    pub retries: Option<u32>,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl WorkflowConfig {
    /// Flat map of typed fields and extras. Unset typed fields are omitted.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map: serde_json::Map<String, serde_json::Value> = self.extras.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        if let Some(timeout) = &self.timeout {
            map.insert("timeout".to_string(), serde_json::Value::from(timeout.clone()));
        }
        if let Some(retries) = self.retries {
            map.insert("retries".to_string(), serde_json::Value::from(retries));
        }
        map
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub namespace: Option<String>,
}
