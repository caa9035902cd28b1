use std::collections::{BTreeMap, HashMap};

use crate::{consts::CONTRACT_VERSION, model::Dependency};

/// Declared external dependencies and policy overrides of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub version: String,
    /// dependency name -> dependency; iteration order is not meaningful
    pub dependencies: HashMap<String, Dependency>,
    pub network_policy: Option<NetworkPolicyOverride>,
    /// `x-*` and other unrecognized keys
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            dependencies: HashMap::new(),
            network_policy: None,
            extensions: BTreeMap::new(),
        }
    }
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependency(
        mut self,
        name: impl Into<String>,
        dependency: Dependency,
    ) -> Self {
        self.dependencies.insert(name.into(), dependency);
        self
    }

    pub fn with_egress_override(
        mut self,
        egress: EgressOverride,
    ) -> Self {
        self.network_policy.get_or_insert_with(NetworkPolicyOverride::default).additional_egress.push(egress);
        self
    }

    /// Dependency names in sorted order.
    pub fn dependency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn additional_egress(&self) -> &[EgressOverride] {
        self.network_policy.as_ref().map(|np| np.additional_egress.as_slice()).unwrap_or(&[])
    }
}

/// Manual egress additions beyond what the dependencies derive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkPolicyOverride {
    pub additional_egress: Vec<EgressOverride>,
}

/// A CIDR egress rule; `ports` are `"443"` / `"443/TCP"` strings, empty for any port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EgressOverride {
    pub to_cidr: String,
    pub ports: Vec<String>,
    pub reason: Option<String>,
}

impl EgressOverride {
    pub fn new(to_cidr: impl Into<String>) -> Self {
        Self {
            to_cidr: to_cidr.into(),
            ports: Vec::new(),
            reason: None,
        }
    }

    pub fn with_port(
        mut self,
        port: impl Into<String>,
    ) -> Self {
        self.ports.push(port.into());
        self
    }
}
