//! Raw document shapes as they appear in `workflow.yaml`.
//!
//! Every field is optional at this layer so that a single pass can report all
//! missing or malformed values; the validator turns these into the typed model.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, de::Error as _};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct WorkflowDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    /// `version: 1.0` is read as the string `"1.0"`
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    #[serde(deserialize_with = "scalar_string")]
    pub description: String,
    pub triggers: Vec<TriggerDocument>,
    /// sorted so node errors come out in a stable order
    pub nodes: BTreeMap<String, NodeDocument>,
    pub edges: Vec<EdgeDocument>,
    pub config: ConfigDocument,
    pub deployment: DeploymentDocument,
    pub contract: Option<ContractDocument>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TriggerDocument {
    #[serde(rename = "type", deserialize_with = "scalar_string")]
    pub kind: String,
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub schedule: String,
    #[serde(deserialize_with = "scalar_string")]
    pub path: String,
    #[serde(deserialize_with = "scalar_string")]
    pub subject: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NodeDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub path: String,
    pub capabilities: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EdgeDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub from: String,
    #[serde(deserialize_with = "scalar_string")]
    pub to: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub timeout: String,
    pub retries: Option<u32>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DeploymentDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub namespace: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ContractDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub dependencies: Option<BTreeMap<String, DependencyDocument>>,
    #[serde(rename = "networkPolicy", alias = "networkPolicyOverride")]
    pub network_policy: Option<NetworkPolicyDocument>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DependencyDocument {
    #[serde(deserialize_with = "scalar_string")]
    pub protocol: String,
    /// `dynamic-target`, or empty for a fixed host
    #[serde(rename = "type", deserialize_with = "scalar_string")]
    pub kind: String,
    pub auth: Option<AuthDocument>,
    #[serde(deserialize_with = "scalar_string")]
    pub cidr: String,
    #[serde(rename = "dynPorts")]
    pub dyn_ports: Vec<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub host: String,
    pub port: Option<i64>,
    #[serde(deserialize_with = "scalar_string")]
    pub database: String,
    #[serde(deserialize_with = "scalar_string")]
    pub user: String,
    #[serde(deserialize_with = "scalar_string")]
    pub subject: String,
    #[serde(deserialize_with = "scalar_string")]
    pub container: String,
    /// jsr/npm package version
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AuthDocument {
    #[serde(rename = "type", deserialize_with = "scalar_string")]
    pub kind: String,
    #[serde(deserialize_with = "scalar_string")]
    pub secret: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NetworkPolicyDocument {
    #[serde(rename = "additionalEgress")]
    pub additional_egress: Vec<EgressDocument>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EgressDocument {
    #[serde(rename = "toCIDR", deserialize_with = "scalar_string")]
    pub to_cidr: String,
    pub ports: Vec<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub reason: String,
}

/// Accept any YAML scalar where a string is expected; null becomes empty.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(String::new()),
        Some(serde_yaml::Value::String(s)) => Ok(s),
        Some(serde_yaml::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!("expected a scalar value, got {:?}", other))),
    }
}
