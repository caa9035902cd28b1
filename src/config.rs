use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    Result,
    consts::{
        DEFAULT_CONTROL_PLANE_APP, DEFAULT_CONTROL_PLANE_NAMESPACE, DEFAULT_INGRESS_GATEWAY_NAMESPACE, DEFAULT_MODULE_PROXY_HOST, DEFAULT_NAMESPACE,
    },
    error::FlowpactError,
    model::Workflow,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// namespace used when neither the caller nor the workflow names one
    pub default_namespace: String,
    /// policy synthesis settings
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    /// namespace of the management plane allowed to reach every workflow
    pub control_plane_namespace: String,
    /// `app.kubernetes.io/name` of the management plane pods
    pub control_plane_app: String,
    /// namespace of the ingress gateway admitted for webhook workflows
    pub ingress_gateway_namespace: String,
    /// module-resolution proxy `host:port`
    pub module_proxy_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            control_plane_namespace: DEFAULT_CONTROL_PLANE_NAMESPACE.to_string(),
            control_plane_app: DEFAULT_CONTROL_PLANE_APP.to_string(),
            ingress_gateway_namespace: DEFAULT_INGRESS_GATEWAY_NAMESPACE.to_string(),
            module_proxy_host: DEFAULT_MODULE_PROXY_HOST.to_string(),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| FlowpactError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        if config.policy.control_plane_namespace.is_empty() {
            return Err(FlowpactError::Config("policy.control_plane_namespace must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Explicit namespace, else the workflow's `deployment.namespace`, else `default_namespace`.
    pub fn resolve_namespace(
        &self,
        explicit: Option<&str>,
        workflow: &Workflow,
    ) -> String {
        explicit
            .filter(|ns| !ns.is_empty())
            .or_else(|| workflow.deployment.namespace.as_deref().filter(|ns| !ns.is_empty()))
            .unwrap_or(&self.default_namespace)
            .to_string()
    }
}
