use std::collections::BTreeMap;

use tracing::trace;

use crate::{
    consts::{NAMESPACE_NAME_LABEL, ROLE_LABEL, TRIGGER_ROLE, WORKFLOW_PORT},
    model::{TransportProtocol, Workflow},
};

/// One allowed inbound flow to the workflow service.
///
/// `from_labels: None` admits any pod in the namespace. When both label sets
/// are present a peer must match both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub port: u16,
    pub protocol: TransportProtocol,
    pub from_labels: Option<BTreeMap<String, String>>,
    pub from_namespace_labels: Option<BTreeMap<String, String>>,
}

impl IngressRule {
    pub fn open(port: u16) -> Self {
        Self {
            port,
            protocol: TransportProtocol::Tcp,
            from_labels: None,
            from_namespace_labels: None,
        }
    }

    pub fn from_trigger_pods(port: u16) -> Self {
        Self {
            port,
            protocol: TransportProtocol::Tcp,
            from_labels: Some(BTreeMap::from([(ROLE_LABEL.to_string(), TRIGGER_ROLE.to_string())])),
            from_namespace_labels: None,
        }
    }

    /// Admit traffic from the namespace named `namespace`.
    pub fn from_namespace(
        port: u16,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            port,
            protocol: TransportProtocol::Tcp,
            from_labels: None,
            from_namespace_labels: Some(BTreeMap::from([(NAMESPACE_NAME_LABEL.to_string(), namespace.into())])),
        }
    }

    /// Narrow the peer to pods carrying `key=value`.
    pub fn with_pod_label(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.from_labels.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.from_labels.is_none() && self.from_namespace_labels.is_none()
    }
}

/// The single ingress rule implied by a workflow's triggers.
///
/// Any webhook trigger opens the service port to the whole namespace, since
/// routed external traffic carries no pod labels. Otherwise only trigger pods
/// (cron, manual and queue jobs) may call in.
pub fn derive_ingress_rules(workflow: &Workflow) -> Vec<IngressRule> {
    let rule = if workflow.has_webhook_trigger() {
        IngressRule::open(WORKFLOW_PORT)
    } else {
        IngressRule::from_trigger_pods(WORKFLOW_PORT)
    };

    trace!("derived ingress for {}: open={}", workflow.name, rule.is_open());
    vec![rule]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Trigger;

    #[test]
    fn test_webhook_opens_ingress() {
        let wf = Workflow::new("hooks", "1.0").with_trigger(Trigger::cron("* * * * *")).with_trigger(Trigger::webhook("/in"));
        let rules = derive_ingress_rules(&wf);
        assert_eq!(rules, vec![IngressRule::open(8080)]);
    }

    #[test]
    fn test_non_webhook_is_label_scoped() {
        for trigger in [Trigger::manual(), Trigger::cron("0 * * * *"), Trigger::queue("jobs.new")] {
            let wf = Workflow::new("scoped", "1.0").with_trigger(trigger);
            let rules = derive_ingress_rules(&wf);
            assert_eq!(rules.len(), 1);
            let labels = rules[0].from_labels.as_ref().unwrap();
            assert_eq!(labels.get("flowpact.dev/role").map(String::as_str), Some("trigger"));
            assert_eq!(rules[0].port, 8080);
        }
    }

    #[test]
    fn test_one_rule_regardless_of_trigger_count() {
        let wf = Workflow::new("many", "1.0")
            .with_trigger(Trigger::manual())
            .with_trigger(Trigger::cron("0 * * * *"))
            .with_trigger(Trigger::queue("a"))
            .with_trigger(Trigger::queue("b"));
        assert_eq!(derive_ingress_rules(&wf).len(), 1);
    }

    #[test]
    fn test_namespace_rule_with_pod_label() {
        let rule = IngressRule::from_namespace(8080, "flowpact-system").with_pod_label("app.kubernetes.io/name", "flowpact-mcp");
        assert!(!rule.is_open());
        assert_eq!(rule.from_namespace_labels.unwrap().get("kubernetes.io/metadata.name").map(String::as_str), Some("flowpact-system"));
        assert_eq!(rule.from_labels.unwrap().get("app.kubernetes.io/name").map(String::as_str), Some("flowpact-mcp"));
    }
}
