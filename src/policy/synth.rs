use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    config::PolicyConfig,
    consts::{
        ANY_IPV4, CLUSTER_LOCAL_SUFFIX, DNS_NAMESPACE, DNS_POD_LABEL, DNS_POD_LABEL_VALUE, INTENDED_HOSTS_ANNOTATION, MANAGED_BY, MANAGED_BY_LABEL,
        NAME_LABEL, NAMESPACE_NAME_LABEL, NETPOL_SUFFIX, PRIVATE_RANGES, ROLE_LABEL, TRIGGER_NETPOL_SUFFIX, TRIGGER_ROLE, WORKFLOW_PORT,
    },
    derive::{EgressDestination, EgressRule, IngressRule, derive_egress_rules, derive_ingress_rules, dns_rules, external_host_ports},
    model::{TransportProtocol, Workflow},
};

use super::manifest::{EgressPolicyRule, IngressPolicyRule, IpBlock, LabelSelector, PolicyDocument, PolicyPeer, PolicyPort, PolicyType};

/// Renders derived rules into NetworkPolicy documents.
#[derive(Debug, Clone, Default)]
pub struct PolicySynthesizer {
    config: PolicyConfig,
}

impl PolicySynthesizer {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Policy for the workflow service pods, or `None` for a contract-less workflow.
    ///
    /// An empty contract still yields DNS-only egress.
    pub fn generate_network_policy(
        &self,
        workflow: &Workflow,
        namespace: &str,
    ) -> Option<PolicyDocument> {
        let contract = workflow.contract.as_ref()?;

        let egress_rules = derive_egress_rules(Some(contract));
        let mut ingress_rules = derive_ingress_rules(workflow);
        ingress_rules.push(IngressRule::from_namespace(WORKFLOW_PORT, &self.config.control_plane_namespace).with_pod_label(NAME_LABEL, &self.config.control_plane_app));
        if workflow.has_webhook_trigger() {
            ingress_rules.push(IngressRule::from_namespace(WORKFLOW_PORT, &self.config.ingress_gateway_namespace));
        }

        let mut doc = PolicyDocument::new(format!("{}{}", workflow.name, NETPOL_SUFFIX), namespace);
        doc.metadata.labels = identity_labels(&workflow.name);
        if let Some(hosts) = intended_hosts(&egress_rules) {
            doc.metadata.annotations.insert(INTENDED_HOSTS_ANNOTATION.to_string(), hosts);
        }
        doc.spec.pod_selector = LabelSelector::label(NAME_LABEL, &workflow.name);
        doc.spec.policy_types = vec![PolicyType::Ingress, PolicyType::Egress];
        doc.spec.egress = egress_rules.iter().map(render_egress).collect();
        doc.spec.ingress = ingress_rules.iter().map(render_ingress).collect();

        debug!(
            "generated {} in {}: {} egress, {} ingress rules",
            doc.name(),
            namespace,
            doc.spec.egress.len(),
            doc.spec.ingress.len()
        );
        Some(doc)
    }

    /// Egress-only policy for cron trigger pods, or `None` without a cron trigger.
    ///
    /// Trigger pods may resolve DNS and call the workflow service, nothing else.
    pub fn generate_trigger_network_policy(
        &self,
        workflow: &Workflow,
        namespace: &str,
    ) -> Option<PolicyDocument> {
        if !workflow.has_cron_trigger() {
            return None;
        }

        let mut doc = PolicyDocument::new(format!("{}{}", workflow.name, TRIGGER_NETPOL_SUFFIX), namespace);
        doc.metadata.labels = identity_labels(&workflow.name);
        doc.spec.pod_selector = LabelSelector::label(ROLE_LABEL, TRIGGER_ROLE);
        doc.spec.policy_types = vec![PolicyType::Egress];
        doc.spec.egress = dns_rules().iter().map(render_egress).collect();
        doc.spec.egress.push(EgressPolicyRule {
            to: vec![PolicyPeer {
                pod_selector: Some(LabelSelector::label(NAME_LABEL, &workflow.name)),
                ..Default::default()
            }],
            ports: vec![PolicyPort {
                protocol: TransportProtocol::Tcp,
                port: Some(WORKFLOW_PORT),
            }],
        });

        debug!("generated {} in {}", doc.name(), namespace);
        Some(doc)
    }
}

/// [`PolicySynthesizer::generate_network_policy`] with default settings.
pub fn generate_network_policy(
    workflow: &Workflow,
    namespace: &str,
) -> Option<PolicyDocument> {
    PolicySynthesizer::default().generate_network_policy(workflow, namespace)
}

/// [`PolicySynthesizer::generate_trigger_network_policy`] with default settings.
pub fn generate_trigger_network_policy(
    workflow: &Workflow,
    namespace: &str,
) -> Option<PolicyDocument> {
    PolicySynthesizer::default().generate_trigger_network_policy(workflow, namespace)
}

fn identity_labels(workflow: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(NAME_LABEL.to_string(), workflow.to_string()), (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string())])
}

fn intended_hosts(rules: &[EgressRule]) -> Option<String> {
    let hosts = external_host_ports(rules);
    if hosts.is_empty() { None } else { Some(hosts.join(",")) }
}

/// Namespace of a `svc.ns.svc.cluster.local` host.
fn service_namespace(host: &str) -> Option<&str> {
    let service = host.strip_suffix(CLUSTER_LOCAL_SUFFIX)?;
    let (_, rest) = service.split_once('.')?;
    let namespace = rest.split('.').next()?;
    if namespace.is_empty() { None } else { Some(namespace) }
}

fn render_egress(rule: &EgressRule) -> EgressPolicyRule {
    let peer = if rule.is_dns() {
        PolicyPeer {
            pod_selector: Some(LabelSelector::label(DNS_POD_LABEL, DNS_POD_LABEL_VALUE)),
            namespace_selector: Some(LabelSelector::label(NAMESPACE_NAME_LABEL, DNS_NAMESPACE)),
            ip_block: None,
        }
    } else {
        match &rule.destination {
            EgressDestination::Cidr(cidr) => PolicyPeer {
                ip_block: Some(IpBlock {
                    cidr: cidr.to_string(),
                    except: Vec::new(),
                }),
                ..Default::default()
            },
            EgressDestination::Host(host) => match service_namespace(host) {
                Some(namespace) => PolicyPeer {
                    namespace_selector: Some(LabelSelector::label(NAMESPACE_NAME_LABEL, namespace)),
                    ..Default::default()
                },
                None => PolicyPeer {
                    ip_block: Some(IpBlock {
                        cidr: ANY_IPV4.to_string(),
                        except: PRIVATE_RANGES.iter().map(ToString::to_string).collect(),
                    }),
                    ..Default::default()
                },
            },
        }
    };

    EgressPolicyRule {
        to: vec![peer],
        ports: match rule.port {
            Some(port) => vec![PolicyPort {
                protocol: rule.protocol,
                port: Some(port),
            }],
            None => Vec::new(),
        },
    }
}

fn render_ingress(rule: &IngressRule) -> IngressPolicyRule {
    let peer = PolicyPeer {
        pod_selector: match (&rule.from_labels, &rule.from_namespace_labels) {
            (Some(labels), _) => Some(LabelSelector::labels(labels.clone())),
            (None, None) => Some(LabelSelector::all()),
            (None, Some(_)) => None,
        },
        namespace_selector: rule.from_namespace_labels.clone().map(LabelSelector::labels),
        ip_block: None,
    };

    IngressPolicyRule {
        from: vec![peer],
        ports: vec![PolicyPort {
            protocol: rule.protocol,
            port: Some(rule.port),
        }],
    }
}
