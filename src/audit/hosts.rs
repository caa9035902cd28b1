//! `host:port` views of a contract and of a live policy, in the same shape so
//! they can be compared directly.

use crate::{
    derive::{derive_egress_rules, external_host_ports},
    model::Workflow,
    policy::PolicyDocument,
};

/// External `host:port` targets the workflow's contract asks for.
///
/// DNS, cluster-internal services and CIDR rules are left out, matching what
/// the synthesizer writes into the intended-hosts annotation.
pub fn contract_egress_hosts(workflow: &Workflow) -> Vec<String> {
    match workflow.contract.as_ref() {
        Some(contract) => external_host_ports(&derive_egress_rules(Some(contract))),
        None => Vec::new(),
    }
}

/// Hosts recorded in a live policy's intended-hosts annotation.
pub fn live_egress_hosts(document: &PolicyDocument) -> Vec<String> {
    document
        .intended_hosts_annotation()
        .map(|raw| raw.split(',').map(str::trim).filter(|h| !h.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        consts::INTENDED_HOSTS_ANNOTATION,
        model::{Contract, Dependency, EgressOverride},
        policy::generate_network_policy,
    };

    #[test]
    fn test_contract_hosts_skip_internal_and_cidr() {
        let wf = Workflow::new("digest", "1.0").with_contract(
            Contract::new()
                .with_dependency("github", Dependency::https("api.github.com"))
                .with_dependency("db", Dependency::postgresql("pg.data.svc.cluster.local", "app", "svc"))
                .with_dependency("bus", Dependency::nats("nats.example.com", "events"))
                .with_egress_override(EgressOverride::new("10.0.0.0/8").with_port("443")),
        );
        assert_eq!(contract_egress_hosts(&wf), vec!["api.github.com:443", "nats.example.com:4222"]);
        assert!(contract_egress_hosts(&Workflow::new("bare", "1.0")).is_empty());
    }

    #[test]
    fn test_live_hosts_round_trip_generated_policy() {
        let wf = Workflow::new("digest", "1.0").with_contract(
            Contract::new()
                .with_dependency("github", Dependency::https("api.github.com"))
                .with_dependency("slack", Dependency::https("hooks.slack.com")),
        );
        let doc = generate_network_policy(&wf, "prod").unwrap();
        assert_eq!(live_egress_hosts(&doc), contract_egress_hosts(&wf));
    }

    #[test]
    fn test_live_hosts_tolerates_spacing() {
        let mut doc = PolicyDocument::new("digest-netpol", "prod");
        assert!(live_egress_hosts(&doc).is_empty());

        doc.metadata.annotations.insert(INTENDED_HOSTS_ANNOTATION.to_string(), " jsr.io:443 , ,api.github.com:443,".to_string());
        assert_eq!(live_egress_hosts(&doc), vec!["jsr.io:443", "api.github.com:443"]);
    }
}
