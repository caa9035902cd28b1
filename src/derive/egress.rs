use std::{cmp::Ordering, collections::HashSet, fmt};

use ipnet::IpNet;
use tracing::trace;

use crate::{
    consts::{CLUSTER_LOCAL_SUFFIX, DNS_HOST, DNS_PORT},
    model::{Contract, DependencyTarget, PortSpec, TransportProtocol},
};

/// Where an egress rule points: a resolvable host name or a CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EgressDestination {
    Host(String),
    Cidr(IpNet),
}

impl fmt::Display for EgressDestination {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            EgressDestination::Host(host) => f.write_str(host),
            EgressDestination::Cidr(cidr) => write!(f, "{}", cidr),
        }
    }
}

/// One allowed outbound flow. `port: None` means any port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EgressRule {
    pub destination: EgressDestination,
    pub port: Option<u16>,
    pub protocol: TransportProtocol,
}

impl EgressRule {
    pub fn host(
        host: impl Into<String>,
        port: u16,
        protocol: TransportProtocol,
    ) -> Self {
        Self {
            destination: EgressDestination::Host(host.into()),
            port: Some(port),
            protocol,
        }
    }

    pub fn cidr(
        cidr: IpNet,
        port: Option<u16>,
        protocol: TransportProtocol,
    ) -> Self {
        Self {
            destination: EgressDestination::Cidr(cidr),
            port,
            protocol,
        }
    }

    pub fn host_name(&self) -> Option<&str> {
        match &self.destination {
            EgressDestination::Host(host) => Some(host),
            EgressDestination::Cidr(_) => None,
        }
    }

    pub fn is_dns(&self) -> bool {
        self.port == Some(DNS_PORT) && self.host_name() == Some(DNS_HOST)
    }

    pub fn is_cidr(&self) -> bool {
        matches!(self.destination, EgressDestination::Cidr(_))
    }

    /// `*.svc.cluster.local` hosts, reachable by namespace selector.
    pub fn is_cluster_internal(&self) -> bool {
        self.host_name().is_some_and(|h| h.ends_with(CLUSTER_LOCAL_SUFFIX))
    }

    /// Fixed host outside the cluster; these are recorded in the intended-hosts annotation.
    pub fn is_external_host(&self) -> bool {
        !self.is_dns() && !self.is_cidr() && !self.is_cluster_internal()
    }

    /// `host:port`, or `None` for CIDR and any-port rules.
    pub fn host_port(&self) -> Option<String> {
        Some(format!("{}:{}", self.host_name()?, self.port?))
    }

    fn sort_cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.destination
            .to_string()
            .cmp(&other.destination.to_string())
            .then(self.port.cmp(&other.port))
            .then(self.protocol.cmp(&other.protocol))
    }
}

/// Deduplicated `host:port` of the external fixed-host rules, in rule order.
///
/// This is what the intended-hosts annotation records and what drift audit
/// compares against: DNS, cluster-internal and CIDR rules are left out.
pub fn external_host_ports(rules: &[EgressRule]) -> Vec<String> {
    let mut seen = HashSet::new();
    rules
        .iter()
        .filter(|r| r.is_external_host() && r.port != Some(DNS_PORT))
        .filter_map(EgressRule::host_port)
        .filter(|hp| seen.insert(hp.clone()))
        .collect()
}

/// The two rules every workflow gets, UDP first.
pub fn dns_rules() -> [EgressRule; 2] {
    [EgressRule::host(DNS_HOST, DNS_PORT, TransportProtocol::Udp), EgressRule::host(DNS_HOST, DNS_PORT, TransportProtocol::Tcp)]
}

/// Egress rules a contract needs.
///
/// Always starts with the two DNS rules. The rest is sorted by
/// (destination, port, protocol) and deduplicated:
/// fixed hosts at their resolved port over TCP, one rule per port of each
/// dynamic target, and the `additionalEgress` overrides. jsr/npm imports go
/// through the module proxy and never produce a rule here.
pub fn derive_egress_rules(contract: Option<&Contract>) -> Vec<EgressRule> {
    let mut rules: Vec<EgressRule> = dns_rules().into();
    let Some(contract) = contract else {
        return rules;
    };

    let mut derived = Vec::with_capacity(contract.dependencies.len());
    for dep in contract.dependencies.values() {
        match &dep.target {
            DependencyTarget::DynamicTarget { cidr, ports, .. } => {
                derived.extend(ports.iter().map(|p| EgressRule::cidr(*cidr, Some(p.port), p.protocol)));
            }
            target => {
                if let (Some(host), Some(port)) = (target.host().filter(|h| !h.is_empty()), target.resolved_port()) {
                    derived.push(EgressRule::host(host, port, TransportProtocol::Tcp));
                }
            }
        }
    }

    for egress in contract.additional_egress() {
        let Ok(cidr) = egress.to_cidr.parse::<IpNet>() else {
            continue;
        };
        let ports: Vec<PortSpec> = egress.ports.iter().filter_map(|p| p.parse().ok()).collect();
        if ports.is_empty() {
            derived.push(EgressRule::cidr(cidr, None, TransportProtocol::Tcp));
        } else {
            derived.extend(ports.into_iter().map(|p| EgressRule::cidr(cidr, Some(p.port), p.protocol)));
        }
    }

    derived.sort_by(EgressRule::sort_cmp);
    derived.dedup();
    rules.extend(derived);

    trace!("derived {} egress rules from {} dependencies", rules.len(), contract.dependencies.len());
    rules
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Dependency, EgressOverride};

    #[test]
    fn test_dns_always_present() {
        let rules = derive_egress_rules(None);
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(EgressRule::is_dns));
        assert_eq!(rules[0].protocol, TransportProtocol::Udp);
        assert_eq!(rules[1].protocol, TransportProtocol::Tcp);

        assert_eq!(derive_egress_rules(Some(&Contract::new())), rules);
    }

    #[test]
    fn test_fixed_hosts_sorted_with_defaults() {
        let contract = Contract::new()
            .with_dependency("pg", Dependency::postgresql("db.internal", "app", "svc"))
            .with_dependency("github", Dependency::https("api.github.com"))
            .with_dependency("bus", Dependency::nats("nats.example.com", "events").with_port(4223));

        let rules = derive_egress_rules(Some(&contract));
        let rendered: Vec<String> = rules[2..].iter().filter_map(EgressRule::host_port).collect();
        assert_eq!(rendered, vec!["api.github.com:443", "db.internal:5432", "nats.example.com:4223"]);
        assert!(rules[2..].iter().all(|r| r.protocol == TransportProtocol::Tcp));
    }

    #[test]
    fn test_module_and_portless_dependencies_skipped() {
        let contract = Contract::new()
            .with_dependency("postgres-driver", Dependency::jsr("@db/postgres"))
            .with_dependency("zod", Dependency::npm("zod"))
            .with_dependency("files", Dependency::blob("acct.blob.core.windows.net", "reports"))
            .with_dependency("broken", Dependency::https(""));
        assert_eq!(derive_egress_rules(Some(&contract)).len(), 2);
    }

    #[test]
    fn test_dynamic_target_rule_per_port() {
        let contract = Contract::new().with_dependency(
            "probes",
            Dependency::dynamic_target(
                "https",
                "0.0.0.0/0".parse().unwrap(),
                vec![
                    PortSpec::tcp(443),
                    PortSpec {
                        port: 53,
                        protocol: TransportProtocol::Udp,
                    },
                ],
            ),
        );
        let rules = derive_egress_rules(Some(&contract));
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[2], EgressRule::cidr("0.0.0.0/0".parse().unwrap(), Some(53), TransportProtocol::Udp));
        assert_eq!(rules[3], EgressRule::cidr("0.0.0.0/0".parse().unwrap(), Some(443), TransportProtocol::Tcp));
        assert!(!rules[2].is_external_host());
    }

    #[test]
    fn test_overrides_appended() {
        let contract = Contract::new()
            .with_egress_override(EgressOverride::new("10.20.0.0/16").with_port("5432").with_port("53/UDP"))
            .with_egress_override(EgressOverride::new("192.168.1.0/24"));
        let rules = derive_egress_rules(Some(&contract));
        assert_eq!(
            rules[2..].to_vec(),
            vec![
                EgressRule::cidr("10.20.0.0/16".parse().unwrap(), Some(53), TransportProtocol::Udp),
                EgressRule::cidr("10.20.0.0/16".parse().unwrap(), Some(5432), TransportProtocol::Tcp),
                EgressRule::cidr("192.168.1.0/24".parse().unwrap(), None, TransportProtocol::Tcp),
            ]
        );
    }

    #[test]
    fn test_deterministic_across_insertion_order() {
        let names = ["alpha", "bravo", "charlie", "delta", "echo"];
        let forward = names.iter().fold(Contract::new(), |c, n| c.with_dependency(*n, Dependency::https(format!("{}.example.com", n))));
        let backward = names.iter().rev().fold(Contract::new(), |c, n| c.with_dependency(*n, Dependency::https(format!("{}.example.com", n))));

        let first = derive_egress_rules(Some(&forward));
        for _ in 0..5 {
            assert_eq!(derive_egress_rules(Some(&forward)), first);
            assert_eq!(derive_egress_rules(Some(&backward)), first);
        }
    }

    #[test]
    fn test_external_host_ports() {
        let contract = Contract::new()
            .with_dependency("gh", Dependency::https("api.github.com"))
            .with_dependency("gh2", Dependency::https("api.github.com"))
            .with_dependency("internal", Dependency::https("api.tools.svc.cluster.local"))
            .with_dependency("resolver", Dependency::https("dns.example.com").with_port(53))
            .with_egress_override(EgressOverride::new("10.0.0.0/8"));
        let rules = derive_egress_rules(Some(&contract));
        assert_eq!(external_host_ports(&rules), vec!["api.github.com:443".to_string()]);
    }

    #[test]
    fn test_rule_classification() {
        let internal = EgressRule::host("postgres.data.svc.cluster.local", 5432, TransportProtocol::Tcp);
        assert!(internal.is_cluster_internal());
        assert!(!internal.is_external_host());

        let external = EgressRule::host("api.github.com", 443, TransportProtocol::Tcp);
        assert!(external.is_external_host());
        assert_eq!(external.host_port().as_deref(), Some("api.github.com:443"));
    }
}
