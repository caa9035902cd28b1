use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use ipnet::IpNet;
use regex::Regex;
use tracing::warn;

use crate::{
    consts::{CONTRACT_VERSION, DYNAMIC_TARGET_TYPE},
    error::ValidationErrors,
    model::{
        Contract, DeploymentConfig, Dependency, DependencyAuth, Edge, DependencyProtocol, DependencyTarget, EgressOverride, NetworkPolicyOverride, NodeSpec,
        PortSpec, Trigger, TriggerKind, Workflow, WorkflowConfig,
    },
};

use super::document::{AuthDocument, ContractDocument, DependencyDocument, NetworkPolicyDocument, TriggerDocument, WorkflowDocument};

/// Workflow names: lowercase kebab-case.
pub static KEBAB_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap());
/// Node, trigger and dependency names.
pub static IDENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());
/// Workflow version, `major.minor`.
pub static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").unwrap());
/// Secret references, `service.key`.
pub static SECRET_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*\.[a-z][a-z0-9_-]*$").unwrap());

/// Accumulates every violation found in a document while building the typed model.
///
/// Each check records its error and keeps going, so one pass reports everything.
/// The built value is only handed out by [`Validator::finish`] when no error was recorded.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
    warnings: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Non-fatal findings, such as unknown dependency protocols.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn error(
        &mut self,
        message: String,
    ) {
        self.errors.push(message);
    }

    fn warning(
        &mut self,
        message: String,
    ) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Hand out `value` if nothing was recorded, else all errors.
    pub fn finish<T>(
        self,
        value: T,
    ) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() { Ok(value) } else { Err(self.errors) }
    }

    pub fn workflow(
        &mut self,
        doc: WorkflowDocument,
    ) -> Workflow {
        if doc.name.is_empty() {
            self.error("name is required".to_string());
        } else if !KEBAB_PATTERN.is_match(&doc.name) {
            self.error(format!("name must be kebab-case, got: {:?}", doc.name));
        }

        if doc.version.is_empty() {
            self.error("version is required".to_string());
        } else if !VERSION_PATTERN.is_match(&doc.version) {
            self.error(format!("version must be semver (e.g., 1.0), got: {:?}", doc.version));
        }

        let triggers = self.triggers(&doc.triggers);

        if doc.nodes.is_empty() {
            self.error("at least one node is required".to_string());
        }
        let mut nodes = HashMap::with_capacity(doc.nodes.len());
        for (name, node) in doc.nodes {
            if !IDENT_PATTERN.is_match(&name) {
                self.error(format!("node {:?}: name must match [a-z][a-z0-9_-]*", name));
            }
            if node.path.is_empty() {
                self.error(format!("node {:?}: path is required", name));
            }
            nodes.insert(
                name,
                NodeSpec {
                    path: node.path,
                    capabilities: node.capabilities,
                },
            );
        }

        let mut workflow = Workflow {
            name: doc.name,
            version: doc.version,
            description: doc.description,
            triggers,
            nodes,
            edges: Vec::with_capacity(doc.edges.len()),
            config: WorkflowConfig {
                timeout: Some(doc.config.timeout).filter(|t| !t.is_empty()),
                retries: doc.config.retries.filter(|r| *r > 0),
                extras: doc.config.extras,
            },
            deployment: DeploymentConfig {
                namespace: Some(doc.deployment.namespace).filter(|ns| !ns.is_empty()),
            },
            contract: None,
            metadata: doc.metadata,
        };

        for (i, edge) in doc.edges.into_iter().enumerate() {
            if !workflow.nodes.contains_key(&edge.from) {
                self.error(format!("edge[{}]: from node {:?} not defined", i, edge.from));
            }
            if !workflow.nodes.contains_key(&edge.to) {
                self.error(format!("edge[{}]: to node {:?} not defined", i, edge.to));
            }
            if edge.from == edge.to {
                self.error(format!("edge[{}]: self-loop on {:?}", i, edge.from));
            }
            workflow.edges.push(Edge::new(edge.from, edge.to));
        }

        for cycle in workflow.graph().find_cycles() {
            self.error(format!("cycle detected: {}", cycle));
        }

        if let Some(contract) = doc.contract {
            workflow.contract = self.contract(contract);
        }

        workflow
    }

    fn triggers(
        &mut self,
        docs: &[TriggerDocument],
    ) -> Vec<Trigger> {
        if docs.is_empty() {
            self.error("at least one trigger is required".to_string());
        }

        let mut seen = HashSet::new();
        let mut triggers = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            let kind = match doc.kind.as_str() {
                "manual" => Some(TriggerKind::Manual),
                "cron" => self.required_trigger_field(i, "cron", "schedule", &doc.schedule).map(|schedule| TriggerKind::Cron {
                    schedule,
                }),
                "webhook" => self.required_trigger_field(i, "webhook", "path", &doc.path).map(|path| TriggerKind::Webhook {
                    path,
                }),
                "queue" => self.required_trigger_field(i, "queue", "subject", &doc.subject).map(|subject| TriggerKind::Queue {
                    subject,
                }),
                other => {
                    self.error(format!("trigger[{}]: invalid type {:?} (must be manual, cron, webhook, or queue)", i, other));
                    None
                }
            };

            let name = if doc.name.is_empty() {
                None
            } else {
                if !IDENT_PATTERN.is_match(&doc.name) {
                    self.error(format!("trigger[{}]: name must match [a-z][a-z0-9_-]*, got: {:?}", i, doc.name));
                }
                if !seen.insert(doc.name.as_str()) {
                    self.error(format!("trigger[{}]: duplicate trigger name {:?}", i, doc.name));
                }
                Some(doc.name.clone())
            };

            if let Some(kind) = kind {
                triggers.push(Trigger {
                    name,
                    kind,
                });
            }
        }
        triggers
    }

    fn required_trigger_field(
        &mut self,
        index: usize,
        kind: &str,
        field: &str,
        value: &str,
    ) -> Option<String> {
        if value.is_empty() {
            self.error(format!("trigger[{}]: {} trigger requires {}", index, kind, field));
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Validate a contract section and build the typed [`Contract`].
    pub fn contract(
        &mut self,
        doc: ContractDocument,
    ) -> Option<Contract> {
        let errors_before = self.errors.len();

        if doc.version.is_empty() {
            self.error("contract.version is required".to_string());
        } else if doc.version != CONTRACT_VERSION {
            self.error(format!("contract.version must be \"{}\", got: {:?}", CONTRACT_VERSION, doc.version));
        }

        let mut dependencies = HashMap::new();
        for (name, dep) in doc.dependencies.unwrap_or_default() {
            if let Some(dependency) = self.dependency(&name, dep) {
                dependencies.insert(name, dependency);
            }
        }

        let network_policy = doc.network_policy.map(|np| self.network_policy(np));

        if self.errors.len() > errors_before {
            return None;
        }
        Some(Contract {
            version: doc.version,
            dependencies,
            network_policy,
            extensions: doc.extensions,
        })
    }

    fn dependency(
        &mut self,
        name: &str,
        doc: DependencyDocument,
    ) -> Option<Dependency> {
        let ctx = format!("contract.dependencies[{:?}]", name);
        let errors_before = self.errors.len();

        if !IDENT_PATTERN.is_match(name) {
            self.error(format!("{}: name must match [a-z][a-z0-9_-]*", ctx));
        }

        if doc.protocol.is_empty() {
            self.error(format!("{}: protocol is required", ctx));
            return None;
        }
        let kind = doc.protocol.parse::<DependencyProtocol>().ok();
        if kind.is_none() {
            self.warning(format!("{}: unknown protocol {:?}", ctx, doc.protocol));
        }

        let target = if doc.kind == DYNAMIC_TARGET_TYPE {
            self.dynamic_target(&ctx, &doc)
        } else {
            self.fixed_target(&ctx, kind, &doc)
        };
        let auth = doc.auth.as_ref().and_then(|auth| self.auth(&ctx, auth));

        if self.errors.len() > errors_before {
            return None;
        }
        target.map(|target| Dependency {
            target,
            auth,
            extensions: doc.extensions,
        })
    }

    fn dynamic_target(
        &mut self,
        ctx: &str,
        doc: &DependencyDocument,
    ) -> Option<DependencyTarget> {
        let cidr = if doc.cidr.is_empty() {
            self.error(format!("{}: dynamic-target requires cidr", ctx));
            None
        } else {
            self.cidr(ctx, &doc.cidr)
        };

        let mut ports = Vec::with_capacity(doc.dyn_ports.len());
        if doc.dyn_ports.is_empty() {
            self.error(format!("{}: dynamic-target requires dynPorts", ctx));
        }
        for (j, spec) in doc.dyn_ports.iter().enumerate() {
            match spec.parse::<PortSpec>() {
                Ok(port) => ports.push(port),
                Err(_) => self.error(format!("{}.dynPorts[{}]: invalid port spec {:?}", ctx, j, spec)),
            }
        }

        Some(DependencyTarget::DynamicTarget {
            protocol: doc.protocol.clone(),
            cidr: cidr?,
            ports,
        })
    }

    fn fixed_target(
        &mut self,
        ctx: &str,
        kind: Option<DependencyProtocol>,
        doc: &DependencyDocument,
    ) -> Option<DependencyTarget> {
        let port = self.port(ctx, doc.port);

        let Some(kind) = kind else {
            return Some(DependencyTarget::Other {
                protocol: doc.protocol.clone(),
                host: doc.host.clone(),
                port,
            });
        };

        let protocol = kind.name();
        self.require(ctx, protocol, "host", &doc.host);
        let target = match kind {
            DependencyProtocol::Https => DependencyTarget::Https {
                host: doc.host.clone(),
                port,
            },
            DependencyProtocol::Postgresql => {
                self.require(ctx, protocol, "database", &doc.database);
                self.require(ctx, protocol, "user", &doc.user);
                DependencyTarget::Postgresql {
                    host: doc.host.clone(),
                    port,
                    database: doc.database.clone(),
                    user: doc.user.clone(),
                }
            }
            DependencyProtocol::Nats => {
                self.require(ctx, protocol, "subject", &doc.subject);
                DependencyTarget::Nats {
                    host: doc.host.clone(),
                    port,
                    subject: doc.subject.clone(),
                }
            }
            DependencyProtocol::Blob => {
                self.require(ctx, protocol, "container", &doc.container);
                DependencyTarget::Blob {
                    host: doc.host.clone(),
                    port,
                    container: doc.container.clone(),
                }
            }
            DependencyProtocol::Jsr => DependencyTarget::Jsr {
                specifier: doc.host.clone(),
                version: Some(doc.version.clone()).filter(|v| !v.is_empty()),
            },
            DependencyProtocol::Npm => DependencyTarget::Npm {
                specifier: doc.host.clone(),
                version: Some(doc.version.clone()).filter(|v| !v.is_empty()),
            },
        };
        Some(target)
    }

    fn require(
        &mut self,
        ctx: &str,
        protocol: &str,
        field: &str,
        value: &str,
    ) {
        if value.is_empty() {
            self.error(format!("{}: {} requires {}", ctx, protocol, field));
        }
    }

    /// `0` or absent means "use the protocol default".
    fn port(
        &mut self,
        ctx: &str,
        port: Option<i64>,
    ) -> Option<u16> {
        match port {
            None | Some(0) => None,
            Some(p) => match u16::try_from(p) {
                Ok(p) => Some(p),
                Err(_) => {
                    self.error(format!("{}: port must be in range 1-65535, got: {}", ctx, p));
                    None
                }
            },
        }
    }

    fn auth(
        &mut self,
        ctx: &str,
        doc: &AuthDocument,
    ) -> Option<DependencyAuth> {
        if doc.kind.is_empty() {
            self.error(format!("{}: auth.type is required when auth is present", ctx));
        }
        if doc.secret.is_empty() {
            self.error(format!("{}: auth.secret is required when auth is present", ctx));
        } else if !SECRET_REF_PATTERN.is_match(&doc.secret) {
            self.error(format!("{}: auth.secret must be in \"service.key\" format, got: {:?}", ctx, doc.secret));
        }

        Some(DependencyAuth {
            kind: doc.kind.clone(),
            secret: doc.secret.clone(),
        })
    }

    fn cidr(
        &mut self,
        ctx: &str,
        cidr: &str,
    ) -> Option<IpNet> {
        match cidr.parse::<IpNet>() {
            Ok(net) => Some(net),
            Err(_) => {
                self.error(format!("{}: invalid CIDR format {:?}", ctx, cidr));
                None
            }
        }
    }

    fn network_policy(
        &mut self,
        doc: NetworkPolicyDocument,
    ) -> NetworkPolicyOverride {
        let mut additional_egress = Vec::with_capacity(doc.additional_egress.len());
        for (i, egress) in doc.additional_egress.into_iter().enumerate() {
            let ctx = format!("contract.networkPolicy.additionalEgress[{}]", i);
            if egress.to_cidr.is_empty() {
                self.error(format!("{}: toCIDR is required", ctx));
            } else {
                self.cidr(&ctx, &egress.to_cidr);
            }
            for (j, spec) in egress.ports.iter().enumerate() {
                if spec.parse::<PortSpec>().is_err() {
                    self.error(format!("{}.ports[{}]: invalid port spec {:?}", ctx, j, spec));
                }
            }
            additional_egress.push(EgressOverride {
                to_cidr: egress.to_cidr,
                ports: egress.ports,
                reason: Some(egress.reason).filter(|r| !r.is_empty()),
            });
        }
        NetworkPolicyOverride {
            additional_egress,
        }
    }
}

/// Validate a standalone contract section, as a deploy preflight does.
pub fn validate_contract(doc: ContractDocument) -> Result<Contract, ValidationErrors> {
    let mut validator = Validator::new();
    let contract = validator.contract(doc);
    match contract {
        Some(contract) => validator.finish(contract),
        None => Err(validator.errors),
    }
}
