use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    Config, FlowpactError, Result,
    consts::NETPOL_SUFFIX,
    model::Workflow,
    policy::{PolicyDocument, PolicySynthesizer},
};

use super::{
    bootstrap::{filter_bootstrap_deps, is_bootstrap_host},
    hosts::{contract_egress_hosts, live_egress_hosts},
    store::PolicyStore,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostEntry {
    pub host: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bootstrap: bool,
}

/// Declared egress next to what the live policy records.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub workflow: String,
    pub namespace: String,
    #[serde(skip)]
    pub policy_name: String,
    pub contract: Vec<HostEntry>,
    pub live: Vec<HostEntry>,
    pub bootstrap_count: usize,
    pub clean: bool,
    /// declared but absent from the live policy
    pub missing: Vec<String>,
    /// live, not bootstrap, and not declared
    pub undeclared: Vec<String>,
}

impl StatusReport {
    fn build(
        workflow: &str,
        namespace: &str,
        policy_name: &str,
        contract_hosts: Vec<String>,
        live_hosts: Vec<String>,
    ) -> Self {
        let live: Vec<HostEntry> = live_hosts
            .into_iter()
            .map(|host| HostEntry {
                bootstrap: is_bootstrap_host(&host),
                host,
            })
            .collect();
        let missing = contract_hosts.iter().filter(|h| !live.iter().any(|l| &l.host == *h)).cloned().collect();
        let undeclared = live.iter().filter(|l| !l.bootstrap && !contract_hosts.contains(&l.host)).map(|l| l.host.clone()).collect();
        let bootstrap_count = live.iter().filter(|l| l.bootstrap).count();

        Self {
            workflow: workflow.to_string(),
            namespace: namespace.to_string(),
            policy_name: policy_name.to_string(),
            contract: contract_hosts
                .into_iter()
                .map(|host| HostEntry {
                    host,
                    bootstrap: false,
                })
                .collect(),
            live,
            bootstrap_count,
            clean: bootstrap_count == 0,
            missing,
            undeclared,
        }
    }

    /// Live hosts that lock would remove.
    pub fn bootstrap_hosts(&self) -> Vec<&str> {
        self.live.iter().filter(|l| l.bootstrap).map(|l| l.host.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Workflow:  {}", self.workflow)?;
        writeln!(f, "Namespace: {}", self.namespace)?;
        writeln!(f)?;

        if !self.contract.is_empty() {
            writeln!(f, "CONTRACT EGRESS (from workflow.yaml):")?;
            for entry in &self.contract {
                writeln!(f, "  \u{2713} {}", entry.host)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "LIVE NETWORK POLICY EGRESS ({}/{}):", self.namespace, self.policy_name)?;
        if self.live.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for entry in &self.live {
            if entry.bootstrap {
                writeln!(f, "  \u{26a0} {}  [bootstrap, removable with lock]", entry.host)?;
            } else {
                writeln!(f, "  \u{2713} {}", entry.host)?;
            }
        }
        writeln!(f)?;

        if self.clean {
            write!(f, "STATUS: Clean, no bootstrap egress rules present.")
        } else {
            write!(f, "STATUS: {} bootstrap egress rule(s) present. Run lock to remove.", self.bootstrap_count)
        }
    }
}

/// What a [`DriftAuditor::lock`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    /// No bootstrap hosts in the live policy; nothing was written.
    AlreadyClean,
    /// Dry run: these hosts would be removed.
    DryRun { removable: Vec<String> },
    /// The tightened policy was applied.
    Applied { removed: Vec<String>, document: PolicyDocument },
}

impl LockOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LockOutcome::Applied { .. })
    }
}

/// Compares live policies against contracts and strips bootstrap egress.
pub struct DriftAuditor {
    store: Arc<dyn PolicyStore>,
    config: Config,
}

impl DriftAuditor {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(
        store: Arc<dyn PolicyStore>,
        config: Config,
    ) -> Self {
        Self {
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Diff the contract's declared hosts against the live `<workflow>-netpol`.
    pub async fn status(
        &self,
        workflow: &Workflow,
        namespace: Option<&str>,
    ) -> Result<StatusReport> {
        require_contract(workflow, "check")?;
        let namespace = self.config.resolve_namespace(namespace, workflow);
        let live = self.fetch_live(&namespace, workflow).await?;

        let report = StatusReport::build(&workflow.name, &namespace, live.name(), contract_egress_hosts(workflow), live_egress_hosts(&live));
        if !report.clean {
            warn!("{}/{} allows {} bootstrap host(s)", namespace, live.name(), report.bootstrap_count);
        }
        Ok(report)
    }

    /// Regenerate and apply the policy without bootstrap hosts.
    ///
    /// A policy with no bootstrap hosts is left untouched, so calling this
    /// twice applies at most once. The workflow itself is never modified.
    pub async fn lock(
        &self,
        workflow: &Workflow,
        namespace: Option<&str>,
        dry_run: bool,
    ) -> Result<LockOutcome> {
        require_contract(workflow, "lock")?;
        let namespace = self.config.resolve_namespace(namespace, workflow);
        let live = self.fetch_live(&namespace, workflow).await?;

        let removable: Vec<String> = live_egress_hosts(&live).into_iter().filter(|h| is_bootstrap_host(h)).collect();
        if removable.is_empty() {
            debug!("{}/{}: already clean", namespace, live.name());
            return Ok(LockOutcome::AlreadyClean);
        }

        warn!("bootstrap egress in {}/{}: {}", namespace, live.name(), removable.join(", "));
        if dry_run {
            return Ok(LockOutcome::DryRun {
                removable,
            });
        }

        let filtered = filter_bootstrap_deps(workflow);
        let synthesizer = PolicySynthesizer::new(self.config.policy.clone());
        let document = synthesizer
            .generate_network_policy(&filtered, &namespace)
            .ok_or_else(|| FlowpactError::Audit(format!("failed to regenerate NetworkPolicy for {}", workflow.name)))?;
        self.store.apply(&document).await?;

        info!("removed {} bootstrap egress rule(s), {}/{} updated", removable.len(), namespace, document.name());
        Ok(LockOutcome::Applied {
            removed: removable,
            document,
        })
    }

    async fn fetch_live(
        &self,
        namespace: &str,
        workflow: &Workflow,
    ) -> Result<PolicyDocument> {
        let name = format!("{}{}", workflow.name, NETPOL_SUFFIX);
        self.store
            .get_network_policy(namespace, &name)
            .await?
            .ok_or_else(|| FlowpactError::Audit(format!("NetworkPolicy {}/{} not found", namespace, name)))
    }
}

fn require_contract(
    workflow: &Workflow,
    action: &str,
) -> Result<()> {
    if workflow.contract.is_none() {
        return Err(FlowpactError::Workflow(format!("workflow {:?} has no contract, nothing to {}", workflow.name, action)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        MemPolicyStore,
        consts::INTENDED_HOSTS_ANNOTATION,
        model::{Contract, Dependency},
        policy::generate_network_policy,
    };

    fn digest_workflow() -> Workflow {
        Workflow::new("digest", "1.0").with_contract(
            Contract::new()
                .with_dependency("github", Dependency::https("api.github.com"))
                .with_dependency("registry", Dependency::https("jsr.io"))
                .with_dependency("slack", Dependency::https("hooks.slack.com")),
        )
    }

    fn seeded_store(workflow: &Workflow) -> Arc<MemPolicyStore> {
        let store = Arc::new(MemPolicyStore::new());
        store.insert(generate_network_policy(workflow, "prod").unwrap());
        store
    }

    struct FailingStore;

    #[async_trait]
    impl PolicyStore for FailingStore {
        async fn get_network_policy(
            &self,
            _namespace: &str,
            _name: &str,
        ) -> Result<Option<PolicyDocument>> {
            Err(FlowpactError::Store("connection refused".to_string()))
        }

        async fn apply(
            &self,
            _document: &PolicyDocument,
        ) -> Result<()> {
            Err(FlowpactError::Store("forbidden".to_string()))
        }
    }

    #[tokio::test]
    async fn test_status_flags_bootstrap_hosts() {
        let wf = digest_workflow();
        let auditor = DriftAuditor::new(seeded_store(&wf));

        let report = auditor.status(&wf, Some("prod")).await.unwrap();
        assert_eq!(report.policy_name, "digest-netpol");
        assert_eq!(report.bootstrap_count, 1);
        assert!(!report.clean);
        assert_eq!(report.bootstrap_hosts(), vec!["jsr.io:443"]);
        assert!(report.missing.is_empty());
        assert!(report.undeclared.is_empty());

        let text = report.to_string();
        assert!(text.starts_with("Workflow:  digest\nNamespace: prod\n"));
        assert!(text.contains("LIVE NETWORK POLICY EGRESS (prod/digest-netpol):"));
        assert!(text.contains("\u{26a0} jsr.io:443  [bootstrap"));
        assert!(text.ends_with("STATUS: 1 bootstrap egress rule(s) present. Run lock to remove."));
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let wf = digest_workflow();
        let auditor = DriftAuditor::new(seeded_store(&wf));
        let report = auditor.status(&wf, Some("prod")).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["workflow"], "digest");
        assert_eq!(json["bootstrapCount"], 1);
        assert_eq!(json["clean"], false);
        assert_eq!(json["contract"][0], serde_json::json!({"host": "api.github.com:443"}));
        assert_eq!(json["live"][2], serde_json::json!({"host": "jsr.io:443", "bootstrap": true}));
        assert!(json.get("policyName").is_none());
    }

    #[tokio::test]
    async fn test_status_reports_missing_and_undeclared() {
        let wf = digest_workflow();
        let store = Arc::new(MemPolicyStore::new());
        let mut live = generate_network_policy(&wf, "prod").unwrap();
        live.metadata.annotations.insert(INTENDED_HOSTS_ANNOTATION.to_string(), "api.github.com:443,example.org:443".to_string());
        store.insert(live);

        let report = DriftAuditor::new(store).status(&wf, Some("prod")).await.unwrap();
        assert!(report.clean);
        assert_eq!(report.missing, vec!["hooks.slack.com:443", "jsr.io:443"]);
        assert_eq!(report.undeclared, vec!["example.org:443"]);
        assert!(report.to_string().ends_with("STATUS: Clean, no bootstrap egress rules present."));
    }

    #[tokio::test]
    async fn test_lock_applies_once() {
        let wf = digest_workflow();
        let store = seeded_store(&wf);
        let auditor = DriftAuditor::new(store.clone());

        let outcome = auditor.lock(&wf, Some("prod"), false).await.unwrap();
        let LockOutcome::Applied { removed, document } = outcome else {
            panic!("expected an applied lock");
        };
        assert_eq!(removed, vec!["jsr.io:443"]);
        assert_eq!(document.intended_hosts_annotation(), Some("api.github.com:443,hooks.slack.com:443"));
        assert_eq!(store.apply_count(), 1);
        assert_eq!(store.get_network_policy("prod", "digest-netpol").await.unwrap(), Some(document));

        // source workflow keeps its bootstrap dependency
        assert_eq!(wf.contract.as_ref().unwrap().dependencies.len(), 3);

        assert_eq!(auditor.lock(&wf, Some("prod"), false).await.unwrap(), LockOutcome::AlreadyClean);
        assert_eq!(store.apply_count(), 1);
        assert!(auditor.status(&wf, Some("prod")).await.unwrap().clean);
    }

    #[tokio::test]
    async fn test_lock_dry_run_does_not_apply() {
        let wf = digest_workflow();
        let store = seeded_store(&wf);
        let auditor = DriftAuditor::new(store.clone());

        let outcome = auditor.lock(&wf, Some("prod"), true).await.unwrap();
        assert_eq!(
            outcome,
            LockOutcome::DryRun {
                removable: vec!["jsr.io:443".to_string()]
            }
        );
        assert!(!outcome.is_applied());
        assert_eq!(store.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_namespace_resolution() {
        let mut wf = digest_workflow();
        wf.deployment.namespace = Some("prod".to_string());
        let auditor = DriftAuditor::new(seeded_store(&wf));

        assert_eq!(auditor.status(&wf, None).await.unwrap().namespace, "prod");
        let err = auditor.status(&wf, Some("staging")).await.unwrap_err();
        assert_eq!(err, FlowpactError::Audit("NetworkPolicy staging/digest-netpol not found".to_string()));
    }

    #[tokio::test]
    async fn test_no_contract_is_rejected() {
        let auditor = DriftAuditor::new(Arc::new(MemPolicyStore::new()));
        let wf = Workflow::new("bare", "1.0");

        let err = auditor.status(&wf, None).await.unwrap_err();
        assert_eq!(err, FlowpactError::Workflow("workflow \"bare\" has no contract, nothing to check".to_string()));
        let err = auditor.lock(&wf, None, false).await.unwrap_err();
        assert!(err.to_string().ends_with("nothing to lock"));
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let auditor = DriftAuditor::new(Arc::new(FailingStore));
        let wf = digest_workflow();

        let err = auditor.status(&wf, Some("prod")).await.unwrap_err();
        assert_eq!(err, FlowpactError::Store("connection refused".to_string()));
        let err = auditor.lock(&wf, Some("prod"), false).await.unwrap_err();
        assert_eq!(err, FlowpactError::Store("connection refused".to_string()));
    }
}
