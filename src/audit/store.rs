use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::trace;

use crate::{Result, common::MemCache, policy::PolicyDocument};

/// Where live NetworkPolicies are read from and written to.
///
/// Cluster-backed implementations live outside this crate; errors should be
/// mapped to [`crate::FlowpactError::Store`].
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch `namespace/name`, `Ok(None)` when it does not exist.
    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PolicyDocument>>;

    /// Create or replace the policy, keyed by its namespace and name.
    async fn apply(
        &self,
        document: &PolicyDocument,
    ) -> Result<()>;
}

/// In-memory store for tests and dry local runs.
///
/// [`MemPolicyStore::new`] never drops a policy. [`MemPolicyStore::with_capacity`]
/// bounds memory instead and silently evicts once the bound is reached.
pub struct MemPolicyStore {
    policies: MemCache<(String, String), PolicyDocument>,
    applies: AtomicUsize,
}

impl Default for MemPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemPolicyStore {
    pub fn new() -> Self {
        Self {
            policies: MemCache::unbounded(),
            applies: AtomicUsize::new(0),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            policies: MemCache::new(capacity),
            applies: AtomicUsize::new(0),
        }
    }

    /// Seed a policy without counting it as an apply.
    pub fn insert(
        &self,
        document: PolicyDocument,
    ) {
        self.policies.set(key(&document), document);
    }

    pub fn contains(
        &self,
        namespace: &str,
        name: &str,
    ) -> bool {
        self.policies.contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) {
        self.policies.remove(&(namespace.to_string(), name.to_string()));
    }

    /// Number of [`PolicyStore::apply`] calls so far.
    pub fn apply_count(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

fn key(document: &PolicyDocument) -> (String, String) {
    (document.namespace().to_string(), document.name().to_string())
}

#[async_trait]
impl PolicyStore for MemPolicyStore {
    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PolicyDocument>> {
        trace!("MemPolicyStore.get_network_policy: {}/{}", namespace, name);
        Ok(self.policies.get(&(namespace.to_string(), name.to_string())))
    }

    async fn apply(
        &self,
        document: &PolicyDocument,
    ) -> Result<()> {
        trace!("MemPolicyStore.apply: {}/{}", document.namespace(), document.name());
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.policies.set(key(document), document.clone());
        Ok(())
    }
}
