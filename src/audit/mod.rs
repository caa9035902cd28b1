//! Drift audit: compare a live NetworkPolicy's recorded hosts with the
//! contract and strip bootstrap registry access once it is no longer needed.

mod auditor;
mod bootstrap;
mod hosts;
mod store;

pub use auditor::{DriftAuditor, HostEntry, LockOutcome, StatusReport};
pub use bootstrap::{BOOTSTRAP_HOSTS, filter_bootstrap_deps, is_bootstrap_host};
pub use hosts::{contract_egress_hosts, live_egress_hosts};
pub use store::{MemPolicyStore, PolicyStore};
