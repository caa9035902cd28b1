//! Pure projections from a validated workflow to the permissions it needs.
//!
//! Every function here is deterministic: outputs are sorted explicitly and
//! never depend on map iteration order. Nothing mutates its input.

mod egress;
mod flags;
mod ingress;
mod modules;
mod secrets;

use crate::model::Contract;

pub use egress::{EgressDestination, EgressRule, derive_egress_rules, dns_rules, external_host_ports};
pub use flags::derive_deno_flags;
pub use ingress::{IngressRule, derive_ingress_rules};
pub use modules::{has_module_proxy_deps, module_prewarm_urls};
pub use secrets::{derive_secrets, secret_key_name, secret_service_name};

/// Copy of `contract` with protocol default ports written out.
///
/// Derivation resolves defaults on its own; this exists for callers that
/// render or persist the contract and want explicit ports.
pub fn with_default_ports(contract: &Contract) -> Contract {
    let mut filled = contract.clone();
    for dep in filled.dependencies.values_mut() {
        *dep = dep.with_default_port();
    }
    filled
}
