use tracing::trace;

use crate::model::Contract;

/// Every `auth.secret` the contract references, sorted and deduplicated.
///
/// Dynamic targets are skipped: they name no fixed service to hold a credential for.
/// Their `auth.secret` is still validated when parsing, but it is never returned
/// here, so provisioning it is left to the caller.
pub fn derive_secrets(contract: Option<&Contract>) -> Vec<String> {
    let Some(contract) = contract else {
        return Vec::new();
    };

    let mut secrets = Vec::new();
    for (name, dep) in &contract.dependencies {
        let Some(auth) = dep.auth.as_ref().filter(|auth| !auth.secret.is_empty()) else {
            continue;
        };
        if dep.target.is_dynamic_target() {
            trace!("skipping secret {} of dynamic target {}", auth.secret, name);
            continue;
        }
        secrets.push(auth.secret.clone());
    }
    secrets.sort_unstable();
    secrets.dedup();

    trace!("derived {} secrets", secrets.len());
    secrets
}

/// `service` part of a `service.key` reference; empty if there is no dot.
pub fn secret_service_name(reference: &str) -> &str {
    reference.split_once('.').map(|(service, _)| service).unwrap_or_default()
}

/// `key` part of a `service.key` reference; empty if there is no dot.
pub fn secret_key_name(reference: &str) -> &str {
    reference.split_once('.').map(|(_, key)| key).unwrap_or_default()
}
