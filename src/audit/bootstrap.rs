use tracing::trace;

use crate::model::Workflow;

/// Module registries the runtime reaches while starting up.
///
/// These used to be declared in contracts before imports went through the
/// module proxy. A policy still allowing them is stale.
pub const BOOTSTRAP_HOSTS: [&str; 4] = ["jsr.io", "deno.land", "cdn.deno.land", "registry.npmjs.org"];

/// Whether `host` (optionally `host:port`) is a bootstrap registry.
pub fn is_bootstrap_host(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let bare = match host.rsplit_once(':') {
        Some((name, port)) if port.parse::<u16>().is_ok() => name,
        _ => host.as_str(),
    };
    BOOTSTRAP_HOSTS.contains(&bare)
}

/// Copy of `workflow` whose contract no longer lists bootstrap registries.
pub fn filter_bootstrap_deps(workflow: &Workflow) -> Workflow {
    let mut filtered = workflow.clone();
    if let Some(contract) = filtered.contract.as_mut() {
        let before = contract.dependencies.len();
        contract.dependencies.retain(|_, dep| !dep.host().is_some_and(is_bootstrap_host));
        trace!("dropped {} bootstrap dependencies from {}", before - contract.dependencies.len(), workflow.name);
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contract, Dependency};

    #[test]
    fn test_is_bootstrap_host() {
        assert!(is_bootstrap_host("jsr.io"));
        assert!(is_bootstrap_host("jsr.io:443"));
        assert!(is_bootstrap_host(" Deno.Land "));
        assert!(is_bootstrap_host("registry.npmjs.org:443"));
        assert!(!is_bootstrap_host("api.github.com:443"));
        assert!(!is_bootstrap_host("jsr.io.evil.com"));
        assert!(!is_bootstrap_host(""));
    }

    #[test]
    fn test_filter_bootstrap_deps() {
        let wf = Workflow::new("digest", "1.0").with_contract(
            Contract::new()
                .with_dependency("github", Dependency::https("api.github.com"))
                .with_dependency("registry", Dependency::https("jsr.io"))
                .with_dependency("npm", Dependency::https("registry.npmjs.org")),
        );
        let filtered = filter_bootstrap_deps(&wf);

        assert_eq!(filtered.contract.as_ref().unwrap().dependency_names(), vec!["github"]);
        assert_eq!(wf.contract.as_ref().unwrap().dependencies.len(), 3);
    }

    #[test]
    fn test_filter_without_contract() {
        let wf = Workflow::new("bare", "1.0");
        assert_eq!(filter_bootstrap_deps(&wf), wf);
    }
}
