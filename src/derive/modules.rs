use crate::model::{Contract, DependencyTarget, Workflow};

/// True if the workflow imports any jsr or npm package.
pub fn has_module_proxy_deps(workflow: &Workflow) -> bool {
    workflow.contract.as_ref().is_some_and(|c| c.dependencies.values().any(|d| d.target.is_module_proxy()))
}

/// Proxy URLs that warm the module cache before first run, sorted.
///
/// jsr packages live under `<proxy>/jsr/<specifier>`, npm packages at
/// `<proxy>/<specifier>`, each with `@<version>` when pinned.
pub fn module_prewarm_urls(
    contract: Option<&Contract>,
    proxy_url: &str,
) -> Vec<String> {
    let Some(contract) = contract else {
        return Vec::new();
    };
    let base = proxy_url.trim_end_matches('/');
    if base.is_empty() {
        return Vec::new();
    }

    let mut urls: Vec<String> = contract
        .dependencies
        .values()
        .filter_map(|dep| {
            let (mut url, version) = match &dep.target {
                DependencyTarget::Jsr { specifier, version } => (format!("{}/jsr/{}", base, specifier), version),
                DependencyTarget::Npm { specifier, version } => (format!("{}/{}", base, specifier), version),
                _ => return None,
            };
            if let Some(version) = version {
                url.push('@');
                url.push_str(version);
            }
            Some(url)
        })
        .collect();
    urls.sort_unstable();
    urls.dedup();
    urls
}
