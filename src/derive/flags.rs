use tracing::trace;

use crate::{
    consts::{DEFAULT_MODULE_PROXY_HOST, WORKFLOW_LISTEN_ADDR, WORKFLOW_PORT},
    model::Contract,
};

const ENTRYPOINT: &str = "engine/main.ts";
const WORKFLOW_FILE: &str = "/app/workflow/workflow.yaml";
const ALLOW_READ: &str = "--allow-read=/app,/var/run/secrets";
const ALLOW_WRITE: &str = "--allow-write=/tmp";
const ALLOW_ENV: &str = "--allow-env=DENO_DIR,HOME";

/// Full `deno run` command line for the workflow container, or `None` when
/// the contract declares nothing (the caller keeps its broad defaults).
///
/// Network access is scoped to the listen address, each fixed host's
/// `host:port` and the module proxy, unless a dynamic target is declared:
/// its destinations are unknown, so `--allow-net` is left unscoped.
/// The module proxy is always allowed for network and imports, since the
/// engine's own modules resolve through it.
pub fn derive_deno_flags(
    contract: Option<&Contract>,
    module_proxy_host: &str,
) -> Option<Vec<String>> {
    let contract = contract.filter(|c| !c.dependencies.is_empty())?;
    let proxy = if module_proxy_host.is_empty() { DEFAULT_MODULE_PROXY_HOST } else { module_proxy_host };

    let dynamic = contract.dependencies.values().any(|d| d.target.is_dynamic_target());
    let allow_net = if dynamic {
        "--allow-net".to_string()
    } else {
        // sorted by host, then port
        let mut hosts: Vec<(&str, u16)> = contract
            .dependencies
            .values()
            .filter_map(|d| Some((d.host().filter(|h| !h.is_empty())?, d.target.resolved_port()?)))
            .collect();
        hosts.sort_unstable();
        hosts.dedup();

        let mut allowed = Vec::with_capacity(hosts.len() + 2);
        allowed.push(WORKFLOW_LISTEN_ADDR.to_string());
        allowed.extend(hosts.into_iter().map(|(host, port)| format!("{}:{}", host, port)));
        allowed.push(proxy.to_string());
        format!("--allow-net={}", allowed.join(","))
    };

    let flags = vec![
        "deno".to_string(),
        "run".to_string(),
        "--no-lock".to_string(),
        "--unstable-net".to_string(),
        allow_net,
        ALLOW_READ.to_string(),
        ALLOW_WRITE.to_string(),
        ALLOW_ENV.to_string(),
        format!("--allow-import={}", proxy),
        ENTRYPOINT.to_string(),
        "--workflow".to_string(),
        WORKFLOW_FILE.to_string(),
        "--port".to_string(),
        WORKFLOW_PORT.to_string(),
    ];

    trace!("derived deno flags (broad network: {})", dynamic);
    Some(flags)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Dependency, PortSpec};

    #[test]
    fn test_no_contract_or_empty_is_none() {
        assert_eq!(derive_deno_flags(None, ""), None);
        assert_eq!(derive_deno_flags(Some(&Contract::new()), ""), None);
    }

    #[test]
    fn test_scoped_flags() {
        let contract = Contract::new()
            .with_dependency("pg", Dependency::postgresql("db.internal", "app", "svc"))
            .with_dependency("github", Dependency::https("api.github.com"));
        let flags = derive_deno_flags(Some(&contract), "").unwrap();
        assert_eq!(
            flags,
            vec![
                "deno",
                "run",
                "--no-lock",
                "--unstable-net",
                "--allow-net=0.0.0.0:8080,api.github.com:443,db.internal:5432,esm-sh.flowpact-system.svc.cluster.local:8080",
                "--allow-read=/app,/var/run/secrets",
                "--allow-write=/tmp",
                "--allow-env=DENO_DIR,HOME",
                "--allow-import=esm-sh.flowpact-system.svc.cluster.local:8080",
                "engine/main.ts",
                "--workflow",
                "/app/workflow/workflow.yaml",
                "--port",
                "8080",
            ]
        );
    }

    #[test]
    fn test_dynamic_target_is_broad() {
        let contract = Contract::new()
            .with_dependency("github", Dependency::https("api.github.com"))
            .with_dependency("probes", Dependency::dynamic_target("https", "0.0.0.0/0".parse().unwrap(), vec![PortSpec::tcp(443)]));
        let flags = derive_deno_flags(Some(&contract), "proxy.local:8080").unwrap();
        assert!(flags.contains(&"--allow-net".to_string()));
        assert!(!flags.iter().any(|f| f.starts_with("--allow-net=")));
        assert!(flags.contains(&"--allow-import=proxy.local:8080".to_string()));
    }

    #[test]
    fn test_module_deps_use_proxy_only() {
        let contract = Contract::new()
            .with_dependency("github", Dependency::https("api.github.com"))
            .with_dependency("postgres-driver", Dependency::jsr("@db/postgres"));
        let flags = derive_deno_flags(Some(&contract), "").unwrap();
        let joined = flags.join(" ");
        assert!(joined.contains("--allow-net=0.0.0.0:8080,api.github.com:443,esm-sh.flowpact-system.svc.cluster.local:8080"));
        assert!(joined.contains("--allow-import=esm-sh.flowpact-system.svc.cluster.local:8080"));
        assert!(!joined.contains("@db/postgres"));
        assert!(!joined.contains("--import-map"));
    }

    #[test]
    fn test_hosts_sorted_by_name_before_port() {
        let contract = Contract::new()
            .with_dependency("cn", Dependency::https("api.example.com.cn"))
            .with_dependency("com", Dependency::https("api.example.com"))
            .with_dependency("com-alt", Dependency::https("api.example.com").with_port(8443));
        let flags = derive_deno_flags(Some(&contract), "proxy.local:8080").unwrap();
        assert_eq!(flags[4], "--allow-net=0.0.0.0:8080,api.example.com:443,api.example.com:8443,api.example.com.cn:443,proxy.local:8080");
    }

    #[test]
    fn test_deterministic() {
        let names = ["a", "b", "c", "d"];
        let forward = names.iter().fold(Contract::new(), |c, n| c.with_dependency(*n, Dependency::https(format!("{}.example.com", n))));
        let backward = names.iter().rev().fold(Contract::new(), |c, n| c.with_dependency(*n, Dependency::https(format!("{}.example.com", n))));
        assert_eq!(derive_deno_flags(Some(&forward), ""), derive_deno_flags(Some(&backward), ""));
    }
}
