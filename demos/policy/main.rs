use std::sync::Arc;

use flowpact::{
    Config, DriftAuditor, LockOutcome, MemPolicyStore, derive_deno_flags, derive_egress_rules, derive_secrets, generate_network_policy,
    generate_trigger_network_policy, parse,
};

#[tokio::main]
async fn main() {
    let text = include_str!("./workflow.yaml");

    let workflow = match parse(text) {
        Ok(workflow) => workflow,
        Err(errors) => {
            eprintln!("{}", errors);
            std::process::exit(1);
        }
    };

    let config = Config::default();
    let namespace = config.resolve_namespace(None, &workflow);
    let contract = workflow.contract.as_ref();

    println!("Graph:\n{}\n", workflow.graph().describe());
    println!("Secrets: {:?}", derive_secrets(contract));
    for rule in derive_egress_rules(contract) {
        println!("Egress: {} {:?} {:?}", rule.destination, rule.port, rule.protocol);
    }
    println!("Runtime: {}\n", derive_deno_flags(contract, &config.policy.module_proxy_host).unwrap_or_default().join(" "));

    let policy = generate_network_policy(&workflow, &namespace).unwrap();
    println!("---\n{}", policy.to_yaml().unwrap());
    if let Some(trigger) = generate_trigger_network_policy(&workflow, &namespace) {
        println!("---\n{}", trigger.to_yaml().unwrap());
    }

    let store = Arc::new(MemPolicyStore::new());
    store.insert(policy);
    let auditor = DriftAuditor::with_config(store.clone(), config);

    println!("{}\n", auditor.status(&workflow, None).await.unwrap());
    match auditor.lock(&workflow, None, false).await.unwrap() {
        LockOutcome::Applied { removed, .. } => println!("Locked, removed: {}", removed.join(", ")),
        outcome => println!("Lock: {:?}", outcome),
    }
    println!("Applies: {}", store.apply_count());
}
