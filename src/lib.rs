//! # Flowpact
//!
//! Flowpact turns a declarative workflow (a DAG of nodes plus a contract of
//! external dependencies) into the least-privilege permissions it needs to run
//! inside a shared cluster, and audits live policy against that contract.
//!
//! ## Core Features
//!
//! - **Parser & Validator**: accumulates every structural and contract violation in one pass
//! - **Derivation Engine**: deterministic secrets, egress rules, ingress rules and Deno flags
//! - **Policy Synthesizer**: Kubernetes `NetworkPolicy` documents, with a trigger-pod variant
//! - **Drift Auditor**: finds and removes temporary bootstrap egress from live policy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowpact::{derive_egress_rules, generate_network_policy, parse};
//!
//! let workflow = parse(yaml_str)?;
//! let rules = derive_egress_rules(workflow.contract.as_ref());
//! if let Some(doc) = generate_network_policy(&workflow, "default") {
//!     println!("{}", doc.to_yaml()?);
//! }
//! ```

mod common;
mod config;
mod consts;
mod error;

pub mod audit;
pub mod derive;
pub mod graph;
pub mod model;
pub mod parser;
pub mod policy;

pub use audit::{DriftAuditor, LockOutcome, MemPolicyStore, PolicyStore, StatusReport};
pub use config::{Config, PolicyConfig};
pub use consts::*;
pub use derive::{EgressRule, IngressRule, derive_deno_flags, derive_egress_rules, derive_ingress_rules, derive_secrets};
pub use error::{FlowpactError, ValidationErrors};
pub use graph::WorkflowGraph;
pub use model::*;
pub use parser::parse;
pub use policy::{PolicyDocument, PolicySynthesizer, generate_network_policy, generate_trigger_network_policy};

/// Result type alias for Flowpact operations.
pub type Result<T> = std::result::Result<T, FlowpactError>;
