mod contract;
mod dependency;
mod edge;
mod node;
mod trigger;
mod workflow;

pub use contract::{Contract, EgressOverride, NetworkPolicyOverride};
pub use dependency::{Dependency, DependencyAuth, DependencyProtocol, DependencyTarget, PortSpec, TransportProtocol};
pub use edge::Edge;
pub use node::NodeSpec;
pub use trigger::{Trigger, TriggerKind};
pub use workflow::{DeploymentConfig, Workflow, WorkflowConfig};
