//! NetworkPolicy synthesis from derived rules.

mod manifest;
mod synth;

pub use manifest::{
    API_VERSION, EgressPolicyRule, IngressPolicyRule, IpBlock, KIND, LabelSelector, NetworkPolicySpec, ObjectMeta, PolicyDocument, PolicyPeer, PolicyPort,
    PolicyType,
};
pub use synth::{PolicySynthesizer, generate_network_policy, generate_trigger_network_policy};
