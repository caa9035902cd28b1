//! External dependency declarations.
//!
//! A dependency is a closed tagged variant keyed by its `protocol` (and the
//! optional `type: dynamic-target` marker). Each variant carries only the
//! fields its protocol requires, plus the shared `auth` and extension payload
//! on [`Dependency`]. Protocols this crate does not know are kept as
//! [`DependencyTarget::Other`] so newer contracts still load.

use std::{collections::BTreeMap, fmt, str::FromStr};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::{FlowpactError, Result};

/// Protocols with first-class field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DependencyProtocol {
    Https,
    Postgresql,
    Nats,
    Blob,
    Jsr,
    Npm,
}

impl DependencyProtocol {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Port used when a dependency does not declare one.
    ///
    /// This is the only default-port table in the crate.
    pub fn default_port(self) -> Option<u16> {
        match self {
            DependencyProtocol::Https => Some(443),
            DependencyProtocol::Postgresql => Some(5432),
            DependencyProtocol::Nats => Some(4222),
            DependencyProtocol::Blob | DependencyProtocol::Jsr | DependencyProtocol::Npm => None,
        }
    }
}

/// Layer-4 protocol of a network rule.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumString, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum TransportProtocol {
    #[default]
    Tcp,
    Udp,
}

/// `"<port>"` or `"<port>/<TCP|UDP>"`; the protocol defaults to TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortSpec {
    pub port: u16,
    pub protocol: TransportProtocol,
}

impl PortSpec {
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: TransportProtocol::Tcp,
        }
    }
}

impl FromStr for PortSpec {
    type Err = FlowpactError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FlowpactError::Convert(format!("invalid port spec {:?}", s));

        let (port, protocol) = match s.trim().split_once('/') {
            Some((port, proto)) => (port, proto.trim().parse::<TransportProtocol>().map_err(|_| invalid())?),
            None => (s.trim(), TransportProtocol::Tcp),
        };
        let port = port.trim().parse::<u16>().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            port,
            protocol,
        })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Where a dependency's traffic goes, by protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    Https {
        host: String,
        port: Option<u16>,
    },
    Postgresql {
        host: String,
        port: Option<u16>,
        database: String,
        user: String,
    },
    Nats {
        host: String,
        port: Option<u16>,
        subject: String,
    },
    Blob {
        host: String,
        port: Option<u16>,
        container: String,
    },
    /// `specifier` is the package name, e.g. `@db/postgres`.
    Jsr {
        specifier: String,
        version: Option<String>,
    },
    Npm {
        specifier: String,
        version: Option<String>,
    },
    /// Destination not known until runtime: a CIDR block and the ports it may use.
    DynamicTarget {
        protocol: String,
        cidr: IpNet,
        ports: Vec<PortSpec>,
    },
    /// Protocol this crate has no field rules for.
    Other {
        protocol: String,
        host: String,
        port: Option<u16>,
    },
}

impl DependencyTarget {
    /// Protocol name as written in the document.
    pub fn protocol(&self) -> &str {
        match self {
            DependencyTarget::Https { .. } => DependencyProtocol::Https.name(),
            DependencyTarget::Postgresql { .. } => DependencyProtocol::Postgresql.name(),
            DependencyTarget::Nats { .. } => DependencyProtocol::Nats.name(),
            DependencyTarget::Blob { .. } => DependencyProtocol::Blob.name(),
            DependencyTarget::Jsr { .. } => DependencyProtocol::Jsr.name(),
            DependencyTarget::Npm { .. } => DependencyProtocol::Npm.name(),
            DependencyTarget::DynamicTarget { protocol, .. } | DependencyTarget::Other { protocol, .. } => protocol,
        }
    }

    /// Known protocol kind, if any.
    pub fn kind(&self) -> Option<DependencyProtocol> {
        self.protocol().parse().ok()
    }

    /// Network host of a fixed-host dependency.
    ///
    /// `None` for module imports (the specifier is not a host) and dynamic targets.
    pub fn host(&self) -> Option<&str> {
        match self {
            DependencyTarget::Https { host, .. }
            | DependencyTarget::Postgresql { host, .. }
            | DependencyTarget::Nats { host, .. }
            | DependencyTarget::Blob { host, .. }
            | DependencyTarget::Other { host, .. } => Some(host),
            DependencyTarget::Jsr { .. } | DependencyTarget::Npm { .. } | DependencyTarget::DynamicTarget { .. } => None,
        }
    }

    /// Explicitly declared port.
    pub fn port(&self) -> Option<u16> {
        match self {
            DependencyTarget::Https { port, .. }
            | DependencyTarget::Postgresql { port, .. }
            | DependencyTarget::Nats { port, .. }
            | DependencyTarget::Blob { port, .. }
            | DependencyTarget::Other { port, .. } => *port,
            DependencyTarget::Jsr { .. } | DependencyTarget::Npm { .. } | DependencyTarget::DynamicTarget { .. } => None,
        }
    }

    /// Declared port, else the protocol default.
    pub fn resolved_port(&self) -> Option<u16> {
        self.host()?;
        self.port().or_else(|| self.kind().and_then(DependencyProtocol::default_port))
    }

    fn port_mut(&mut self) -> Option<&mut Option<u16>> {
        match self {
            DependencyTarget::Https { port, .. }
            | DependencyTarget::Postgresql { port, .. }
            | DependencyTarget::Nats { port, .. }
            | DependencyTarget::Blob { port, .. }
            | DependencyTarget::Other { port, .. } => Some(port),
            DependencyTarget::Jsr { .. } | DependencyTarget::Npm { .. } | DependencyTarget::DynamicTarget { .. } => None,
        }
    }

    pub fn is_dynamic_target(&self) -> bool {
        matches!(self, DependencyTarget::DynamicTarget { .. })
    }

    /// jsr/npm imports resolve through the module proxy, never through direct egress.
    pub fn is_module_proxy(&self) -> bool {
        matches!(self, DependencyTarget::Jsr { .. } | DependencyTarget::Npm { .. })
    }
}

/// Credentials a dependency needs; `secret` is a `service.key` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyAuth {
    pub kind: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub target: DependencyTarget,
    pub auth: Option<DependencyAuth>,
    /// Unrecognized keys, kept for forward compatibility.
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Dependency {
    pub fn new(target: DependencyTarget) -> Self {
        Self {
            target,
            auth: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn https(host: impl Into<String>) -> Self {
        Self::new(DependencyTarget::Https {
            host: host.into(),
            port: None,
        })
    }

    pub fn postgresql(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self::new(DependencyTarget::Postgresql {
            host: host.into(),
            port: None,
            database: database.into(),
            user: user.into(),
        })
    }

    pub fn nats(
        host: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self::new(DependencyTarget::Nats {
            host: host.into(),
            port: None,
            subject: subject.into(),
        })
    }

    pub fn blob(
        host: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::new(DependencyTarget::Blob {
            host: host.into(),
            port: None,
            container: container.into(),
        })
    }

    pub fn jsr(specifier: impl Into<String>) -> Self {
        Self::new(DependencyTarget::Jsr {
            specifier: specifier.into(),
            version: None,
        })
    }

    pub fn npm(specifier: impl Into<String>) -> Self {
        Self::new(DependencyTarget::Npm {
            specifier: specifier.into(),
            version: None,
        })
    }

    pub fn dynamic_target(
        protocol: impl Into<String>,
        cidr: IpNet,
        ports: Vec<PortSpec>,
    ) -> Self {
        Self::new(DependencyTarget::DynamicTarget {
            protocol: protocol.into(),
            cidr,
            ports,
        })
    }

    /// Set an explicit port. No effect on targets without a port.
    pub fn with_port(
        mut self,
        port: u16,
    ) -> Self {
        if let Some(slot) = self.target.port_mut() {
            *slot = Some(port);
        }
        self
    }

    pub fn with_auth(
        mut self,
        kind: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.auth = Some(DependencyAuth {
            kind: kind.into(),
            secret: secret.into(),
        });
        self
    }

    /// Copy with the protocol default filled in where no port was declared.
    pub fn with_default_port(&self) -> Self {
        let mut dep = self.clone();
        if let (Some(port), Some(slot)) = (self.target.resolved_port(), dep.target.port_mut()) {
            *slot = Some(port);
        }
        dep
    }

    pub fn protocol(&self) -> &str {
        self.target.protocol()
    }

    pub fn host(&self) -> Option<&str> {
        self.target.host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(DependencyProtocol::Https.default_port(), Some(443));
        assert_eq!(DependencyProtocol::Postgresql.default_port(), Some(5432));
        assert_eq!(DependencyProtocol::Nats.default_port(), Some(4222));
        assert_eq!(DependencyProtocol::Blob.default_port(), None);
        assert_eq!(DependencyProtocol::Jsr.default_port(), None);
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("postgresql".parse::<DependencyProtocol>().unwrap(), DependencyProtocol::Postgresql);
        assert!("grpc".parse::<DependencyProtocol>().is_err());
    }

    #[test]
    fn test_port_spec_parse() {
        assert_eq!("443/TCP".parse::<PortSpec>().unwrap(), PortSpec::tcp(443));
        assert_eq!("8443".parse::<PortSpec>().unwrap(), PortSpec::tcp(8443));
        assert_eq!(
            "53/udp".parse::<PortSpec>().unwrap(),
            PortSpec {
                port: 53,
                protocol: TransportProtocol::Udp
            }
        );
        assert!("0/TCP".parse::<PortSpec>().is_err());
        assert!("abc".parse::<PortSpec>().is_err());
        assert!("443/SCTP".parse::<PortSpec>().is_err());
        assert!("70000".parse::<PortSpec>().is_err());
    }

    #[test]
    fn test_resolved_port_uses_protocol_default() {
        assert_eq!(Dependency::https("api.github.com").target.resolved_port(), Some(443));
        assert_eq!(Dependency::https("api.github.com").with_port(8443).target.resolved_port(), Some(8443));
        assert_eq!(Dependency::blob("acct.blob.core.windows.net", "reports").target.resolved_port(), None);
        assert_eq!(Dependency::jsr("@db/postgres").target.resolved_port(), None);
    }

    #[test]
    fn test_with_default_port_returns_copy() {
        let dep = Dependency::postgresql("db.internal", "app", "svc");
        let filled = dep.with_default_port();
        assert_eq!(dep.target.port(), None);
        assert_eq!(filled.target.port(), Some(5432));
    }

    #[test]
    fn test_host_only_for_fixed_targets() {
        assert_eq!(Dependency::nats("nats.example.com", "events").host(), Some("nats.example.com"));
        assert_eq!(Dependency::npm("zod").host(), None);
        let dynamic = Dependency::dynamic_target("https", "0.0.0.0/0".parse().unwrap(), vec![PortSpec::tcp(443)]);
        assert_eq!(dynamic.host(), None);
        assert!(dynamic.target.is_dynamic_target());
        assert_eq!(dynamic.protocol(), "https");
    }
}
