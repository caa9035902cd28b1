//! Well-known names, labels and ports shared by derivation, synthesis and audit.

/// Port the workflow service listens on.
pub const WORKFLOW_PORT: u16 = 8080;

/// Listening address granted to the runtime in scoped network flags.
pub const WORKFLOW_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Cluster DNS service.
pub const DNS_HOST: &str = "kube-dns.kube-system.svc.cluster.local";
pub const DNS_PORT: u16 = 53;

/// Suffix identifying cluster-internal service hosts.
pub const CLUSTER_LOCAL_SUFFIX: &str = ".svc.cluster.local";

/// In-cluster module-resolution proxy used for jsr/npm imports.
pub const DEFAULT_MODULE_PROXY_HOST: &str = "esm-sh.flowpact-system.svc.cluster.local:8080";

/// The only contract version understood by the validator.
pub const CONTRACT_VERSION: &str = "1";

/// `type` value marking a dependency whose destination is a CIDR range.
pub const DYNAMIC_TARGET_TYPE: &str = "dynamic-target";

pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "flowpact";
pub const ROLE_LABEL: &str = "flowpact.dev/role";
pub const TRIGGER_ROLE: &str = "trigger";
pub const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";
pub const DNS_POD_LABEL: &str = "k8s-app";
pub const DNS_POD_LABEL_VALUE: &str = "kube-dns";
pub const DNS_NAMESPACE: &str = "kube-system";

/// Annotation recording the external `host:port` targets a policy was generated for.
pub const INTENDED_HOSTS_ANNOTATION: &str = "flowpact.dev/intended-hosts";

pub const DEFAULT_CONTROL_PLANE_NAMESPACE: &str = "flowpact-system";
pub const DEFAULT_CONTROL_PLANE_APP: &str = "flowpact-mcp";
pub const DEFAULT_INGRESS_GATEWAY_NAMESPACE: &str = "istio-system";
pub const DEFAULT_NAMESPACE: &str = "default";

/// Destination used for external fixed hosts, minus the private ranges below.
pub const ANY_IPV4: &str = "0.0.0.0/0";
pub const PRIVATE_RANGES: [&str; 3] = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

pub const NETPOL_SUFFIX: &str = "-netpol";
pub const TRIGGER_NETPOL_SUFFIX: &str = "-trigger-netpol";
