use std::fmt;
use std::str::FromStr;

pub mod aggregator;
pub mod grouping;
pub mod policy;
pub mod statistics;

pub use aggregator::{AggregatedMetric, IndexAssignment, aggregate};
pub use grouping::{Group, group_kpis};
pub use policy::{Grouping, MetricPolicy, PolicyRules, ValueTransform};

/// Monitoring backend a run was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Cloud-provider monitoring (metric types such as `kubernetes.io/...`).
    Cloud,
    /// Service mesh Prometheus.
    Mesh,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Cloud => write!(f, "cloud"),
            Backend::Mesh => write!(f, "mesh"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud" | "gcloud" => Ok(Backend::Cloud),
            "mesh" | "prometheus" => Ok(Backend::Mesh),
            other => Err(format!("unknown backend {}", other)),
        }
    }
}

/// Settings shared by the default policy rule tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Label holding the namespace of a KPI.
    pub namespace_label: String,
    /// Namespace of the system under test.
    pub namespace: String,
    /// Extracts a service name from a pod name; first capture group.
    pub service_pattern: String,
    /// Placeholder for missing selected labels of alert metrics.
    pub fill_placeholder: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            namespace_label: "namespace".to_string(),
            namespace: "alms".to_string(),
            service_pattern: "(alms[-a-z]+)-".to_string(),
            fill_placeholder: "undefined".to_string(),
        }
    }
}
