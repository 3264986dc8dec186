//! Tagged aggregation policies and the rule tables that select them.

use regex::Regex;

use super::{AggregationConfig, Backend};
use crate::datamodel::Statistic;
use crate::error::{KpiError, Result};

/// Statistics of scalar and distribution metrics.
pub const SUMMARY_STATISTICS: [Statistic; 6] = [
    Statistic::Min,
    Statistic::Max,
    Statistic::Mean,
    Statistic::Median,
    Statistic::Std,
    Statistic::Count,
];

/// Statistics of alert metrics.
pub const ALERT_STATISTICS: [Statistic; 2] = [Statistic::Sum, Statistic::Count];

/// Reads one label, optionally through the first capture group of a regex,
/// and stores the result under `key`.
#[derive(Debug, Clone)]
pub struct LabelSelector {
    pub source: String,
    pub key: String,
    pub pattern: Option<Regex>,
}

impl LabelSelector {
    pub fn label(name: &str) -> Self {
        Self {
            source: name.to_string(),
            key: name.to_string(),
            pattern: None,
        }
    }

    pub fn extract(source: &str, key: &str, pattern: Regex) -> Self {
        Self {
            source: source.to_string(),
            key: key.to_string(),
            pattern: Some(pattern),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Grouping {
    /// Every KPI on its own, keyed by all of its labels.
    NoAggregation,
    SingleLabel(LabelSelector),
    /// One group per value of a deployment-wide label.
    GroupByAll(String),
    SelectedLabels {
        labels: Vec<String>,
        fill_missing: Option<String>,
    },
    /// Labels with one identical value in every KPI.
    ConstantColumns,
    /// Labels with more than one distinct value, minus `excluded`.
    VaryingLabels { excluded: Vec<String> },
    /// First applicable grouping.
    Fallback(Vec<Grouping>),
}

impl Grouping {
    /// Label columns the grouping cannot work without.
    pub fn required_labels(&self) -> Vec<&str> {
        match self {
            Grouping::SingleLabel(selector) => vec![selector.source.as_str()],
            Grouping::GroupByAll(label) => vec![label.as_str()],
            Grouping::SelectedLabels {
                labels,
                fill_missing: None,
            } => labels.iter().map(String::as_str).collect(),
            Grouping::SelectedLabels { .. }
            | Grouping::NoAggregation
            | Grouping::ConstantColumns
            | Grouping::VaryingLabels { .. }
            | Grouping::Fallback(_) => Vec::new(),
        }
    }
}

/// Per-value transformation applied before computing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueTransform {
    #[default]
    None,
    /// Missing values count as 0.
    FillZero,
    /// Present values become 1, missing ones 0.
    Presence,
}

impl ValueTransform {
    pub fn apply(self, value: Option<f64>) -> Option<f64> {
        match self {
            ValueTransform::None => value,
            ValueTransform::FillZero => Some(value.unwrap_or(0.0)),
            ValueTransform::Presence => Some(if value.is_some() { 1.0 } else { 0.0 }),
        }
    }
}

/// Keep only the KPIs whose `label` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFilter {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct MetricPolicy {
    pub grouping: Grouping,
    pub transform: ValueTransform,
    pub statistics: Vec<Statistic>,
    pub namespace_filter: Option<NamespaceFilter>,
}

impl MetricPolicy {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            transform: ValueTransform::None,
            statistics: SUMMARY_STATISTICS.to_vec(),
            namespace_filter: None,
        }
    }

    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_statistics(mut self, statistics: &[Statistic]) -> Self {
        self.statistics = statistics.to_vec();
        self
    }

    pub fn with_namespace_filter(mut self, filter: Option<NamespaceFilter>) -> Self {
        self.namespace_filter = filter;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatcher {
    Equal(String),
    Prefix(String),
}

impl NameMatcher {
    pub fn matches(&self, metric_name: &str) -> bool {
        match self {
            NameMatcher::Equal(name) => metric_name == name,
            NameMatcher::Prefix(prefix) => metric_name.starts_with(prefix.as_str()),
        }
    }
}

/// Ordered metric-name rules; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct PolicyRules {
    rules: Vec<(NameMatcher, MetricPolicy)>,
}

impl PolicyRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, name: &str, policy: MetricPolicy) -> Self {
        self.rules.push((NameMatcher::Equal(name.to_string()), policy));
        self
    }

    pub fn prefix(mut self, prefixes: &[&str], policy: MetricPolicy) -> Self {
        for prefix in prefixes {
            self.rules
                .push((NameMatcher::Prefix(prefix.to_string()), policy.clone()));
        }
        self
    }

    pub fn select(&self, metric_name: &str) -> Result<&MetricPolicy> {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(metric_name))
            .map(|(_, policy)| policy)
            .ok_or_else(|| KpiError::UnsupportedMetric {
                metric_name: metric_name.to_string(),
            })
    }

    pub fn for_backend(backend: Backend, config: &AggregationConfig) -> Result<Self> {
        match backend {
            Backend::Cloud => Self::cloud(config),
            Backend::Mesh => Self::mesh(config),
        }
    }

    /// Cloud-provider monitoring metric types.
    pub fn cloud(config: &AggregationConfig) -> Result<Self> {
        let service = compile_pattern(&config.service_pattern)?;
        Ok(Self::new()
            .prefix(
                &["kubernetes.io/autoscaler"],
                MetricPolicy::new(Grouping::NoAggregation),
            )
            .prefix(
                &["kubernetes.io/container"],
                MetricPolicy::new(Grouping::SingleLabel(LabelSelector::label("container_name"))),
            )
            .prefix(
                &["kubernetes.io/pod", "networking.googleapis.com/pod_flow"],
                MetricPolicy::new(Grouping::SingleLabel(LabelSelector::extract(
                    "pod_name", "pod_name", service,
                ))),
            )
            .prefix(
                &["kubernetes.io/node", "networking.googleapis.com/vpc_flow"],
                MetricPolicy::new(Grouping::GroupByAll("project_id".to_string())),
            )
            .prefix(
                &[
                    "networking.googleapis.com/node_flow",
                    "networking.googleapis.com/vm_flow",
                ],
                MetricPolicy::new(Grouping::Fallback(vec![
                    Grouping::SelectedLabels {
                        labels: vec!["remote_network".to_string()],
                        fill_missing: None,
                    },
                    Grouping::GroupByAll("project_id".to_string()),
                ])),
            ))
    }

    /// Service-mesh (Prometheus) metric names.
    pub fn mesh(config: &AggregationConfig) -> Result<Self> {
        let service = compile_pattern(&config.service_pattern)?;
        let namespace = Some(NamespaceFilter {
            label: config.namespace_label.clone(),
            value: config.namespace.clone(),
        });
        let alerts = Grouping::SelectedLabels {
            labels: vec!["alertname".to_string(), "container".to_string()],
            fill_missing: Some(config.fill_placeholder.clone()),
        };

        Ok(Self::new()
            .exact(
                "ALERTS",
                MetricPolicy::new(alerts.clone())
                    .with_transform(ValueTransform::FillZero)
                    .with_statistics(&ALERT_STATISTICS)
                    .with_namespace_filter(namespace.clone()),
            )
            .exact(
                "ALERTS_FOR_STATE",
                MetricPolicy::new(alerts)
                    .with_transform(ValueTransform::Presence)
                    .with_statistics(&ALERT_STATISTICS)
                    .with_namespace_filter(namespace.clone()),
            )
            .prefix(
                &["container"],
                MetricPolicy::new(Grouping::Fallback(vec![
                    Grouping::SingleLabel(LabelSelector::label("container")),
                    Grouping::SingleLabel(LabelSelector::extract("pod", "pod_service", service)),
                ]))
                .with_namespace_filter(namespace.clone()),
            )
            .prefix(
                &["instance", "node_"],
                MetricPolicy::new(Grouping::ConstantColumns),
            )
            .prefix(
                &["kube"],
                MetricPolicy::new(Grouping::VaryingLabels {
                    excluded: ["instance", "pod", "status", "condition"]
                        .iter()
                        .map(|label| label.to_string())
                        .collect(),
                })
                .with_namespace_filter(namespace.clone()),
            )
            .prefix(
                &["namespace", ":node", "node:"],
                MetricPolicy::new(Grouping::NoAggregation).with_namespace_filter(namespace),
            ))
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)
        .map_err(|err| KpiError::invalid_data_format(&err.to_string(), pattern))?;
    if regex.captures_len() < 2 {
        return Err(KpiError::invalid_data_format(
            "pattern needs a capture group",
            pattern,
        ));
    }
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_rules() {
        let rules = PolicyRules::cloud(&AggregationConfig::default()).unwrap();
        assert!(matches!(
            rules
                .select("kubernetes.io/autoscaler/container/cpu/request_utilization")
                .unwrap()
                .grouping,
            Grouping::NoAggregation
        ));
        match &rules.select("kubernetes.io/container/memory/used_bytes").unwrap().grouping {
            Grouping::SingleLabel(selector) => assert_eq!(selector.source, "container_name"),
            other => panic!("unexpected grouping {:?}", other),
        }
        assert!(matches!(
            rules.select("networking.googleapis.com/vm_flow/egress_bytes_count").unwrap().grouping,
            Grouping::Fallback(_)
        ));
        assert!(matches!(
            rules.select("compute.googleapis.com/instance/uptime"),
            Err(KpiError::UnsupportedMetric { .. })
        ));
    }

    #[test]
    fn test_mesh_rules() {
        let rules = PolicyRules::mesh(&AggregationConfig::default()).unwrap();
        let alerts = rules.select("ALERTS").unwrap();
        assert_eq!(alerts.transform, ValueTransform::FillZero);
        assert_eq!(alerts.statistics, ALERT_STATISTICS.to_vec());
        assert!(alerts.namespace_filter.is_some());

        let for_state = rules.select("ALERTS_FOR_STATE").unwrap();
        assert_eq!(for_state.transform, ValueTransform::Presence);

        // prefix "ALERTS" is not a rule
        assert!(rules.select("ALERTS_EXTRA").is_err());

        assert!(matches!(
            rules.select("node_load1").unwrap().grouping,
            Grouping::ConstantColumns
        ));
        assert!(matches!(
            rules.select("node:node_num_cpu:sum").unwrap().grouping,
            Grouping::NoAggregation
        ));
        assert!(matches!(
            rules.select("kube_pod_status_phase").unwrap().grouping,
            Grouping::VaryingLabels { .. }
        ));
    }

    #[test]
    fn test_transforms() {
        assert_eq!(ValueTransform::FillZero.apply(None), Some(0.0));
        assert_eq!(ValueTransform::Presence.apply(Some(1700000000.0)), Some(1.0));
        assert_eq!(ValueTransform::Presence.apply(None), Some(0.0));
        assert_eq!(ValueTransform::None.apply(None), None);
    }

    #[test]
    fn test_service_pattern_needs_a_group() {
        let config = AggregationConfig {
            service_pattern: "alms".to_string(),
            ..AggregationConfig::default()
        };
        assert!(PolicyRules::cloud(&config).is_err());
    }
}
