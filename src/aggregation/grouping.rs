use std::collections::BTreeMap;

use tracing::debug;

use super::policy::{Grouping, LabelSelector, NamespaceFilter};
use super::MetricPolicy;
use crate::datamodel::{KpiCatalog, KpiEntry, KpiLabels, KpiLabelsExt, LabelValue};
use crate::error::{KpiError, Result};

/// KPIs collapsed into one aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: KpiLabels,
    pub members: Vec<u32>,
}

/// Partition the KPIs of one metric type according to its policy.
///
/// Groups come out in ascending key order, except for
/// [`Grouping::NoAggregation`] which keeps the catalog order.
pub fn group_kpis(metric_name: &str, catalog: &KpiCatalog, policy: &MetricPolicy) -> Result<Vec<Group>> {
    let filtered;
    let catalog = match &policy.namespace_filter {
        Some(filter) if catalog.has_label(&filter.label) => {
            filtered = filter_namespace(catalog, filter);
            if filtered.is_empty() {
                return Err(KpiError::empty_payload(format!(
                    "no KPI of {} in namespace {}",
                    metric_name, filter.value
                )));
            }
            &filtered
        }
        _ => catalog,
    };

    let grouping = resolve(metric_name, catalog, &policy.grouping)?;
    debug!("Grouping {} with {:?}", metric_name, grouping);
    Ok(partition(catalog, grouping))
}

fn filter_namespace(catalog: &KpiCatalog, filter: &NamespaceFilter) -> KpiCatalog {
    let namespace = LabelValue::from(filter.value.as_str());
    let mut filtered = catalog.clone();
    filtered.retain(|entry| entry.labels.label(&filter.label) == Some(&namespace));
    filtered
}

/// Unwrap fallbacks and check that the required label columns exist.
fn resolve<'a>(metric_name: &str, catalog: &KpiCatalog, grouping: &'a Grouping) -> Result<&'a Grouping> {
    match grouping {
        Grouping::Fallback(alternatives) => {
            for alternative in alternatives {
                if let Ok(resolved) = resolve(metric_name, catalog, alternative) {
                    return Ok(resolved);
                }
            }
            let labels: Vec<&str> = alternatives
                .iter()
                .flat_map(|alternative| alternative.required_labels())
                .collect();
            Err(KpiError::MissingLabel {
                label: labels.join(" or "),
                metric_name: metric_name.to_string(),
            })
        }
        other => match other
            .required_labels()
            .into_iter()
            .find(|label| !catalog.has_label(label))
        {
            Some(label) => Err(KpiError::MissingLabel {
                label: label.to_string(),
                metric_name: metric_name.to_string(),
            }),
            None => Ok(other),
        },
    }
}

fn partition(catalog: &KpiCatalog, grouping: &Grouping) -> Vec<Group> {
    match grouping {
        Grouping::NoAggregation => catalog
            .entries()
            .iter()
            .map(|entry| Group {
                key: entry.labels.clone(),
                members: vec![entry.index],
            })
            .collect(),
        Grouping::SingleLabel(selector) => {
            group_by_key(catalog, |entry| select_label(entry, selector).map(|pair| vec![pair]))
        }
        Grouping::GroupByAll(label) => group_by_key(catalog, |entry| {
            entry
                .labels
                .label(label)
                .map(|value| vec![(label.clone(), value.clone())])
        }),
        Grouping::SelectedLabels {
            labels,
            fill_missing,
        } => group_by_key(catalog, |entry| {
            labels
                .iter()
                .map(|label| {
                    entry
                        .labels
                        .label(label)
                        .cloned()
                        .or_else(|| fill_missing.as_deref().map(LabelValue::from))
                        .map(|value| (label.clone(), value))
                })
                .collect()
        }),
        Grouping::ConstantColumns => {
            let key: Vec<(String, LabelValue)> = catalog
                .label_names()
                .into_iter()
                .filter_map(|name| constant_value(catalog, &name).map(|value| (name, value)))
                .collect();
            group_by_key(catalog, |_| Some(key.clone()))
        }
        Grouping::VaryingLabels { excluded } => {
            let names: Vec<String> = catalog
                .label_names()
                .into_iter()
                .filter(|name| !excluded.contains(name))
                .filter(|name| catalog.distinct_values(name).len() > 1)
                .collect();
            group_by_key(catalog, |entry| {
                names
                    .iter()
                    .map(|name| entry.labels.label(name).map(|value| (name.clone(), value.clone())))
                    .collect()
            })
        }
        // resolved beforehand
        Grouping::Fallback(_) => Vec::new(),
    }
}

fn select_label(entry: &KpiEntry, selector: &LabelSelector) -> Option<(String, LabelValue)> {
    let value = entry.labels.label(&selector.source)?;
    let value = match &selector.pattern {
        None => value.clone(),
        Some(pattern) => {
            let captures = pattern.captures(value.as_str()?)?;
            LabelValue::from(captures.get(1)?.as_str())
        }
    };
    Some((selector.key.clone(), value))
}

/// The single value of a label present in every entry, if any.
fn constant_value(catalog: &KpiCatalog, name: &str) -> Option<LabelValue> {
    let mut values = catalog.entries().iter().map(|entry| entry.labels.label(name));
    let first = values.next()??;
    values
        .all(|value| value == Some(first))
        .then(|| first.clone())
}

/// Group entries by the ordered key pairs returned by `key_of`; entries with
/// no key are left out.
fn group_by_key<F>(catalog: &KpiCatalog, mut key_of: F) -> Vec<Group>
where
    F: FnMut(&KpiEntry) -> Option<Vec<(String, LabelValue)>>,
{
    let mut groups: BTreeMap<Vec<LabelValue>, Group> = BTreeMap::new();
    for entry in catalog.entries() {
        let Some(pairs) = key_of(entry) else {
            debug!("KPI {} has no grouping key", entry.index);
            continue;
        };
        let sort_key: Vec<LabelValue> = pairs.iter().map(|(_, value)| value.clone()).collect();
        groups
            .entry(sort_key)
            .or_insert_with(|| Group {
                key: KpiLabels::from_pairs(pairs.into_iter().map(|(name, value)| (name, Some(value)))),
                members: Vec::new(),
            })
            .members
            .push(entry.index);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::policy::PolicyRules;
    use crate::aggregation::AggregationConfig;
    use regex::Regex;

    fn catalog(rows: &[(u32, &[(&str, &str)])]) -> KpiCatalog {
        KpiCatalog::new(
            rows.iter()
                .map(|(index, pairs)| {
                    KpiEntry::new(
                        *index,
                        KpiLabels::from_pairs(
                            pairs.iter().map(|(k, v)| (k.to_string(), Some(LabelValue::from(*v)))),
                        ),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn members(groups: &[Group]) -> Vec<Vec<u32>> {
        groups.iter().map(|g| g.members.clone()).collect()
    }

    #[test]
    fn test_group_by_container() {
        let catalog = catalog(&[
            (1, &[("container", "a")]),
            (2, &[("container", "a")]),
            (3, &[("container", "b")]),
        ]);
        let policy = MetricPolicy::new(Grouping::SingleLabel(LabelSelector::label("container")));
        let groups = group_kpis("container_memory", &catalog, &policy).unwrap();
        assert_eq!(members(&groups), vec![vec![1, 2], vec![3]]);
        assert_eq!(groups[0].key.label("container"), Some(&LabelValue::from("a")));
    }

    #[test]
    fn test_pattern_extraction_drops_non_matching() {
        let catalog = catalog(&[
            (1, &[("pod", "alms-web-7d9f-x2")]),
            (2, &[("pod", "alms-web-7d9f-k8")]),
            (3, &[("pod", "kube-proxy-1")]),
            (4, &[("pod", "alms-db-0")]),
        ]);
        let selector = LabelSelector::extract("pod", "pod_service", Regex::new("(alms[-a-z]+)-").unwrap());
        let groups = group_kpis("m", &catalog, &MetricPolicy::new(Grouping::SingleLabel(selector))).unwrap();
        assert_eq!(members(&groups), vec![vec![4], vec![1, 2]]);
        assert_eq!(groups[1].key.label("pod_service"), Some(&LabelValue::from("alms-web")));
        assert_eq!(groups[0].key.label("pod"), None);
    }

    #[test]
    fn test_missing_key_values_are_dropped_or_filled() {
        let catalog = catalog(&[
            (1, &[("alertname", "Down"), ("container", "api")]),
            (2, &[("alertname", "Down"), ("severity", "page")]),
        ]);
        let without_fill = MetricPolicy::new(Grouping::SelectedLabels {
            labels: vec!["alertname".to_string(), "container".to_string()],
            fill_missing: None,
        });
        assert_eq!(members(&group_kpis("m", &catalog, &without_fill).unwrap()), vec![vec![1]]);

        let with_fill = MetricPolicy::new(Grouping::SelectedLabels {
            labels: vec!["alertname".to_string(), "container".to_string()],
            fill_missing: Some("undefined".to_string()),
        });
        let groups = group_kpis("m", &catalog, &with_fill).unwrap();
        assert_eq!(members(&groups), vec![vec![1], vec![2]]);
        assert_eq!(groups[1].key.label("container"), Some(&LabelValue::from("undefined")));
    }

    #[test]
    fn test_namespace_filter_and_fallback() {
        let catalog = catalog(&[
            (1, &[("namespace", "alms"), ("pod", "alms-web-1")]),
            (2, &[("namespace", "kube-system"), ("pod", "alms-web-2")]),
            (3, &[("namespace", "alms"), ("pod", "alms-api-3")]),
        ]);
        let rules = PolicyRules::mesh(&AggregationConfig::default()).unwrap();
        let policy = rules.select("container_cpu_usage_seconds_total").unwrap();
        let groups = group_kpis("container_cpu_usage_seconds_total", &catalog, policy).unwrap();
        assert_eq!(members(&groups), vec![vec![3], vec![1]]);
        assert!(groups[0].key.label("pod_service").is_some());
    }

    #[test]
    fn test_missing_label_column() {
        let catalog = catalog(&[(1, &[("node", "n1")])]);
        let policy = MetricPolicy::new(Grouping::GroupByAll("project_id".to_string()));
        assert!(matches!(
            group_kpis("kubernetes.io/node/cpu", &catalog, &policy),
            Err(KpiError::MissingLabel { .. })
        ));
    }

    #[test]
    fn test_constant_and_varying_labels() {
        let catalog = catalog(&[
            (1, &[("job", "node"), ("instance", "i1"), ("mode", "idle")]),
            (2, &[("job", "node"), ("instance", "i2"), ("mode", "user")]),
            (3, &[("job", "node"), ("instance", "i3"), ("mode", "idle")]),
        ]);
        let constant = group_kpis("node_cpu", &catalog, &MetricPolicy::new(Grouping::ConstantColumns)).unwrap();
        assert_eq!(members(&constant), vec![vec![1, 2, 3]]);
        assert_eq!(constant[0].key.len(), 1);
        assert_eq!(constant[0].key.label("job"), Some(&LabelValue::from("node")));

        let varying = MetricPolicy::new(Grouping::VaryingLabels {
            excluded: vec!["instance".to_string()],
        });
        let groups = group_kpis("kube_x", &catalog, &varying).unwrap();
        assert_eq!(members(&groups), vec![vec![1, 3], vec![2]]);
        assert_eq!(groups[0].key.len(), 1);
    }

    #[test]
    fn test_no_aggregation_keeps_catalog_order() {
        let catalog = catalog(&[(5, &[("a", "z")]), (2, &[("a", "y")])]);
        let groups = group_kpis("m", &catalog, &MetricPolicy::new(Grouping::NoAggregation)).unwrap();
        assert_eq!(members(&groups), vec![vec![5], vec![2]]);
    }
}
