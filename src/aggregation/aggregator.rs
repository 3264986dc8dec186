use std::collections::BTreeSet;

use tracing::debug;

use super::grouping::Group;
use super::policy::{Grouping, MetricPolicy};
use super::statistics;
use crate::datamodel::{
    AggColumn, AggregatedSeries, DistributionComponent, KpiCatalog, KpiEntry, MetricTable,
    RawColumn, ValueComponent,
};
use crate::error::Result;

/// How aggregated KPIs get their index.
#[derive(Debug, Clone, Copy)]
pub enum IndexAssignment<'a> {
    /// 1..N over the accepted groups, in group order.
    Sequential,
    /// Reuse the index of the reference row with exactly the same labels;
    /// groups without such a row are dropped.
    Referred(&'a KpiCatalog),
}

/// Output of one metric type for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedMetric {
    pub catalog: KpiCatalog,
    pub series: AggregatedSeries,
}

impl AggregatedMetric {
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty() || self.series.is_empty()
    }
}

pub fn aggregate(
    metric_name: &str,
    groups: &[Group],
    table: &MetricTable,
    policy: &MetricPolicy,
    assignment: IndexAssignment<'_>,
) -> Result<AggregatedMetric> {
    let distribution = table.is_distribution();
    let passthrough = matches!(policy.grouping, Grouping::NoAggregation) && !distribution;
    let components: Vec<ValueComponent> = if distribution {
        DistributionComponent::ALL
            .iter()
            .map(|component| ValueComponent::Distribution(*component))
            .collect()
    } else {
        vec![ValueComponent::Value]
    };
    let with_data: BTreeSet<u32> = table.kpi_indices();

    let mut output = AggregatedMetric::default();
    let mut next_index = 1;
    for group in groups {
        let members: Vec<u32> = group
            .members
            .iter()
            .copied()
            .filter(|member| with_data.contains(member))
            .collect();
        if members.is_empty() {
            debug!("Group {:?} of {} has no data", group.key, metric_name);
            continue;
        }

        let index = match assignment {
            IndexAssignment::Sequential => {
                next_index += 1;
                next_index - 1
            }
            IndexAssignment::Referred(reference) => match reference.find(&group.key) {
                Some(index) => index,
                None => {
                    debug!("Group {:?} of {} is not in the reference catalog", group.key, metric_name);
                    continue;
                }
            },
        };

        if passthrough {
            for member in &members {
                if let Some(position) = table.position(&RawColumn::new(*member, ValueComponent::Value)) {
                    output
                        .series
                        .push_column(AggColumn::passthrough(index), table.column_values(position));
                }
            }
        } else {
            for component in &components {
                let positions: Vec<usize> = members
                    .iter()
                    .filter_map(|member| table.position(&RawColumn::new(*member, *component)))
                    .collect();
                for statistic in &policy.statistics {
                    let column = match component {
                        ValueComponent::Value => AggColumn::scalar(index, *statistic),
                        ValueComponent::Distribution(part) => {
                            AggColumn::distribution(index, *statistic, *part)
                        }
                    };
                    let values = table.rows().map(|(timestamp, row)| {
                        let present: Vec<f64> = positions
                            .iter()
                            .filter_map(|position| policy.transform.apply(row[*position]))
                            .collect();
                        (timestamp, statistics::compute(*statistic, &present))
                    });
                    output.series.push_column(column, values);
                }
            }
        }
        output.catalog.push(KpiEntry::new(index, group.key.clone()))?;
    }

    Ok(output)
}
