use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use super::catalog::read_raw_catalog;
use super::read_csv_grid;
use crate::datamodel::datagrid::{StringDataGrid, parse_numeric_cell};
use crate::datamodel::{DistributionComponent, KpiCatalog, MetricTable, Minute, RawColumn, ValueComponent};
use crate::error::{KpiError, Result};

/// Components of one raw KPI file, in column order.
fn components_of(grid: &StringDataGrid, context: &str) -> Result<(usize, Vec<(usize, ValueComponent)>)> {
    let timestamp_position = grid
        .column_position("timestamp")
        .ok_or_else(|| KpiError::invalid_data_format("missing timestamp column", context))?;

    let mut components = Vec::new();
    for (position, name) in grid.column_names.iter().enumerate() {
        if position == timestamp_position {
            continue;
        }
        let component = ValueComponent::parse(name).ok_or_else(|| {
            KpiError::invalid_data_format(&format!("unexpected column {:?}", name), context)
        })?;
        components.push((position, component));
    }

    let is_scalar = components.len() == 1 && components[0].1 == ValueComponent::Value;
    let is_distribution = components.len() == DistributionComponent::ALL.len()
        && DistributionComponent::ALL.iter().all(|expected| {
            components
                .iter()
                .any(|(_, component)| *component == ValueComponent::Distribution(*expected))
        });
    if !is_scalar && !is_distribution {
        return Err(KpiError::invalid_data_format(
            "expected either value or count,mean,sum_of_squared_deviation",
            context,
        ));
    }
    // distribution components always in count, mean, sum_of_squared_deviation order
    components.sort_by_key(|(_, component)| *component);
    Ok((timestamp_position, components))
}

/// Minute-rounded values of one component; duplicate minutes are averaged.
fn minute_means(
    grid: &StringDataGrid,
    timestamp_position: usize,
    position: usize,
    context: &str,
) -> Result<BTreeMap<Minute, Option<f64>>> {
    let mut sums: BTreeMap<Minute, (f64, usize)> = BTreeMap::new();
    for row in &grid.rows {
        let minute = Minute::parse(&row[timestamp_position])?;
        let accumulator = sums.entry(minute).or_insert((0.0, 0));
        if let Some(value) = parse_numeric_cell(&row[position], context)? {
            accumulator.0 += value;
            accumulator.1 += 1;
        }
    }
    Ok(sums
        .into_iter()
        .map(|(minute, (sum, count))| (minute, (count > 0).then(|| sum / count as f64)))
        .collect())
}

/// Load the catalog and every KPI series of a raw `metric-type-{i}` folder.
///
/// Missing or header-only KPI files leave the KPI out of the table.
pub async fn read_metric_table(metric_dir: &Path) -> Result<(KpiCatalog, MetricTable)> {
    let catalog = read_raw_catalog(metric_dir).await?;
    let mut table = MetricTable::new();

    for entry in catalog.entries() {
        let path = metric_dir.join(format!("kpi-{}.csv", entry.index));
        let context = path.display().to_string();
        let grid = match read_csv_grid(&path).await? {
            Some(grid) => grid,
            None => {
                debug!("No series for KPI {} in {}", entry.index, metric_dir.display());
                continue;
            }
        };
        if grid.is_empty() {
            debug!("Empty series {}", context);
            continue;
        }

        let (timestamp_position, components) = components_of(&grid, &context)?;
        for (position, component) in components {
            let values = minute_means(&grid, timestamp_position, position, &context)?;
            table.push_column(RawColumn::new(entry.index, component), values);
        }
    }

    if table.is_empty() {
        return Err(KpiError::empty_payload(format!(
            "no KPI data in {}",
            metric_dir.display()
        )));
    }
    Ok((catalog, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(dir: &Path, name: &str, content: &str) {
        tokio::fs::write(dir.join(name), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_scalar_kpis_are_outer_joined_and_rounded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "kpi_map.jsonl",
            "{\"index\": 1, \"kpi\": {\"container_name\": \"a\"}}\n{\"index\": 2, \"kpi\": {\"container_name\": \"b\"}}\n{\"index\": 3, \"kpi\": {\"container_name\": \"c\"}}\n",
        )
        .await;
        // 1609459200 is 2021-01-01 00:00:00
        write(dir.path(), "kpi-1.csv", "timestamp,value\n1609459205,1.0\n1609459195,3.0\n1609459260,5.0\n").await;
        write(dir.path(), "kpi-2.csv", "timestamp,value\n1609459320,7.0\n").await;
        write(dir.path(), "kpi-3.csv", "timestamp,value\n").await;

        let (catalog, table) = read_metric_table(dir.path()).await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(!table.is_distribution());
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.num_rows(), 3);

        let first = table.position(&RawColumn::new(1, ValueComponent::Value)).unwrap();
        let t0 = Minute::from_unix_seconds_i64(1609459200);
        assert_eq!(table.get(t0, first), Some(2.0));
        let second = table.position(&RawColumn::new(2, ValueComponent::Value)).unwrap();
        assert_eq!(table.get(t0, second), None);
    }

    #[tokio::test]
    async fn test_distribution_components_are_ordered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "kpi_map.json", r#"[{"index": 4, "kpi": {"project_id": "p"}}]"#).await;
        write(
            dir.path(),
            "kpi-4.csv",
            "timestamp,mean,count,sum_of_squared_deviation\n1609459200,2.0,3,0.5\n",
        )
        .await;

        let (_, table) = read_metric_table(dir.path()).await.unwrap();
        assert!(table.is_distribution());
        let components: Vec<ValueComponent> = table.columns().iter().map(|c| c.component).collect();
        assert_eq!(
            components,
            DistributionComponent::ALL
                .iter()
                .map(|c| ValueComponent::Distribution(*c))
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_wrong_shape_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "kpi_map.jsonl", "{\"index\": 1, \"kpi\": {}}\n").await;
        write(dir.path(), "kpi-1.csv", "timestamp,value,mean\n1609459200,1,2\n").await;
        assert!(matches!(
            read_metric_table(dir.path()).await,
            Err(KpiError::InvalidDataFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_values_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "kpi_map.jsonl", "{\"index\": 1, \"kpi\": {}}\n").await;
        write(dir.path(), "kpi-1.csv", "timestamp,value\n1609459200,abc\n1609459260,garbage\n").await;
        assert!(matches!(
            read_metric_table(dir.path()).await,
            Err(KpiError::InvalidDataFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_data_is_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "kpi_map.jsonl", "{\"index\": 1, \"kpi\": {}}\n").await;
        assert!(matches!(
            read_metric_table(dir.path()).await,
            Err(KpiError::EmptyPayload { .. })
        ));
    }
}
