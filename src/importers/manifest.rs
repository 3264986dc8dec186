use std::path::Path;

use super::read_csv_grid;
use crate::datamodel::datagrid::StringDataGrid;
use crate::datamodel::{TargetMetric, TargetMetrics};
use crate::error::{KpiError, Result};

/// Target-metrics manifest: a `name` (or `metric_type`) column and an
/// optional `index` column. Without `index`, metrics are numbered from 1 in
/// row order.
pub fn parse_target_metrics(grid: &StringDataGrid, context: &str) -> Result<TargetMetrics> {
    let name = grid
        .column_position("name")
        .or_else(|| grid.column_position("metric_type"))
        .ok_or_else(|| KpiError::invalid_data_format("missing name column", context))?;
    let index = grid.column_position("index");

    let mut metrics = Vec::with_capacity(grid.rows.len());
    for (row_number, row) in grid.rows.iter().enumerate() {
        let metric_index = match index {
            Some(position) => row[position].trim().parse::<u32>().map_err(|_| {
                KpiError::invalid_data_format(&format!("invalid index {:?}", row[position]), context)
            })?,
            None => row_number as u32 + 1,
        };
        if metrics.iter().any(|m: &TargetMetric| m.index == metric_index) {
            return Err(KpiError::DuplicateIndex {
                index: metric_index,
                context: context.to_string(),
            });
        }
        metrics.push(TargetMetric::new(metric_index, row[name].trim()));
    }
    Ok(TargetMetrics::new(metrics))
}

pub async fn read_target_metrics(path: &Path) -> Result<TargetMetrics> {
    let grid = read_csv_grid(path)
        .await?
        .ok_or_else(|| KpiError::NotFound(path.display().to_string()))?;
    parse_target_metrics(&grid, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::parse_csv_grid;

    #[tokio::test]
    async fn test_positional_indices() {
        let grid = parse_csv_grid(b"name\nALERTS\ncontainer_cpu_usage_seconds_total\n")
            .await
            .unwrap();
        let metrics = parse_target_metrics(&grid, "test").unwrap();
        let indices: Vec<u32> = metrics.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_explicit_indices() {
        let grid = parse_csv_grid(
            b"index,metric_type\n3,kubernetes.io/container/cpu/core_usage_time\n7,kubernetes.io/node/cpu/core_usage_time\n",
        )
        .await
        .unwrap();
        let metrics = parse_target_metrics(&grid, "test").unwrap();
        assert_eq!(
            metrics.iter().last(),
            Some(&TargetMetric::new(7, "kubernetes.io/node/cpu/core_usage_time"))
        );
    }

    #[tokio::test]
    async fn test_missing_name_column() {
        let grid = parse_csv_grid(b"index\n1\n").await.unwrap();
        assert!(parse_target_metrics(&grid, "test").is_err());
    }
}
