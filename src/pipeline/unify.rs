use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{metric_catalog_path, metric_series_path};
use crate::datamodel::{KpiCatalog, TargetMetrics};
use crate::error::KpiError;
use crate::exporters::{CsvConverter, JsonConverter, write_output};
use crate::importers::{read_aggregated_series, read_catalog};
use crate::unify::{CanonicalCatalog, RunAggregate, Unifier, UnifyMode};

/// An aggregated run: its name and the folder holding `metric-{i}.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRun {
    pub name: String,
    pub dir: PathBuf,
}

impl AggregatedRun {
    pub fn new(dir: PathBuf) -> Self {
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self { name, dir }
    }
}

pub fn canonical_catalog_dir(unified_dir: &Path) -> PathBuf {
    unified_dir.join("kpi-map")
}

async fn read_run_aggregate(run: &AggregatedRun, index: u32) -> Option<RunAggregate> {
    let catalog = match read_catalog(&run.dir, index).await {
        Ok(catalog) => catalog,
        Err(KpiError::NotFound(_)) => {
            debug!("{}: no catalog for metric {}", run.name, index);
            return None;
        }
        Err(err) => {
            warn!("{}: unreadable catalog for metric {}: {}", run.name, index, err);
            return None;
        }
    };
    match read_aggregated_series(&metric_series_path(&run.dir, index)).await {
        Ok(Some(series)) => Some(RunAggregate {
            name: run.name.clone(),
            catalog,
            series,
        }),
        Ok(None) => {
            warn!("{}: catalog without series for metric {}", run.name, index);
            None
        }
        Err(err) => {
            warn!("{}: unreadable series for metric {}: {}", run.name, index, err);
            None
        }
    }
}

async fn existing_canonical(unified_dir: &Path, index: u32) -> Result<CanonicalCatalog> {
    match read_catalog(&canonical_catalog_dir(unified_dir), index).await {
        Ok(catalog) => Ok(CanonicalCatalog::from_catalog(catalog)),
        Err(KpiError::NotFound(_)) => Ok(CanonicalCatalog::from_catalog(KpiCatalog::default())),
        Err(err) => Err(err).with_context(|| format!("Failed to read canonical catalog of metric {}", index)),
    }
}

/// Unify every manifest metric over `runs`, in the given order.
///
/// Writes `{unified}/kpi-map/metric-{i}-kpi-map.csv` and
/// `{unified}/{run}/metric-{i}.csv`, and returns the unified metric indices.
/// The canonical catalog is also written as JSON records next to the CSV;
/// later reads prefer them so label types survive the reload.
pub async fn unify_runs(
    manifest: &TargetMetrics,
    runs: &[AggregatedRun],
    unified_dir: &Path,
    incremental: bool,
) -> Result<Vec<u32>> {
    let mut unified_metrics = Vec::new();
    for metric in manifest {
        let mut aggregates = Vec::with_capacity(runs.len());
        for run in runs {
            if let Some(aggregate) = read_run_aggregate(run, metric.index).await {
                aggregates.push(aggregate);
            }
        }
        if aggregates.is_empty() {
            debug!("No run has metric {}", metric.name);
            continue;
        }

        let mode = if incremental {
            UnifyMode::Incremental(existing_canonical(unified_dir, metric.index).await?)
        } else {
            UnifyMode::Rebuild
        };
        let unified = Unifier::new(mode)
            .unify(&aggregates)
            .with_context(|| format!("Failed to unify metric {}", metric.name))?;

        let catalog_dir = canonical_catalog_dir(unified_dir);
        write_output(
            &catalog_dir.join(format!("metric-{}-kpi-map.csv", metric.index)),
            CsvConverter::catalog_to_csv(unified.canonical.catalog()),
        )
        .await?;
        write_output(
            &metric_catalog_path(&catalog_dir, metric.index),
            JsonConverter::catalog_to_json(unified.canonical.catalog())?,
        )
        .await?;
        for (run, series) in &unified.runs {
            write_output(
                &metric_series_path(&unified_dir.join(run), metric.index),
                CsvConverter::series_to_csv(series),
            )
            .await?;
        }
        info!(
            "Metric {}: {} canonical KPIs over {} runs",
            metric.name,
            unified.canonical.len(),
            unified.runs.len()
        );
        unified_metrics.push(metric.index);
    }
    Ok(unified_metrics)
}
