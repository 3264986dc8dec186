use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Level, debug, event, info, warn};

use super::{metric_catalog_path, metric_series_path};
use crate::aggregation::{AggregatedMetric, IndexAssignment, PolicyRules, aggregate, group_kpis};
use crate::datamodel::{TargetMetric, TargetMetrics};
use crate::error::KpiError;
use crate::exporters::{CsvConverter, JsonConverter, write_output};
use crate::importers::{read_catalog, read_metric_table};

/// Where one run is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub name: String,
    /// Holds `metric-type-{i}/` folders.
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RunPaths {
    /// The run is named after the last component of its raw folder.
    pub fn new(raw_dir: PathBuf, output_dir: PathBuf) -> Self {
        let name = raw_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw_dir.display().to_string());
        Self {
            name,
            raw_dir,
            output_dir,
        }
    }
}

/// What every run of one backend shares.
#[derive(Debug)]
pub struct AggregationJob {
    pub rules: PolicyRules,
    pub manifest: TargetMetrics,
    /// Folder of reference catalogs; indices are reused from them when set.
    pub reference_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub run: String,
    pub written: Vec<u32>,
    /// Metric indices without output, with the reason.
    pub skipped: Vec<(u32, String)>,
}

async fn aggregate_metric(
    metric: &TargetMetric,
    run: &RunPaths,
    job: &AggregationJob,
) -> std::result::Result<Option<AggregatedMetric>, KpiError> {
    let policy = job.rules.select(&metric.name)?;
    let metric_dir = run.raw_dir.join(format!("metric-type-{}", metric.index));
    let (catalog, table) = read_metric_table(&metric_dir).await?;
    let groups = group_kpis(&metric.name, &catalog, policy)?;

    let reference = match &job.reference_dir {
        Some(dir) => Some(read_catalog(dir, metric.index).await?),
        None => None,
    };
    let assignment = match &reference {
        Some(reference) => IndexAssignment::Referred(reference),
        None => IndexAssignment::Sequential,
    };

    let aggregated = aggregate(&metric.name, &groups, &table, policy, assignment)?;
    if aggregated.is_empty() {
        return Ok(None);
    }
    Ok(Some(aggregated))
}

async fn write_metric(output_dir: &Path, index: u32, aggregated: &AggregatedMetric) -> std::result::Result<(), KpiError> {
    write_output(
        &metric_series_path(output_dir, index),
        CsvConverter::series_to_csv(&aggregated.series),
    )
    .await?;
    write_output(
        &metric_catalog_path(output_dir, index),
        JsonConverter::catalog_to_json(&aggregated.catalog)?,
    )
    .await
}

/// Aggregate every manifest metric of one run.
///
/// Metric types are processed in manifest order. A failing metric is logged
/// and skipped; the run carries on.
pub async fn aggregate_run(run: &RunPaths, job: &AggregationJob) -> Result<RunReport> {
    tokio::fs::create_dir_all(&run.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", run.output_dir.display()))?;

    let mut report = RunReport {
        run: run.name.clone(),
        ..RunReport::default()
    };
    for metric in &job.manifest {
        match aggregate_metric(metric, run, job).await {
            Ok(Some(aggregated)) => {
                write_metric(&run.output_dir, metric.index, &aggregated)
                    .await
                    .with_context(|| format!("Failed to write metric {} of {}", metric.index, run.name))?;
                debug!(
                    "{}: metric {} aggregated into {} KPIs",
                    run.name,
                    metric.name,
                    aggregated.catalog.len()
                );
                report.written.push(metric.index);
            }
            Ok(None) => {
                debug!("{}: metric {} has no aggregated data", run.name, metric.name);
                report.skipped.push((metric.index, "no aggregated data".to_string()));
            }
            Err(err) => {
                warn!("{}: skipping metric {}: {}", run.name, metric.name, err);
                report.skipped.push((metric.index, err.to_string()));
            }
        }
    }
    info!(
        "{}: {} metrics written, {} skipped",
        run.name,
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Aggregate many runs in parallel, at most `concurrency` at a time.
///
/// A failed or panicked run is logged and missing from the returned
/// reports, which are sorted by run name.
pub async fn aggregate_runs(runs: Vec<RunPaths>, job: Arc<AggregationJob>, concurrency: usize) -> Vec<RunReport> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for run in runs {
        let semaphore = semaphore.clone();
        let job = job.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => return (run.name, Err(anyhow::Error::from(err))),
            };
            let report = aggregate_run(&run, &job).await;
            (run.name, report)
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(report))) => reports.push(report),
            Ok((run, Err(err))) => event!(Level::ERROR, "Run {} failed: {:?}", run, err),
            Err(err) => event!(Level::ERROR, "Aggregation task panicked: {}", err),
        }
    }
    reports.sort_by(|a, b| a.run.cmp(&b.run));
    reports
}
