use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::metric_series_path;
use crate::datamodel::{TargetMetrics, WideFrame};
use crate::error::KpiError;
use crate::exporters::{ArrowConverter, CsvConverter, write_output};
use crate::importers::aggregated::parse_wide_frame;
use crate::importers::{read_aggregated_series, read_csv_grid};
use crate::merge::{
    MergeConfig, RunCondition, backend_frame, merge_backends, merge_baseline, merge_experiment,
    summarize_load,
};

/// Target metrics of both backends.
#[derive(Debug, Clone, Default)]
pub struct BackendManifests {
    pub cloud: TargetMetrics,
    pub mesh: TargetMetrics,
}

/// Aggregated (or unified) folders of one run and its load history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPaths {
    pub cloud_dir: PathBuf,
    pub mesh_dir: PathBuf,
    pub load_file: PathBuf,
}

/// Pair the path lists position by position.
///
/// Lists of different lengths are reported and cut to the shortest.
pub fn align_paths(cloud: Vec<PathBuf>, mesh: Vec<PathBuf>, loads: Vec<PathBuf>) -> Vec<ExperimentPaths> {
    if cloud.len() != mesh.len() || cloud.len() != loads.len() {
        warn!(
            "Path lists differ in length (cloud {}, mesh {}, load {}), using the first {}",
            cloud.len(),
            mesh.len(),
            loads.len(),
            cloud.len().min(mesh.len()).min(loads.len())
        );
    }
    cloud
        .into_iter()
        .zip(mesh)
        .zip(loads)
        .map(|((cloud_dir, mesh_dir), load_file)| ExperimentPaths {
            cloud_dir,
            mesh_dir,
            load_file,
        })
        .collect()
}

/// Side-by-side frame of every manifest metric found in `dir`.
pub async fn read_backend(dir: &Path, manifest: &TargetMetrics, prefix: &str) -> Result<WideFrame> {
    let mut metrics = Vec::with_capacity(manifest.len());
    for metric in manifest {
        let path = metric_series_path(dir, metric.index);
        match read_aggregated_series(&path).await {
            Ok(Some(series)) => metrics.push((metric.index, series)),
            Ok(None) => warn!("Missing aggregated metric {} in {}", metric.name, dir.display()),
            Err(err) => warn!("Skipping aggregated metric {} in {}: {}", metric.name, dir.display(), err),
        }
    }
    backend_frame(metrics, prefix)
        .with_context(|| format!("Failed to combine the metrics of {}", dir.display()))
}

/// Load series of a run, from either the raw statistics history or an
/// already summarized `timestamp,lm-...` table.
pub async fn read_load(path: &Path, config: &MergeConfig) -> Result<WideFrame> {
    let grid = read_csv_grid(path)
        .await?
        .ok_or_else(|| KpiError::NotFound(path.display().to_string()))?;
    let frame = if grid.column_position("Name").is_some() {
        summarize_load(&grid, &config.load_prefix)?
    } else {
        parse_wide_frame(&grid, &path.display().to_string())?
    };
    Ok(frame)
}

async fn read_backends(paths: &ExperimentPaths, manifests: &BackendManifests, config: &MergeConfig) -> Result<WideFrame> {
    let cloud = read_backend(&paths.cloud_dir, &manifests.cloud, &config.cloud_prefix).await?;
    let mesh = read_backend(&paths.mesh_dir, &manifests.mesh, &config.mesh_prefix).await?;
    merge_backends(&cloud, &mesh).context("Failed to join the backends")
}

pub async fn merge_experiment_run(
    paths: &ExperimentPaths,
    manifests: &BackendManifests,
    condition: RunCondition,
    config: &MergeConfig,
) -> Result<WideFrame> {
    let backends = read_backends(paths, manifests, config).await?;
    let load = read_load(&paths.load_file, config)
        .await
        .with_context(|| format!("Failed to read load history {}", paths.load_file.display()))?;
    let merged = merge_experiment(&backends, &load, condition)
        .with_context(|| format!("Failed to merge {}", paths.load_file.display()))?;
    info!(
        "Merged {} rows and {} columns for {}",
        merged.num_rows(),
        merged.num_columns(),
        paths.load_file.display()
    );
    Ok(merged)
}

pub async fn merge_baseline_runs(
    days: &[ExperimentPaths],
    manifests: &BackendManifests,
    config: &MergeConfig,
) -> Result<WideFrame> {
    let mut frames = Vec::with_capacity(days.len());
    for day in days {
        let backends = read_backends(day, manifests, config).await?;
        let load = read_load(&day.load_file, config)
            .await
            .with_context(|| format!("Failed to read load history {}", day.load_file.display()))?;
        frames.push((backends, load));
    }
    merge_baseline(frames, config).context("Failed to merge the baseline days")
}

/// Write `frame` as CSV, and as an Arrow IPC file when `arrow_path` is set.
pub async fn write_frame(frame: &WideFrame, csv_path: &Path, arrow_path: Option<&Path>) -> Result<()> {
    write_output(csv_path, CsvConverter::frame_to_csv(frame))
        .await
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    if let Some(arrow_path) = arrow_path {
        write_output(arrow_path, ArrowConverter::to_arrow_file(frame)?)
            .await
            .with_context(|| format!("Failed to write {}", arrow_path.display()))?;
    }
    Ok(())
}
