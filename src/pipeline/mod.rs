//! File-system orchestration of aggregation, unification and merges.

use std::path::{Path, PathBuf};

pub mod aggregate;
pub mod merge;
pub mod unify;

pub use aggregate::{AggregationJob, RunPaths, RunReport, aggregate_run, aggregate_runs};
pub use merge::{
    BackendManifests, ExperimentPaths, align_paths, merge_baseline_runs, merge_experiment_run,
    read_load, write_frame,
};
pub use unify::{AggregatedRun, unify_runs};

/// `{dir}/metric-{index}.csv`
pub fn metric_series_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("metric-{}.csv", index))
}

/// `{dir}/metric-{index}-kpi-map.json`
pub fn metric_catalog_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("metric-{}-kpi-map.json", index))
}
