use tracing::{debug, info};

use super::MergeConfig;
use super::outliers::OutlierPolicy;
use crate::datamodel::{AggregatedSeries, JoinKind, WideFrame};
use crate::error::Result;

/// Injection condition of an experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunCondition {
    #[default]
    Normal,
    Fault,
}

impl std::str::FromStr for RunCondition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(RunCondition::Normal),
            "fault" | "faulty" | "injection" => Ok(RunCondition::Fault),
            other => Err(format!("unknown run condition {}", other)),
        }
    }
}

/// Side-by-side frame of one backend's metrics, columns named
/// `{prefix}-{metric index}-{descriptor}`.
pub fn backend_frame(metrics: Vec<(u32, AggregatedSeries)>, prefix: &str) -> Result<WideFrame> {
    let frames = metrics
        .iter()
        .map(|(index, series)| WideFrame::from_series(series, &format!("{}-{}-", prefix, index)))
        .collect::<Result<Vec<_>>>()?;
    WideFrame::hconcat(frames)
}

pub fn merge_backends(cloud: &WideFrame, mesh: &WideFrame) -> Result<WideFrame> {
    cloud.join(mesh, JoinKind::Outer)
}

/// Align the backends with the load summary of the same run.
pub fn merge_experiment(backends: &WideFrame, load: &WideFrame, condition: RunCondition) -> Result<WideFrame> {
    let joined = match condition {
        RunCondition::Normal => load.join(backends, JoinKind::Left)?,
        RunCondition::Fault => backends.join(load, JoinKind::Inner)?,
    };
    if joined.has_duplicate_timestamps() {
        debug!("Collapsing duplicate timestamps");
    }
    joined.collapse_duplicates()
}

/// Many normal days of one experiment design merged into one table.
///
/// `days` pairs each day's backend frame with its load summary.
pub fn merge_baseline(days: Vec<(WideFrame, WideFrame)>, config: &MergeConfig) -> Result<WideFrame> {
    let filter = config.outlier_filter();
    let (frames, loads): (Vec<WideFrame>, Vec<WideFrame>) = days.into_iter().unzip();

    let load = match config.outlier_policy {
        OutlierPolicy::Disabled => WideFrame::vconcat(loads)?,
        OutlierPolicy::PerRun => {
            let mut filtered = Vec::with_capacity(loads.len());
            for mut load in loads {
                filter.apply(&mut load)?;
                filtered.push(load);
            }
            WideFrame::vconcat(filtered)?
        }
        OutlierPolicy::Pooled => {
            let mut pooled = WideFrame::vconcat(loads)?;
            filter.apply(&mut pooled)?;
            pooled
        }
    };

    let backends = WideFrame::vconcat(frames)?;
    info!(
        "Baseline merge of {} load rows and {} backend rows",
        load.num_rows(),
        backends.num_rows()
    );
    load.join(&backends, JoinKind::Left)?.collapse_duplicates()
}
