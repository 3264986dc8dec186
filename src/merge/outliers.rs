use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::aggregation::statistics::population_mean_std;
use crate::datamodel::WideFrame;
use crate::error::Result;

/// Which load rows the z-scores are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlierPolicy {
    /// Keep every row.
    Disabled,
    /// Each run's load series on its own.
    PerRun,
    /// All runs' load series concatenated.
    #[default]
    Pooled,
}

impl fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierPolicy::Disabled => write!(f, "disabled"),
            OutlierPolicy::PerRun => write!(f, "per_run"),
            OutlierPolicy::Pooled => write!(f, "pooled"),
        }
    }
}

impl FromStr for OutlierPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "disabled" | "none" => Ok(OutlierPolicy::Disabled),
            "per_run" => Ok(OutlierPolicy::PerRun),
            "pooled" => Ok(OutlierPolicy::Pooled),
            other => Err(format!("unknown outlier policy {}", other)),
        }
    }
}

/// Z-score filter on designated indicator columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierFilter {
    pub columns: Vec<String>,
    pub threshold: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            columns: vec!["lm-Failures/s".to_string(), "lm-95%".to_string()],
            threshold: 3.0,
        }
    }
}

impl OutlierFilter {
    /// Rows whose |z| on any indicator is above the threshold.
    ///
    /// Missing values and zero-variance indicators never flag a row.
    pub fn outliers(&self, frame: &WideFrame) -> Vec<bool> {
        let mut flagged = vec![false; frame.num_rows()];
        for name in &self.columns {
            let Some(position) = frame.position(name) else {
                warn!("Outlier indicator {} is not a column", name);
                continue;
            };
            let values = frame.column_values(position);
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let Some((mean, std)) = population_mean_std(&present) else {
                continue;
            };
            if std == 0.0 {
                debug!("Indicator {} has no variance", name);
                continue;
            }
            for (row, value) in values.into_iter().enumerate() {
                if let Some(value) = value {
                    if ((value - mean) / std).abs() > self.threshold {
                        flagged[row] = true;
                    }
                }
            }
        }
        flagged
    }

    /// Remove the outlier rows, returning how many were removed.
    pub fn apply(&self, frame: &mut WideFrame) -> Result<usize> {
        let flagged = self.outliers(frame);
        let removed = flagged.iter().filter(|flag| **flag).count();
        if removed > 0 {
            info!("Removing {} outlier rows of {}", removed, frame.num_rows());
            let keep: Vec<bool> = flagged.iter().map(|flag| !flag).collect();
            frame.retain_rows(&keep)?;
        }
        Ok(removed)
    }
}
