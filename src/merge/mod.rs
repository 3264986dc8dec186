//! Cross-source merge of aggregated backends and load summaries.

pub mod experiment;
pub mod load_summary;
pub mod outliers;

pub use experiment::{RunCondition, backend_frame, merge_backends, merge_baseline, merge_experiment};
pub use load_summary::summarize_load;
pub use outliers::{OutlierFilter, OutlierPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub cloud_prefix: String,
    pub mesh_prefix: String,
    pub load_prefix: String,
    pub outlier_policy: OutlierPolicy,
    pub outlier_threshold: f64,
    pub outlier_columns: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        let filter = OutlierFilter::default();
        Self {
            cloud_prefix: "gm".to_string(),
            mesh_prefix: "pm".to_string(),
            load_prefix: "lm-".to_string(),
            outlier_policy: OutlierPolicy::default(),
            outlier_threshold: filter.threshold,
            outlier_columns: filter.columns,
        }
    }
}

impl MergeConfig {
    pub fn outlier_filter(&self) -> OutlierFilter {
        OutlierFilter {
            columns: self.outlier_columns.clone(),
            threshold: self.outlier_threshold,
        }
    }
}
