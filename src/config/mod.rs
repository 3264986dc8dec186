use anyhow::{Context, Error};
use confique::Config;

use crate::aggregation::AggregationConfig;
use crate::merge::{MergeConfig, OutlierPolicy};

#[derive(Debug, Config)]
pub struct KpiAggConfig {
    /// Tracing filter used when `RUST_LOG` is not set.
    #[config(env = "KPIAGG_LOG_FILTER", default = "info")]
    pub log_filter: String,

    #[config(env = "KPIAGG_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    /// Runs aggregated at the same time.
    #[config(env = "KPIAGG_CONCURRENCY", default = 4)]
    pub concurrency: usize,

    #[config(env = "KPIAGG_NAMESPACE_LABEL", default = "namespace")]
    pub namespace_label: String,
    #[config(env = "KPIAGG_NAMESPACE", default = "alms")]
    pub namespace: String,
    #[config(env = "KPIAGG_SERVICE_PATTERN", default = "(alms[-a-z]+)-")]
    pub service_pattern: String,
    #[config(env = "KPIAGG_FILL_PLACEHOLDER", default = "undefined")]
    pub fill_placeholder: String,

    #[config(env = "KPIAGG_CLOUD_PREFIX", default = "gm")]
    pub cloud_prefix: String,
    #[config(env = "KPIAGG_MESH_PREFIX", default = "pm")]
    pub mesh_prefix: String,
    #[config(env = "KPIAGG_LOAD_PREFIX", default = "lm-")]
    pub load_prefix: String,

    /// `disabled`, `per_run` or `pooled`.
    #[config(env = "KPIAGG_OUTLIER_POLICY", default = "pooled")]
    pub outlier_policy: String,
    #[config(env = "KPIAGG_OUTLIER_THRESHOLD", default = 3.0)]
    pub outlier_threshold: f64,
    #[config(
        env = "KPIAGG_OUTLIER_COLUMNS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["lm-Failures/s", "lm-95%"]
    )]
    pub outlier_columns: Vec<String>,
}

impl KpiAggConfig {
    pub fn load() -> Result<KpiAggConfig, Error> {
        let c = KpiAggConfig::builder()
            .env()
            .file("settings.toml")
            .load()?;

        Ok(c)
    }

    pub fn aggregation_config(&self) -> AggregationConfig {
        AggregationConfig {
            namespace_label: self.namespace_label.clone(),
            namespace: self.namespace.clone(),
            service_pattern: self.service_pattern.clone(),
            fill_placeholder: self.fill_placeholder.clone(),
        }
    }

    pub fn merge_config(&self) -> Result<MergeConfig, Error> {
        let outlier_policy = self
            .outlier_policy
            .parse::<OutlierPolicy>()
            .map_err(Error::msg)
            .context("Invalid KPIAGG_OUTLIER_POLICY")?;
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            anyhow::bail!("Outlier threshold must be positive: {}", self.outlier_threshold);
        }
        Ok(MergeConfig {
            cloud_prefix: self.cloud_prefix.clone(),
            mesh_prefix: self.mesh_prefix.clone(),
            load_prefix: self.load_prefix.clone(),
            outlier_policy,
            outlier_threshold: self.outlier_threshold,
            outlier_columns: self.outlier_columns.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_config() {
        let config = KpiAggConfig::load().unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.aggregation_config(), AggregationConfig::default());
        assert_eq!(config.merge_config().unwrap(), MergeConfig::default());

        temp_env::with_var("KPIAGG_CONCURRENCY", Some("16"), || {
            let config = KpiAggConfig::load().unwrap();
            assert_eq!(config.concurrency, 16);
        });
    }

    #[test]
    #[serial]
    fn test_merge_config_from_env() {
        temp_env::with_vars(
            [
                ("KPIAGG_OUTLIER_POLICY", Some("per_run")),
                ("KPIAGG_OUTLIER_COLUMNS", Some("lm-95%,lm-99%")),
            ],
            || {
                let merge = KpiAggConfig::load().unwrap().merge_config().unwrap();
                assert_eq!(merge.outlier_policy, OutlierPolicy::PerRun);
                assert_eq!(merge.outlier_columns, vec!["lm-95%", "lm-99%"]);
            },
        );

        temp_env::with_var("KPIAGG_OUTLIER_POLICY", Some("often"), || {
            assert!(KpiAggConfig::load().unwrap().merge_config().is_err());
        });

        temp_env::with_var("KPIAGG_OUTLIER_THRESHOLD", Some("-1"), || {
            assert!(KpiAggConfig::load().unwrap().merge_config().is_err());
        });
    }
}
