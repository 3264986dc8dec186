#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub mod fixtures;

/// 2021-01-01 00:00:00 UTC
pub const T0: i64 = 1609459200;

pub async fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(path, content).await.unwrap();
}

/// Raw run folder builder: `metric-type-{i}/kpi_map.jsonl` plus one
/// `kpi-{index}.csv` per KPI.
pub struct RawRun {
    pub dir: PathBuf,
}

impl RawRun {
    pub fn new(root: &Path, name: &str) -> Self {
        Self {
            dir: root.join(name),
        }
    }

    pub fn metric_dir(&self, metric_index: u32) -> PathBuf {
        self.dir.join(format!("metric-type-{}", metric_index))
    }

    /// `kpis` holds `(index, labels as a JSON object)`.
    pub async fn catalog(&self, metric_index: u32, kpis: &[(u32, &str)]) {
        let lines: String = kpis
            .iter()
            .map(|(index, labels)| format!("{{\"index\": {}, \"kpi\": {}}}\n", index, labels))
            .collect();
        write(&self.metric_dir(metric_index).join("kpi_map.jsonl"), &lines).await;
    }

    /// Scalar series, `(minute offset, value)`.
    pub async fn scalar(&self, metric_index: u32, kpi: u32, points: &[(i64, f64)]) {
        let mut csv = String::from("timestamp,value\n");
        for (offset, value) in points {
            csv.push_str(&format!("{},{}\n", T0 + offset * 60, value));
        }
        write(&self.metric_dir(metric_index).join(format!("kpi-{}.csv", kpi)), &csv).await;
    }

    /// Distribution series, `(minute offset, count, mean, sum_of_squared_deviation)`.
    pub async fn distribution(&self, metric_index: u32, kpi: u32, points: &[(i64, f64, f64, f64)]) {
        let mut csv = String::from("timestamp,count,mean,sum_of_squared_deviation\n");
        for (offset, count, mean, ssd) in points {
            csv.push_str(&format!("{},{},{},{}\n", T0 + offset * 60, count, mean, ssd));
        }
        write(&self.metric_dir(metric_index).join(format!("kpi-{}.csv", kpi)), &csv).await;
    }
}

pub async fn read_to_string(path: &Path) -> String {
    tokio::fs::read_to_string(path)
        .await
        .unwrap_or_else(|err| panic!("cannot read {}: {}", path.display(), err))
}
