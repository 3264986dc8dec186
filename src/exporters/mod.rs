use std::path::Path;

use crate::error::{KpiError, Result};

pub mod arrow;
pub mod csv;
pub mod json;

pub use arrow::ArrowConverter;
pub use csv::CsvConverter;
pub use json::JsonConverter;

/// Write `contents` to `path`, creating the parent directories.
pub async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| KpiError::io(parent, err))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|err| KpiError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified").join("kpi-map").join("metric-1-kpi-map.csv");
        write_output(&path, ",ns\n1,a\n").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), ",ns\n1,a\n");
    }
}
