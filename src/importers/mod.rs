use std::path::Path;

use futures::StreamExt;

use crate::datamodel::StringDataGrid;
use crate::error::{KpiError, Result};

pub mod aggregated;
pub mod catalog;
pub mod manifest;
pub mod raw_series;

pub use aggregated::read_aggregated_series;
pub use catalog::{read_catalog, read_raw_catalog};
pub use manifest::read_target_metrics;
pub use raw_series::read_metric_table;

/// Read a whole file, `None` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(KpiError::io(path, err)),
    }
}

/// Parse CSV bytes with a header row into a [`StringDataGrid`].
pub async fn parse_csv_grid(bytes: &[u8]) -> Result<StringDataGrid> {
    let mut csv_reader = csv_async::AsyncReaderBuilder::new()
        .has_headers(true)
        .create_reader(bytes);

    let headers = csv_reader.headers().await?.clone();
    let column_names = headers.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut records = csv_reader.records();
    while let Some(record) = records.next().await {
        let record = record?;
        rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    StringDataGrid::new(column_names, rows)
}

/// Read a CSV file into a grid, `None` when the file does not exist.
pub async fn read_csv_grid(path: &Path) -> Result<Option<StringDataGrid>> {
    match read_optional(path).await? {
        Some(bytes) => Ok(Some(parse_csv_grid(&bytes).await?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_csv_grid() {
        let grid = parse_csv_grid(b",container\n1,api\n2,\n").await.unwrap();
        assert_eq!(grid.column_names, vec!["", "container"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1][1], "");
    }

    #[tokio::test]
    async fn test_ragged_csv_is_an_error() {
        assert!(parse_csv_grid(b"a,b\n1,2,3\n").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_csv_grid(&dir.path().join("absent.csv")).await.unwrap();
        assert!(result.is_none());
    }
}
