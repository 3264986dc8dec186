//! KPI catalog readers.
//!
//! A catalog comes in one of three shapes:
//! - a JSON record list `[{"index": 1, "kpi": {"container": "api"}}]`,
//! - the same records as JSON lines,
//! - a table whose first column is the index and the other columns labels.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{parse_csv_grid, read_optional};
use crate::datamodel::datagrid::StringDataGrid;
use crate::datamodel::{KpiCatalog, KpiEntry, KpiLabels, KpiLabelsExt, LabelValue};
use crate::datamodel::catalog::KpiRecord;
use crate::error::{KpiError, Result};

static BARE_NAN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:\[,]\s*)NaN\b").expect("NaN regex must compile"));

/// Older record files carry bare `NaN` tokens, which are not JSON.
fn replace_bare_nan(text: &str) -> std::borrow::Cow<'_, str> {
    BARE_NAN_REGEX.replace_all(text, "${1}null")
}

fn catalog_from_records(records: Vec<KpiRecord>) -> Result<KpiCatalog> {
    let entries = records
        .iter()
        .map(KpiEntry::from_record)
        .collect::<Result<Vec<_>>>()?;
    KpiCatalog::new(entries)
}

pub fn parse_catalog_records(text: &str) -> Result<KpiCatalog> {
    let records: Vec<KpiRecord> = serde_json::from_str(&replace_bare_nan(text))?;
    catalog_from_records(records)
}

pub fn parse_catalog_json_lines(text: &str) -> Result<KpiCatalog> {
    let cleaned = replace_bare_nan(text);
    let records = cleaned
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<KpiRecord>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    catalog_from_records(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

fn is_missing_cell(cell: &str) -> bool {
    cell.is_empty() || cell == "NaN" || cell == "nan"
}

fn infer_column_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells.filter(|cell| !is_missing_cell(cell)) {
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_ok() {
            continue;
        }
        if cell.parse::<f64>().is_ok() {
            kind = ColumnKind::Float;
        } else {
            return ColumnKind::Text;
        }
    }
    kind
}

fn parse_label_cell(cell: &str, kind: ColumnKind) -> Option<LabelValue> {
    if is_missing_cell(cell) {
        return None;
    }
    match kind {
        ColumnKind::Integer => cell.parse().ok().map(LabelValue::Integer),
        ColumnKind::Float => cell.parse().ok().map(LabelValue::Float),
        ColumnKind::Text => Some(LabelValue::String(cell.to_string())),
    }
}

fn parse_index_cell(cell: &str) -> Result<u32> {
    let cell = cell.trim();
    if let Ok(index) = cell.parse::<u32>() {
        return Ok(index);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 => {
            Ok(value as u32)
        }
        _ => Err(KpiError::invalid_data_format("invalid KPI index", cell)),
    }
}

/// Tabular catalog: first column is the index whatever its header.
pub fn parse_catalog_table(grid: &StringDataGrid) -> Result<KpiCatalog> {
    if grid.column_names.is_empty() {
        return Ok(KpiCatalog::default());
    }
    let kinds: Vec<ColumnKind> = (1..grid.column_names.len())
        .map(|position| infer_column_kind(grid.column(position)))
        .collect();

    let mut catalog = KpiCatalog::default();
    for row in &grid.rows {
        let index = parse_index_cell(&row[0])?;
        let labels = KpiLabels::from_pairs(
            grid.column_names[1..]
                .iter()
                .zip(&row[1..])
                .zip(&kinds)
                .map(|((name, cell), kind)| (name.clone(), parse_label_cell(cell, *kind))),
        );
        catalog.push(KpiEntry::new(index, labels))?;
    }
    Ok(catalog)
}

fn decode_text(bytes: Vec<u8>, path: &Path) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| {
        KpiError::invalid_data_format("catalog is not valid UTF-8", &path.display().to_string())
    })
}

/// Catalog of an aggregated or unified metric:
/// `metric-{i}-kpi-map.json`, else `metric-{i}-kpi-map.csv`.
pub async fn read_catalog(dir: &Path, metric_index: u32) -> Result<KpiCatalog> {
    let json_path = dir.join(format!("metric-{}-kpi-map.json", metric_index));
    if let Some(bytes) = read_optional(&json_path).await? {
        debug!("Reading catalog {}", json_path.display());
        return parse_catalog_records(&decode_text(bytes, &json_path)?);
    }
    let csv_path = dir.join(format!("metric-{}-kpi-map.csv", metric_index));
    if let Some(bytes) = read_optional(&csv_path).await? {
        debug!("Reading catalog {}", csv_path.display());
        return parse_catalog_table(&parse_csv_grid(&bytes).await?);
    }
    Err(KpiError::NotFound(format!(
        "catalog of metric {} in {}",
        metric_index,
        dir.display()
    )))
}

/// Catalog of a raw metric-type folder: `kpi_map.jsonl`, `kpi_map.json` or
/// `kpi_map.csv`.
pub async fn read_raw_catalog(metric_dir: &Path) -> Result<KpiCatalog> {
    let jsonl_path = metric_dir.join("kpi_map.jsonl");
    if let Some(bytes) = read_optional(&jsonl_path).await? {
        return parse_catalog_json_lines(&decode_text(bytes, &jsonl_path)?);
    }
    let json_path = metric_dir.join("kpi_map.json");
    if let Some(bytes) = read_optional(&json_path).await? {
        return parse_catalog_records(&decode_text(bytes, &json_path)?);
    }
    let csv_path = metric_dir.join("kpi_map.csv");
    if let Some(bytes) = read_optional(&csv_path).await? {
        return parse_catalog_table(&parse_csv_grid(&bytes).await?);
    }
    Err(KpiError::NotFound(format!(
        "KPI catalog in {}",
        metric_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_with_bare_nan() {
        let text = r#"[{"index": 1, "kpi": {"container": "api", "pod": NaN}},
                       {"index": 3, "kpi": {"container": NaN, "pod": "p-1"}}]"#;
        let catalog = parse_catalog_records(text).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().labels.label("pod"), None);
        assert_eq!(
            catalog.get(3).unwrap().labels.label("pod"),
            Some(&LabelValue::from("p-1"))
        );
    }

    #[test]
    fn test_nan_inside_strings_is_kept() {
        let text = r#"[{"index": 1, "kpi": {"name": "NaN-service"}}]"#;
        let catalog = parse_catalog_records(text).unwrap();
        assert_eq!(
            catalog.get(1).unwrap().labels.label("name"),
            Some(&LabelValue::from("NaN-service"))
        );
    }

    #[test]
    fn test_json_lines() {
        let text = "{\"index\": 2, \"kpi\": {\"a\": 1}}\n\n{\"index\": 5, \"kpi\": {\"a\": 2}}\n";
        let catalog = parse_catalog_json_lines(text).unwrap();
        let indices: Vec<u32> = catalog.entries().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![2, 5]);
    }

    #[test]
    fn test_duplicate_indices_are_rejected() {
        let text = r#"[{"index": 1, "kpi": {}}, {"index": 1, "kpi": {}}]"#;
        assert!(matches!(
            parse_catalog_records(text),
            Err(KpiError::DuplicateIndex { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_table_infers_column_types() {
        let grid = parse_csv_grid(
            b"Unnamed: 0,code,ratio,service\n1,200,0.5,api\n2,404,,\n3,,1,7\n",
        )
        .await
        .unwrap();
        let catalog = parse_catalog_table(&grid).unwrap();
        let second = &catalog.get(2).unwrap().labels;
        assert!(matches!(second.label("code"), Some(LabelValue::Integer(404))));
        assert_eq!(second.label("ratio"), None);
        assert_eq!(second.label("service"), None);

        let third = &catalog.get(3).unwrap().labels;
        assert_eq!(third.label("code"), None);
        assert!(matches!(third.label("ratio"), Some(LabelValue::Float(_))));
        // mixed with text elsewhere in the column
        assert_eq!(third.label("service"), Some(&LabelValue::from("7")));
    }

    #[tokio::test]
    async fn test_read_catalog_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("metric-4-kpi-map.json"),
            r#"[{"index": 1, "kpi": {"source": "json"}}]"#,
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("metric-4-kpi-map.csv"), ",source\n1,csv\n")
            .await
            .unwrap();
        let catalog = read_catalog(dir.path(), 4).await.unwrap();
        assert_eq!(
            catalog.get(1).unwrap().labels.label("source"),
            Some(&LabelValue::from("json"))
        );

        assert!(matches!(
            read_catalog(dir.path(), 5).await,
            Err(KpiError::NotFound(_))
        ));
    }
}
