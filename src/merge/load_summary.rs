//! Per-minute summary of a load-generator statistics history.

use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregation::statistics;
use crate::datamodel::datagrid::{StringDataGrid, parse_cell};
use crate::datamodel::{Minute, WideFrame};
use crate::error::{KpiError, Result};

/// Row name of the all-endpoints line of the history.
pub const AGGREGATED_ROW: &str = "Aggregated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Max,
    Mean,
    Median,
}

impl Reduction {
    fn reduce(self, values: &[f64]) -> Option<f64> {
        match self {
            Reduction::Max => values.iter().copied().max_by(|a, b| a.total_cmp(b)),
            Reduction::Mean => statistics::mean(values),
            Reduction::Median => statistics::median(values),
        }
    }
}

/// Summarized columns and how each minute is reduced.
pub const LOAD_COLUMNS: [(&str, Reduction); 17] = [
    ("User Count", Reduction::Max),
    ("Requests/s", Reduction::Mean),
    ("Failures/s", Reduction::Mean),
    ("50%", Reduction::Max),
    ("66%", Reduction::Max),
    ("75%", Reduction::Max),
    ("80%", Reduction::Max),
    ("90%", Reduction::Max),
    ("95%", Reduction::Max),
    ("98%", Reduction::Max),
    ("99%", Reduction::Max),
    ("99.9%", Reduction::Max),
    ("99.99%", Reduction::Max),
    ("100%", Reduction::Max),
    ("Total Median Response Time", Reduction::Median),
    ("Total Average Response Time", Reduction::Mean),
    ("Total Average Content Size", Reduction::Mean),
];

/// One row per minute of the `Aggregated` lines, columns named
/// `{prefix}{column}`.
pub fn summarize_load(grid: &StringDataGrid, prefix: &str) -> Result<WideFrame> {
    let required = |name: &str| {
        grid.column_position(name)
            .ok_or_else(|| KpiError::invalid_data_format(&format!("missing {} column", name), "load history"))
    };
    let name_position = required("Name")?;
    let timestamp_position = required("Timestamp")?;

    let columns: Vec<(usize, &str, Reduction)> = LOAD_COLUMNS
        .iter()
        .filter_map(|(name, reduction)| match grid.column_position(name) {
            Some(position) => Some((position, *name, *reduction)),
            None => {
                debug!("Load history has no {:?} column", name);
                None
            }
        })
        .collect();

    let mut minutes: BTreeMap<Minute, Vec<Vec<f64>>> = BTreeMap::new();
    for row in grid.rows.iter().filter(|row| row[name_position] == AGGREGATED_ROW) {
        let minute = Minute::parse(&row[timestamp_position])?;
        let values = minutes
            .entry(minute)
            .or_insert_with(|| vec![Vec::new(); columns.len()]);
        for (slot, (position, _, _)) in values.iter_mut().zip(&columns) {
            if let Some(value) = parse_cell(&row[*position]) {
                slot.push(value);
            }
        }
    }

    let rows = minutes
        .into_iter()
        .map(|(minute, values)| {
            let row = values
                .iter()
                .zip(&columns)
                .map(|(values, (_, _, reduction))| reduction.reduce(values))
                .collect();
            (minute, row)
        })
        .collect();
    WideFrame::from_rows(
        columns
            .iter()
            .map(|(_, name, _)| format!("{}{}", prefix, name))
            .collect(),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::parse_csv_grid;

    #[tokio::test]
    async fn test_summarize_load() {
        let csv = "Timestamp,User Count,Type,Name,Requests/s,Failures/s,95%,Total Median Response Time\n\
                   1609459200,10,,Aggregated,2.0,0.0,100,40\n\
                   1609459210,12,,Aggregated,4.0,1.0,N/A,60\n\
                   1609459210,12,GET,/login,9.0,9.0,900,900\n\
                   1609459260,12,,Aggregated,6.0,0.0,120,50\n";
        let grid = parse_csv_grid(csv.as_bytes()).await.unwrap();
        let frame = summarize_load(&grid, "lm-").unwrap();

        assert_eq!(
            frame.columns(),
            ["lm-User Count", "lm-Requests/s", "lm-Failures/s", "lm-95%", "lm-Total Median Response Time"]
                .map(String::from)
        );
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.get(0, 0), Some(12.0));
        assert_eq!(frame.get(0, 1), Some(3.0));
        assert_eq!(frame.get(0, 2), Some(0.5));
        assert_eq!(frame.get(0, 3), Some(100.0));
        assert_eq!(frame.get(0, 4), Some(50.0));
        assert_eq!(frame.get(1, 1), Some(6.0));
    }

    #[tokio::test]
    async fn test_missing_name_column() {
        let grid = parse_csv_grid(b"Timestamp,Requests/s\n1609459200,1\n").await.unwrap();
        assert!(summarize_load(&grid, "lm-").is_err());
    }
}
