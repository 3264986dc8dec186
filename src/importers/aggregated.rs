use std::path::Path;

use super::read_csv_grid;
use crate::datamodel::datagrid::{StringDataGrid, parse_cell};
use crate::datamodel::{AggColumn, AggregatedSeries, Minute, WideFrame};
use crate::error::{KpiError, Result};

fn timestamp_position(grid: &StringDataGrid, context: &str) -> Result<usize> {
    match grid.column_names.first() {
        Some(name) if name == "timestamp" || name.is_empty() => Ok(0),
        _ => Err(KpiError::invalid_data_format(
            "first column must be the timestamp",
            context,
        )),
    }
}

pub fn parse_aggregated_series(grid: &StringDataGrid, context: &str) -> Result<AggregatedSeries> {
    let timestamp = timestamp_position(grid, context)?;
    let timestamps = grid
        .column(timestamp)
        .map(Minute::parse)
        .collect::<Result<Vec<_>>>()?;

    let mut series = AggregatedSeries::new();
    for timestamp in &timestamps {
        series.ensure_row(*timestamp);
    }
    for (position, name) in grid.column_names.iter().enumerate().skip(1) {
        let column = AggColumn::parse(name)?;
        if series.position(&column).is_some() {
            return Err(KpiError::invalid_data_format(
                &format!("duplicate column {}", name),
                context,
            ));
        }
        let values = timestamps
            .iter()
            .copied()
            .zip(grid.column(position).map(parse_cell))
            .collect::<Vec<_>>();
        series.push_column(column, values);
    }
    Ok(series)
}

/// Aggregated series `timestamp,agg-kpi-...`, `None` when the file is absent.
pub async fn read_aggregated_series(path: &Path) -> Result<Option<AggregatedSeries>> {
    match read_csv_grid(path).await? {
        Some(grid) => Ok(Some(parse_aggregated_series(
            &grid,
            &path.display().to_string(),
        )?)),
        None => Ok(None),
    }
}

pub fn parse_wide_frame(grid: &StringDataGrid, context: &str) -> Result<WideFrame> {
    let timestamp = timestamp_position(grid, context)?;
    let columns = grid
        .column_names
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != timestamp)
        .map(|(_, name)| name.clone())
        .collect();
    let mut rows = Vec::with_capacity(grid.rows.len());
    for row in &grid.rows {
        let values = row
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != timestamp)
            .map(|(_, cell)| parse_cell(cell))
            .collect();
        rows.push((Minute::parse(&row[timestamp])?, values));
    }
    WideFrame::from_rows(columns, rows)
}
