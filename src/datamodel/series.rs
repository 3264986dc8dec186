use std::collections::{BTreeMap, BTreeSet};

use super::column::{AggColumn, RawColumn, ValueComponent};
use super::kpi_datetime::Minute;

/// Minute-indexed table of optional values over typed column descriptors.
///
/// Timestamps are unique. Every row holds exactly one slot per column.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable<C> {
    columns: Vec<C>,
    rows: BTreeMap<Minute, Vec<Option<f64>>>,
}

/// Raw per-KPI values of one metric type, outer-joined on timestamp.
pub type MetricTable = TimeSeriesTable<RawColumn>;

/// Aggregated values of one metric type.
pub type AggregatedSeries = TimeSeriesTable<AggColumn>;

impl<C> Default for TimeSeriesTable<C> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: BTreeMap::new(),
        }
    }
}

impl<C: PartialEq> TimeSeriesTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// No column or no row.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    pub fn position(&self, column: &C) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Minute> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (Minute, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(ts, row)| (*ts, row.as_slice()))
    }

    pub fn get(&self, timestamp: Minute, position: usize) -> Option<f64> {
        self.rows
            .get(&timestamp)
            .and_then(|row| row.get(position).copied().flatten())
    }

    /// Make sure a (possibly all-missing) row exists for `timestamp`.
    pub fn ensure_row(&mut self, timestamp: Minute) {
        let width = self.columns.len();
        self.rows
            .entry(timestamp)
            .or_insert_with(|| vec![None; width]);
    }

    /// Append a column; timestamps not yet present create new rows.
    pub fn push_column(
        &mut self,
        column: C,
        values: impl IntoIterator<Item = (Minute, Option<f64>)>,
    ) -> usize {
        let position = self.columns.len();
        self.columns.push(column);
        for row in self.rows.values_mut() {
            row.push(None);
        }
        let width = self.columns.len();
        for (timestamp, value) in values {
            let row = self
                .rows
                .entry(timestamp)
                .or_insert_with(|| vec![None; width]);
            row[position] = value;
        }
        position
    }

    pub fn column_values(&self, position: usize) -> impl Iterator<Item = (Minute, Option<f64>)> + '_ {
        self.rows
            .iter()
            .map(move |(ts, row)| (*ts, row.get(position).copied().flatten()))
    }

    /// New table holding, for each `(position, column)` of `selection`, the
    /// values of `position` under the descriptor `column`.
    pub fn project<D: Clone>(&self, selection: &[(usize, D)]) -> TimeSeriesTable<D> {
        let columns = selection.iter().map(|(_, column)| column.clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|(ts, row)| (*ts, selection.iter().map(|(p, _)| row[*p]).collect()))
            .collect();
        TimeSeriesTable { columns, rows }
    }
}

impl MetricTable {
    /// Whether any column carries a distribution component.
    pub fn is_distribution(&self) -> bool {
        self.columns
            .iter()
            .any(|column| matches!(column.component, ValueComponent::Distribution(_)))
    }

    /// Indices of the KPIs that have at least one column.
    pub fn kpi_indices(&self) -> BTreeSet<u32> {
        self.columns.iter().map(|column| column.kpi).collect()
    }
}
