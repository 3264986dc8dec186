use polars::prelude::*;

use super::kpi_datetime::Minute;
use super::series::AggregatedSeries;
use crate::error::{KpiError, Result};

/// Key column of every frame, in unix seconds.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// How rows of two frames are matched on timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Every left row, matched or not.
    Left,
    /// Only timestamps present on both sides.
    Inner,
    /// Every timestamp of either side.
    Outer,
}

impl JoinKind {
    fn join_args(self) -> JoinArgs {
        match self {
            JoinKind::Left => JoinArgs::new(JoinType::Left),
            JoinKind::Inner => JoinArgs::new(JoinType::Inner),
            JoinKind::Outer => {
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns)
            }
        }
    }
}

/// Timestamp-keyed polars frame of nullable Float64 columns.
///
/// The first column is always [`TIMESTAMP_COLUMN`]; value positions used by
/// the accessors skip it. Unlike [`AggregatedSeries`], a frame may hold
/// several rows for the same timestamp until
/// [`WideFrame::collapse_duplicates`] is called.
#[derive(Debug, Clone)]
pub struct WideFrame {
    df: DataFrame,
}

impl PartialEq for WideFrame {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

fn sort_by_timestamp(lazy: LazyFrame) -> LazyFrame {
    lazy.sort(
        [TIMESTAMP_COLUMN],
        SortMultipleOptions::default().with_maintain_order(true),
    )
}

impl WideFrame {
    /// A frame without rows or value columns.
    pub fn empty() -> Self {
        Self {
            df: Column::new(TIMESTAMP_COLUMN.into(), Vec::<i64>::new()).into_frame(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<(Minute, Vec<Option<f64>>)>) -> Result<Self> {
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for (timestamp, row) in rows {
            if row.len() != columns.len() {
                return Err(KpiError::invalid_data_format(
                    "row width does not match the frame columns",
                    &timestamp.to_string(),
                ));
            }
            timestamps.push(timestamp.unix_seconds());
            for (column, value) in values.iter_mut().zip(row) {
                column.push(value);
            }
        }

        let mut frame_columns = Vec::with_capacity(columns.len() + 1);
        frame_columns.push(Column::new(TIMESTAMP_COLUMN.into(), timestamps));
        for (name, column) in columns.iter().zip(values) {
            frame_columns.push(Column::new(name.as_str().into(), column));
        }
        Ok(Self {
            df: DataFrame::new(frame_columns)?,
        })
    }

    /// Columns named `{prefix}{descriptor}`, one row per series timestamp.
    pub fn from_series(series: &AggregatedSeries, prefix: &str) -> Result<Self> {
        let columns = series
            .columns()
            .iter()
            .map(|column| format!("{}{}", prefix, column))
            .collect();
        let rows = series
            .rows()
            .map(|(timestamp, row)| (timestamp, row.to_vec()))
            .collect();
        Self::from_rows(columns, rows)
    }

    pub fn data_frame(&self) -> &DataFrame {
        &self.df
    }

    /// Value column names, without the timestamp.
    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .skip(1)
            .map(|name| name.to_string())
            .collect()
    }

    pub fn index(&self) -> Vec<Minute> {
        self.df
            .column(TIMESTAMP_COLUMN)
            .ok()
            .and_then(|column| column.as_materialized_series().i64().ok())
            .map(|timestamps| {
                timestamps
                    .into_iter()
                    .flatten()
                    .map(Minute::from_unix_seconds_i64)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn num_rows(&self) -> usize {
        self.df.height()
    }

    pub fn num_columns(&self) -> usize {
        self.df.width().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.df
            .get_column_index(name)
            .and_then(|position| position.checked_sub(1))
    }

    fn values(&self, column: usize) -> Option<&Float64Chunked> {
        self.df
            .get_columns()
            .get(column + 1)?
            .as_materialized_series()
            .f64()
            .ok()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.values(column)?.get(row)
    }

    pub fn column_values(&self, column: usize) -> Vec<Option<f64>> {
        self.values(column)
            .map(|values| values.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<(Minute, Vec<Option<f64>>)> {
        let columns: Vec<&Float64Chunked> = (0..self.num_columns())
            .filter_map(|column| self.values(column))
            .collect();
        self.index()
            .into_iter()
            .enumerate()
            .map(|(row, timestamp)| (timestamp, columns.iter().map(|values| values.get(row)).collect()))
            .collect()
    }

    /// Keep the rows whose `keep` flag is set.
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<()> {
        let mask = BooleanChunked::from_slice("keep".into(), keep);
        self.df = self.df.filter(&mask)?;
        Ok(())
    }

    /// Stack frames vertically over the union of their columns, in order of
    /// first appearance.
    pub fn vconcat(frames: impl IntoIterator<Item = WideFrame>) -> Result<Self> {
        let frames: Vec<LazyFrame> = frames.into_iter().map(|frame| frame.df.lazy()).collect();
        if frames.is_empty() {
            return Ok(Self::empty());
        }
        let df = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
        Ok(Self { df })
    }

    /// Join on timestamp, `self` columns first, sorted by timestamp.
    ///
    /// Repeated timestamps produce one row per matching pair.
    pub fn join(&self, other: &WideFrame, kind: JoinKind) -> Result<Self> {
        let joined = self.df.clone().lazy().join(
            other.df.clone().lazy(),
            [col(TIMESTAMP_COLUMN)],
            [col(TIMESTAMP_COLUMN)],
            kind.join_args(),
        );
        let df = sort_by_timestamp(joined).collect()?;
        Ok(Self { df })
    }

    /// Side-by-side outer join of many frames.
    pub fn hconcat(frames: impl IntoIterator<Item = WideFrame>) -> Result<Self> {
        let mut frames = frames.into_iter();
        let Some(first) = frames.next() else {
            return Ok(Self::empty());
        };
        frames.try_fold(first, |acc, frame| acc.join(&frame, JoinKind::Outer))
    }

    /// One row per timestamp, sorted, each cell the mean of the present
    /// values of that column at that timestamp.
    pub fn collapse_duplicates(&self) -> Result<Self> {
        let means: Vec<Expr> = self
            .columns()
            .iter()
            .map(|name| col(name.as_str()).mean())
            .collect();
        let grouped = self
            .df
            .clone()
            .lazy()
            .group_by([col(TIMESTAMP_COLUMN)])
            .agg(means);
        let df = sort_by_timestamp(grouped).collect()?;
        Ok(Self { df })
    }

    pub fn has_duplicate_timestamps(&self) -> bool {
        let mut sorted = self.index();
        sorted.sort();
        sorted.windows(2).any(|pair| pair[0] == pair[1])
    }
}
