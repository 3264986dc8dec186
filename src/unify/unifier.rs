use std::collections::HashMap;

use tracing::debug;

use super::canonical::CanonicalCatalog;
use crate::datamodel::{AggColumn, AggregatedSeries, KpiCatalog};
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum UnifyMode {
    /// Rebuild the canonical catalog from the given runs only.
    Rebuild,
    /// Grow an existing canonical catalog, appending unseen rows in run order.
    Incremental(CanonicalCatalog),
}

/// Aggregated output of one metric type in one run.
#[derive(Debug, Clone)]
pub struct RunAggregate {
    pub name: String,
    pub catalog: KpiCatalog,
    pub series: AggregatedSeries,
}

#[derive(Debug, Clone)]
pub struct UnifiedMetric {
    pub canonical: CanonicalCatalog,
    /// Renamed series of every run, in input order.
    pub runs: Vec<(String, AggregatedSeries)>,
}

pub struct Unifier {
    mode: UnifyMode,
}

impl Unifier {
    pub fn new(mode: UnifyMode) -> Self {
        Self { mode }
    }

    pub fn unify(self, runs: &[RunAggregate]) -> Result<UnifiedMetric> {
        let mut canonical = match self.mode {
            UnifyMode::Rebuild => CanonicalCatalog::rebuild(runs.iter().map(|run| &run.catalog)),
            UnifyMode::Incremental(existing) => existing,
        };

        let mut mappings = Vec::with_capacity(runs.len());
        for run in runs {
            let mut mapping = HashMap::with_capacity(run.catalog.len());
            for entry in run.catalog.entries() {
                let index = canonical.resolve_or_append(&entry.labels)?;
                mapping.insert(entry.index, index);
            }
            mappings.push(mapping);
        }

        let renamed = runs
            .iter()
            .zip(&mappings)
            .map(|(run, mapping)| (run.name.clone(), remap_series(&run.series, mapping)))
            .collect();

        Ok(UnifiedMetric {
            canonical,
            runs: renamed,
        })
    }
}

/// Rename columns to canonical indices, drop the unmapped ones, order by
/// index (stable within an index).
pub fn remap_series(series: &AggregatedSeries, mapping: &HashMap<u32, u32>) -> AggregatedSeries {
    let mut selection: Vec<(usize, AggColumn)> = Vec::with_capacity(series.num_columns());
    for (position, column) in series.columns().iter().enumerate() {
        match mapping.get(&column.index) {
            Some(index) => selection.push((position, column.with_index(*index))),
            None => debug!("Dropping column {} without catalog entry", column),
        }
    }
    selection.sort_by_key(|(_, column)| column.index);
    series.project(&selection)
}
