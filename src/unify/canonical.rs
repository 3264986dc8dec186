use std::cmp::Ordering;

use crate::datamodel::kpi_labels::cmp_missing_last;
use crate::datamodel::{KpiCatalog, KpiEntry, KpiLabels, KpiLabelsExt, LabelValue};
use crate::error::Result;

/// Deduplicated union of the catalogs of one metric type across runs.
///
/// No two rows share the same labels. Rows are never re-indexed once
/// assigned; new rows are appended after the largest index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalCatalog {
    catalog: KpiCatalog,
}

fn cmp_projection(a: &[Option<LabelValue>], b: &[Option<LabelValue>]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(a, b)| cmp_missing_last(a.as_ref(), b.as_ref()))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl CanonicalCatalog {
    /// Concatenate, drop duplicate label rows, sort by the label tuple over
    /// the sorted union of label names (missing last) and index 1..K.
    pub fn rebuild<'a>(catalogs: impl IntoIterator<Item = &'a KpiCatalog>) -> Self {
        let labels: Vec<&KpiLabels> = catalogs
            .into_iter()
            .flat_map(|catalog| catalog.entries().iter().map(|entry| &entry.labels))
            .collect();

        let mut names: Vec<String> = labels
            .iter()
            .flat_map(|labels| labels.iter().map(|(name, _)| name.clone()))
            .collect();
        names.sort();
        names.dedup();

        let mut rows: Vec<(Vec<Option<LabelValue>>, &KpiLabels)> = labels
            .into_iter()
            .map(|labels| (labels.project(&names), labels))
            .collect();
        rows.sort_by(|a, b| cmp_projection(&a.0, &b.0));
        rows.dedup_by(|a, b| cmp_projection(&a.0, &b.0).is_eq());

        Self {
            catalog: KpiCatalog::from_labels(rows.into_iter().map(|(_, labels)| labels.clone())),
        }
    }

    /// Wrap a previously persisted canonical catalog.
    pub fn from_catalog(catalog: KpiCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &KpiCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn resolve(&self, labels: &KpiLabels) -> Option<u32> {
        self.catalog.find(labels)
    }

    /// Index of `labels`, appending a row at max index + 1 when unseen.
    pub fn resolve_or_append(&mut self, labels: &KpiLabels) -> Result<u32> {
        if let Some(index) = self.resolve(labels) {
            return Ok(index);
        }
        let index = self.catalog.max_index() + 1;
        self.catalog.push(KpiEntry::new(index, labels.clone()))?;
        Ok(index)
    }
}
