use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::kpi_labels::{KpiLabels, KpiLabelsExt, LabelValue};
use crate::error::{KpiError, Result};

/// Persisted form of a catalog entry: `{"index": 3, "kpi": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiRecord {
    pub index: u32,
    pub kpi: serde_json::Map<String, serde_json::Value>,
}

/// One KPI instance of a metric type: its index and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiEntry {
    pub index: u32,
    pub labels: KpiLabels,
}

impl KpiEntry {
    pub fn new(index: u32, labels: KpiLabels) -> Self {
        Self { index, labels }
    }

    pub fn from_record(record: &KpiRecord) -> Result<Self> {
        Ok(Self::new(record.index, KpiLabels::from_json_object(&record.kpi)?))
    }

    pub fn to_record(&self) -> KpiRecord {
        KpiRecord {
            index: self.index,
            kpi: self.labels.to_json_object(),
        }
    }
}

/// Every KPI of one metric type in one run.
///
/// Indices are unique but not necessarily contiguous. Entries keep the order
/// in which they were read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiCatalog {
    entries: Vec<KpiEntry>,
}

impl KpiCatalog {
    pub fn new(entries: Vec<KpiEntry>) -> Result<Self> {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.push(entry)?;
        }
        Ok(catalog)
    }

    /// Build a catalog indexed 1..N in the given order.
    pub fn from_labels(labels: impl IntoIterator<Item = KpiLabels>) -> Self {
        let entries = labels
            .into_iter()
            .enumerate()
            .map(|(i, labels)| KpiEntry::new(i as u32 + 1, labels))
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, entry: KpiEntry) -> Result<()> {
        if self.get(entry.index).is_some() {
            return Err(KpiError::DuplicateIndex {
                index: entry.index,
                context: "KPI catalog".to_string(),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[KpiEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&KpiEntry> {
        self.entries.iter().find(|entry| entry.index == index)
    }

    pub fn max_index(&self) -> u32 {
        self.entries.iter().map(|entry| entry.index).max().unwrap_or(0)
    }

    /// Sorted union of the label names used by the entries.
    pub fn label_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .entries
            .iter()
            .flat_map(|entry| entry.labels.iter().map(|(name, _)| name))
            .collect();
        names.into_iter().cloned().collect()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.labels.label(name).is_some())
    }

    /// Index of the first entry whose labels are exactly `labels`.
    pub fn find(&self, labels: &KpiLabels) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| &entry.labels == labels)
            .map(|entry| entry.index)
    }

    /// Distinct present values of one label.
    pub fn distinct_values(&self, name: &str) -> BTreeSet<LabelValue> {
        self.entries
            .iter()
            .filter_map(|entry| entry.labels.label(name).cloned())
            .collect()
    }

    pub fn retain(&mut self, keep: impl FnMut(&KpiEntry) -> bool) {
        self.entries.retain(keep);
    }
}
