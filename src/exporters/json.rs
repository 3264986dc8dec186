use crate::datamodel::{KpiCatalog, KpiRecord};
use crate::error::Result;

/// Converter for KPI catalogs to their record form.
pub struct JsonConverter;

impl JsonConverter {
    /// `[{"index": 1, "kpi": {...}}, ...]`
    pub fn catalog_to_json(catalog: &KpiCatalog) -> Result<String> {
        let records: Vec<KpiRecord> = catalog.entries().iter().map(|entry| entry.to_record()).collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// One record per line.
    pub fn catalog_to_jsonl(catalog: &KpiCatalog) -> Result<String> {
        let mut output = String::new();
        for entry in catalog.entries() {
            output.push_str(&serde_json::to_string(&entry.to_record())?);
            output.push('\n');
        }
        Ok(output)
    }
}
