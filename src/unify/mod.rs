//! Cross-run canonical indexing of aggregated KPIs.
//!
//! Runs are aggregated independently, so index 3 of one run and index 3 of
//! another may describe different label sets. The unifier maps every run onto
//! one canonical catalog per metric type and renames the aggregated columns
//! accordingly.

pub mod canonical;
pub mod unifier;

pub use canonical::CanonicalCatalog;
pub use unifier::{RunAggregate, UnifiedMetric, Unifier, UnifyMode};
