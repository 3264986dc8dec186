pub mod catalog;
pub mod column;
pub mod datagrid;
pub mod frame;
pub mod kpi_datetime;
pub mod kpi_labels;
pub mod manifest;
pub mod series;

pub use catalog::{KpiCatalog, KpiEntry, KpiRecord};
pub use column::{AggColumn, DistributionComponent, RawColumn, Statistic, ValueComponent};
pub use datagrid::StringDataGrid;
pub use frame::{JoinKind, TIMESTAMP_COLUMN, WideFrame};
pub use kpi_datetime::{KpiDateTime, Minute};
pub use kpi_labels::{KpiLabels, KpiLabelsExt, LabelValue};
pub use manifest::{TargetMetric, TargetMetrics};
pub use series::{AggregatedSeries, MetricTable, TimeSeriesTable};
