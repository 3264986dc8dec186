//! Structured column descriptors.
//!
//! Persisted tables encode identity in column names (`kpi-3-mean`,
//! `agg-kpi-3-std-count`, ...). Those names are parsed once when a table is
//! read and written back only when a table is persisted.

use std::fmt;

use crate::error::{KpiError, Result};

const AGG_PREFIX: &str = "agg-kpi-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistributionComponent {
    Count,
    Mean,
    SumOfSquaredDeviation,
}

impl DistributionComponent {
    pub const ALL: [DistributionComponent; 3] = [
        DistributionComponent::Count,
        DistributionComponent::Mean,
        DistributionComponent::SumOfSquaredDeviation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionComponent::Count => "count",
            DistributionComponent::Mean => "mean",
            DistributionComponent::SumOfSquaredDeviation => "sum_of_squared_deviation",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "count" => Some(DistributionComponent::Count),
            "mean" => Some(DistributionComponent::Mean),
            "sum_of_squared_deviation" => Some(DistributionComponent::SumOfSquaredDeviation),
            _ => None,
        }
    }
}

/// Which part of a raw KPI sample a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueComponent {
    Value,
    Distribution(DistributionComponent),
}

impl ValueComponent {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "value" => Some(ValueComponent::Value),
            other => DistributionComponent::parse(other).map(ValueComponent::Distribution),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueComponent::Value => "value",
            ValueComponent::Distribution(component) => component.as_str(),
        }
    }
}

/// Raw column: one component of one KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawColumn {
    pub kpi: u32,
    pub component: ValueComponent,
}

impl RawColumn {
    pub fn new(kpi: u32, component: ValueComponent) -> Self {
        Self { kpi, component }
    }
}

impl fmt::Display for RawColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kpi-{}-{}", self.kpi, self.component.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Median,
    Std,
    Count,
    Sum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Std => "std",
            Statistic::Count => "count",
            Statistic::Sum => "sum",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Statistic::Min),
            "max" => Some(Statistic::Max),
            "mean" => Some(Statistic::Mean),
            "median" => Some(Statistic::Median),
            "std" => Some(Statistic::Std),
            "count" => Some(Statistic::Count),
            "sum" => Some(Statistic::Sum),
            _ => None,
        }
    }
}

/// Aggregated column: `(index, statistic, distribution component)`.
///
/// `statistic` is `None` for KPIs copied without aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggColumn {
    pub index: u32,
    pub statistic: Option<Statistic>,
    pub component: Option<DistributionComponent>,
}

impl AggColumn {
    pub fn passthrough(index: u32) -> Self {
        Self {
            index,
            statistic: None,
            component: None,
        }
    }

    pub fn scalar(index: u32, statistic: Statistic) -> Self {
        Self {
            index,
            statistic: Some(statistic),
            component: None,
        }
    }

    pub fn distribution(index: u32, statistic: Statistic, component: DistributionComponent) -> Self {
        Self {
            index,
            statistic: Some(statistic),
            component: Some(component),
        }
    }

    pub fn with_index(self, index: u32) -> Self {
        Self { index, ..self }
    }

    /// Parse `agg-kpi-{i}`, `agg-kpi-{i}-{stat}` or `agg-kpi-{i}-{stat}-{component}`.
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || KpiError::InvalidColumnName(name.to_string());
        let rest = name.strip_prefix(AGG_PREFIX).ok_or_else(invalid)?;
        let mut parts = rest.splitn(3, '-');
        let index = parts
            .next()
            .and_then(|index| index.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let statistic = match parts.next() {
            Some(statistic) => Some(Statistic::parse(statistic).ok_or_else(invalid)?),
            None => None,
        };
        let component = match parts.next() {
            Some(component) => Some(DistributionComponent::parse(component).ok_or_else(invalid)?),
            None => None,
        };
        Ok(Self {
            index,
            statistic,
            component,
        })
    }
}

impl fmt::Display for AggColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", AGG_PREFIX, self.index)?;
        if let Some(statistic) = self.statistic {
            write!(f, "-{}", statistic.as_str())?;
        }
        if let Some(component) = self.component {
            write!(f, "-{}", component.as_str())?;
        }
        Ok(())
    }
}
