use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{KpiError, Result};
use smallvec::SmallVec;

/// A single label value as found in KPI catalogs.
///
/// Integers and floats compare numerically, numbers sort before strings.
/// A missing label is represented by the absence of the pair, never by a
/// variant.
#[derive(Debug, Clone)]
pub enum LabelValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl LabelValue {
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Self>> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(b) => Ok(Some(LabelValue::String(b.to_string()))),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(LabelValue::Integer(i)))
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_nan() => Ok(None),
                        Some(f) => Ok(Some(LabelValue::Float(f))),
                        None => Err(KpiError::invalid_data_format(
                            "unrepresentable number",
                            &n.to_string(),
                        )),
                    }
                }
            }
            serde_json::Value::String(s) => Ok(Some(LabelValue::String(s.clone()))),
            other => Err(KpiError::invalid_data_format(
                "label values must be scalars",
                &other.to_string(),
            )),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LabelValue::Integer(i) => serde_json::Value::from(*i),
            LabelValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            LabelValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            LabelValue::Integer(_) | LabelValue::Float(_) => 0,
            LabelValue::String(_) => 1,
        }
    }
}

impl Ord for LabelValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LabelValue::Integer(a), LabelValue::Integer(b)) => a.cmp(b),
            (LabelValue::Integer(a), LabelValue::Float(b)) => (*a as f64).total_cmp(b),
            (LabelValue::Float(a), LabelValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (LabelValue::Float(a), LabelValue::Float(b)) => a.total_cmp(b),
            (LabelValue::String(a), LabelValue::String(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for LabelValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LabelValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LabelValue {}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Integer(i) => write!(f, "{}", i),
            LabelValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{:.1}", v),
            LabelValue::Float(v) => write!(f, "{}", v),
            LabelValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::String(value.to_string())
    }
}

impl From<i64> for LabelValue {
    fn from(value: i64) -> Self {
        LabelValue::Integer(value)
    }
}

/// Missing values sort after every present value.
pub fn cmp_missing_last(a: Option<&LabelValue>, b: Option<&LabelValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Label name → value pairs, sorted by name and without missing values.
pub type KpiLabels = SmallVec<[(String, LabelValue); 8]>;

pub trait KpiLabelsExt {
    fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<LabelValue>)>,
        K: Into<String>,
        Self: std::marker::Sized;

    fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self>
    where
        Self: std::marker::Sized;

    fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value>;

    fn label(&self, name: &str) -> Option<&LabelValue>;

    /// Values of `names`, in that order, missing ones as `None`.
    fn project(&self, names: &[String]) -> Vec<Option<LabelValue>>;
}

impl KpiLabelsExt for KpiLabels {
    fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<LabelValue>)>,
        K: Into<String>,
    {
        let mut labels_builder = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            match value {
                Some(value) => {
                    labels_builder.insert(key, value);
                }
                None => {
                    labels_builder.remove(&key);
                }
            }
        }
        labels_builder.into_iter().collect()
    }

    fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            pairs.push((key.clone(), LabelValue::from_json(value)?));
        }
        Ok(Self::from_pairs(pairs))
    }

    fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }

    fn label(&self, name: &str) -> Option<&LabelValue> {
        self.binary_search_by(|(key, _)| key.as_str().cmp(name))
            .ok()
            .map(|position| &self[position].1)
    }

    fn project(&self, names: &[String]) -> Vec<Option<LabelValue>> {
        names.iter().map(|name| self.label(name).cloned()).collect()
    }
}
