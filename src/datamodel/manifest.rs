/// A metric type to process, with the index used in its file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMetric {
    pub index: u32,
    pub name: String,
}

impl TargetMetric {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Ordered list of target metrics of one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMetrics {
    metrics: Vec<TargetMetric>,
}

impl TargetMetrics {
    pub fn new(metrics: Vec<TargetMetric>) -> Self {
        Self { metrics }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetMetric> + '_ {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl<'a> IntoIterator for &'a TargetMetrics {
    type Item = &'a TargetMetric;
    type IntoIter = std::slice::Iter<'a, TargetMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
