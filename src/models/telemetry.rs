//! Telemetry value objects: metric queries and windowed samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistic to reduce each period to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStat {
    Sum,
    Average,
    Minimum,
    Maximum,
    SampleCount,
}

impl MetricStat {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricStat::Sum => "sum",
            MetricStat::Average => "average",
            MetricStat::Minimum => "minimum",
            MetricStat::Maximum => "maximum",
            MetricStat::SampleCount => "sample_count",
        }
    }
}

/// A windowed metric request against the provider's monitoring subsystem.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric: String,
    pub dimensions: Vec<(String, String)>,
    pub lookback_days: i64,
    pub period_secs: i32,
    pub stat: MetricStat,
}

impl MetricQuery {
    pub fn new(namespace: &str, metric: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            metric: metric.to_string(),
            dimensions: Vec::new(),
            lookback_days: 30,
            period_secs: 86_400,
            stat: MetricStat::Average,
        }
    }

    pub fn dimension(mut self, name: &str, value: &str) -> Self {
        self.dimensions.push((name.to_string(), value.to_string()));
        self
    }

    pub fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn period_secs(mut self, secs: i32) -> Self {
        self.period_secs = secs;
        self
    }

    pub fn stat(mut self, stat: MetricStat) -> Self {
        self.stat = stat;
        self
    }

    /// Cache key within one region scan.
    pub fn cache_key(&self) -> String {
        let dims: Vec<String> = self
            .dimensions
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!(
            "{}:{}:{}:{}d:{}s:{}",
            self.namespace,
            self.metric,
            dims.join(","),
            self.lookback_days,
            self.period_secs,
            self.stat.as_str()
        )
    }
}

/// A windowed aggregation result: zero or more `(timestamp, value)` points.
///
/// The zero sample (no points) means "no data", never "measured zero" —
/// scenarios must not conflate the two.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl TelemetrySample {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_points(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(t, _)| *t);
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn sum(&self) -> f64 {
        self.points.iter().map(|(_, v)| v).sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.sum() / self.points.len() as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|(_, v)| *v)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    pub fn min(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|(_, v)| *v)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
    }

    /// Most recent point's value.
    pub fn latest(&self) -> Option<f64> {
        self.points.last().map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(values: &[f64]) -> TelemetrySample {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        TelemetrySample::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (base + chrono::Duration::hours(i as i64), *v))
                .collect(),
        )
    }

    #[test]
    fn test_empty_sample_has_no_mean() {
        assert!(TelemetrySample::empty().mean().is_none());
        assert_eq!(TelemetrySample::empty().sum(), 0.0);
    }

    #[test]
    fn test_aggregates() {
        let s = sample(&[1.0, 2.0, 3.0]);
        assert_eq!(s.sum(), 6.0);
        assert_eq!(s.mean(), Some(2.0));
        assert_eq!(s.max(), Some(3.0));
        assert_eq!(s.min(), Some(1.0));
        assert_eq!(s.latest(), Some(3.0));
    }

    #[test]
    fn test_cache_key_distinguishes_stat() {
        let a = MetricQuery::new("AWS/EC2", "CPUUtilization").stat(MetricStat::Average);
        let b = MetricQuery::new("AWS/EC2", "CPUUtilization").stat(MetricStat::Maximum);
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
