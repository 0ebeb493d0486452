//! Metric-aggregation helpers shared by most scenarios.
//!
//! Every helper carries a `SignalHint` alongside its numeric result so
//! downstream scenarios can tell "measured zero" from "no data" and degrade
//! gracefully instead of firing on absent telemetry.

use crate::models::TelemetrySample;
use chrono::{Datelike, Timelike};

/// Whether a helper result is backed by real datapoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalHint {
    Measured,
    NoData,
}

impl SignalHint {
    pub fn is_measured(self) -> bool {
        self == SignalHint::Measured
    }
}

/// A reduced scalar over a lookback window.
#[derive(Debug, Clone, Copy)]
pub struct Windowed {
    pub value: f64,
    pub samples: usize,
    pub hint: SignalHint,
}

fn windowed(value: f64, samples: usize) -> Windowed {
    let hint = if samples == 0 {
        SignalHint::NoData
    } else {
        SignalHint::Measured
    };
    Windowed { value, samples, hint }
}

/// Total over the window (for Sum-stat series).
pub fn window_sum(sample: &TelemetrySample) -> Windowed {
    windowed(sample.sum(), sample.len())
}

/// Mean over the window (for Average-stat series).
pub fn window_mean(sample: &TelemetrySample) -> Windowed {
    windowed(sample.mean().unwrap_or(0.0), sample.len())
}

/// Maximum over the window.
pub fn window_max(sample: &TelemetrySample) -> Windowed {
    windowed(sample.max().unwrap_or(0.0), sample.len())
}

/// Sample standard deviation over the window.
pub fn window_stddev(sample: &TelemetrySample) -> Windowed {
    let n = sample.len();
    if n < 2 {
        return windowed(0.0, 0);
    }
    let mean = sample.mean().unwrap_or(0.0);
    let var = sample
        .points
        .iter()
        .map(|(_, v)| (v - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    windowed(var.sqrt(), n)
}

/// A time series split into business-hours and off-hours buckets.
#[derive(Debug, Clone, Copy)]
pub struct BusinessHoursSplit {
    pub in_hours_total: f64,
    pub out_hours_total: f64,
    /// Share of the total that fell inside business hours, 0–100.
    pub in_hours_percent: f64,
    pub samples: usize,
    pub hint: SignalHint,
}

/// Split an hourly series into in-hours vs out-of-hours totals.
///
/// `business_days` uses 0 = Monday .. 6 = Sunday; the hour range is
/// `[start_hour, end_hour)` in UTC.
pub fn business_hours_split(
    sample: &TelemetrySample,
    business_days: &[u32],
    start_hour: u32,
    end_hour: u32,
) -> BusinessHoursSplit {
    let mut in_hours = 0.0;
    let mut out_hours = 0.0;
    for (ts, v) in &sample.points {
        let weekday = ts.weekday().num_days_from_monday();
        let hour = ts.hour();
        if business_days.contains(&weekday) && hour >= start_hour && hour < end_hour {
            in_hours += v;
        } else {
            out_hours += v;
        }
    }
    let total = in_hours + out_hours;
    let percent = if total > 0.0 { in_hours / total * 100.0 } else { 0.0 };
    let samples = sample.len();
    BusinessHoursSplit {
        in_hours_total: in_hours,
        out_hours_total: out_hours,
        in_hours_percent: percent,
        samples,
        hint: if samples == 0 { SignalHint::NoData } else { SignalHint::Measured },
    }
}

/// Comparison of an earlier window against a recent one.
#[derive(Debug, Clone, Copy)]
pub struct TrendRatio {
    pub baseline_mean: f64,
    pub current_mean: f64,
    /// Percentage change from baseline to current; negative means a drop.
    pub change_percent: f64,
    pub hint: SignalHint,
}

/// Compare the mean of a baseline window to the mean of a current window.
/// No data in either window degrades the hint; an empty baseline cannot
/// produce a meaningful ratio.
pub fn trend_ratio(baseline: &TelemetrySample, current: &TelemetrySample) -> TrendRatio {
    let (Some(base), Some(cur)) = (baseline.mean(), current.mean()) else {
        return TrendRatio {
            baseline_mean: 0.0,
            current_mean: 0.0,
            change_percent: 0.0,
            hint: SignalHint::NoData,
        };
    };
    let change = if base.abs() > f64::EPSILON {
        (cur - base) / base * 100.0
    } else {
        0.0
    };
    TrendRatio {
        baseline_mean: base,
        current_mean: cur,
        change_percent: change,
        hint: if base.abs() > f64::EPSILON { SignalHint::Measured } else { SignalHint::NoData },
    }
}

/// Hot-partition summary over per-partition totals.
#[derive(Debug, Clone)]
pub struct PartitionSkew {
    pub top_partition: Option<String>,
    /// Share of the total carried by the hottest partition, 0–100.
    pub top_share_percent: f64,
    pub idle_partitions: usize,
    pub total_partitions: usize,
    pub hint: SignalHint,
}

/// Compute the hottest partition's share and count the idle ones.
/// A partition is idle when its total is at or below `idle_threshold`.
pub fn partition_skew(per_partition: &[(String, f64)], idle_threshold: f64) -> PartitionSkew {
    if per_partition.is_empty() {
        return PartitionSkew {
            top_partition: None,
            top_share_percent: 0.0,
            idle_partitions: 0,
            total_partitions: 0,
            hint: SignalHint::NoData,
        };
    }
    let total: f64 = per_partition.iter().map(|(_, v)| v).sum();
    let (top_name, top_value) = per_partition
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, v)| (n.clone(), *v))
        .unwrap_or_default();
    let idle = per_partition
        .iter()
        .filter(|(_, v)| *v <= idle_threshold)
        .count();
    PartitionSkew {
        top_partition: Some(top_name),
        top_share_percent: if total > 0.0 { top_value / total * 100.0 } else { 0.0 },
        idle_partitions: idle,
        total_partitions: per_partition.len(),
        hint: SignalHint::Measured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TelemetrySample;
    use chrono::{TimeZone, Utc};

    fn hourly(start_day: u32, hours: usize, value: f64) -> TelemetrySample {
        // June 2025: the 2nd is a Monday.
        let base = Utc.with_ymd_and_hms(2025, 6, start_day, 0, 0, 0).unwrap();
        TelemetrySample::from_points(
            (0..hours)
                .map(|h| (base + chrono::Duration::hours(h as i64), value))
                .collect(),
        )
    }

    #[test]
    fn test_window_helpers_flag_missing_data() {
        let empty = TelemetrySample::empty();
        assert_eq!(window_sum(&empty).hint, SignalHint::NoData);
        assert_eq!(window_mean(&empty).hint, SignalHint::NoData);
        assert_eq!(window_stddev(&empty).hint, SignalHint::NoData);
    }

    #[test]
    fn test_stddev_of_flat_series_is_zero() {
        let s = hourly(2, 24, 5.0);
        let sd = window_stddev(&s);
        assert_eq!(sd.hint, SignalHint::Measured);
        assert!(sd.value.abs() < 1e-9);
    }

    #[test]
    fn test_business_hours_split_weekday() {
        // Monday 2025-06-02, 24 hourly points of 1.0; 9..18 = 9 in-hours.
        let s = hourly(2, 24, 1.0);
        let split = business_hours_split(&s, &[0, 1, 2, 3, 4], 9, 18);
        assert_eq!(split.in_hours_total, 9.0);
        assert_eq!(split.out_hours_total, 15.0);
        assert!((split.in_hours_percent - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_business_hours_split_weekend_is_all_out_of_hours() {
        // Sunday 2025-06-01.
        let s = hourly(1, 24, 1.0);
        let split = business_hours_split(&s, &[0, 1, 2, 3, 4], 9, 18);
        assert_eq!(split.in_hours_total, 0.0);
    }

    #[test]
    fn test_trend_ratio_drop() {
        let baseline = hourly(2, 10, 100.0);
        let current = hourly(9, 10, 5.0);
        let trend = trend_ratio(&baseline, &current);
        assert_eq!(trend.hint, SignalHint::Measured);
        assert!((trend.change_percent + 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_partition_skew() {
        let parts = vec![
            ("shard-0".to_string(), 900.0),
            ("shard-1".to_string(), 50.0),
            ("shard-2".to_string(), 0.0),
            ("shard-3".to_string(), 50.0),
        ];
        let skew = partition_skew(&parts, 0.0);
        assert_eq!(skew.top_partition.as_deref(), Some("shard-0"));
        assert_eq!(skew.idle_partitions, 1);
        assert!((skew.top_share_percent - 90.0).abs() < 1e-9);
    }
}
