//! Monitoring subsystem queries. Absent data comes back as the zero sample;
//! scenarios decide what absence means for them.

use super::{RegionClients, classify, from_smithy_time, to_smithy_time};
use crate::models::{MetricQuery, MetricStat, TelemetrySample};
use crate::providers::ProviderError;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use chrono::Utc;

fn to_statistic(stat: MetricStat) -> Statistic {
    match stat {
        MetricStat::Sum => Statistic::Sum,
        MetricStat::Average => Statistic::Average,
        MetricStat::Minimum => Statistic::Minimum,
        MetricStat::Maximum => Statistic::Maximum,
        MetricStat::SampleCount => Statistic::SampleCount,
    }
}

pub(crate) async fn get_metric(
    clients: &RegionClients,
    query: &MetricQuery,
) -> Result<TelemetrySample, ProviderError> {
    let end = Utc::now();
    let start = end - chrono::Duration::days(query.lookback_days);

    let mut request = clients
        .cloudwatch
        .get_metric_statistics()
        .namespace(&query.namespace)
        .metric_name(&query.metric)
        .start_time(to_smithy_time(start))
        .end_time(to_smithy_time(end))
        .period(query.period_secs)
        .statistics(to_statistic(query.stat));
    for (name, value) in &query.dimensions {
        request = request.dimensions(Dimension::builder().name(name).value(value).build());
    }

    let resp = request
        .send()
        .await
        .map_err(|e| classify("cloudwatch:GetMetricStatistics", e))?;

    let points = resp
        .datapoints()
        .iter()
        .filter_map(|dp| {
            let ts = dp.timestamp().and_then(from_smithy_time)?;
            let value = match query.stat {
                MetricStat::Sum => dp.sum(),
                MetricStat::Average => dp.average(),
                MetricStat::Minimum => dp.minimum(),
                MetricStat::Maximum => dp.maximum(),
                MetricStat::SampleCount => dp.sample_count(),
            }?;
            Some((ts, value))
        })
        .collect();

    Ok(TelemetrySample::from_points(points))
}
