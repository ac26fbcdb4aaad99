use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ReportContext;
use crate::date_range::{previous_period, previous_period_label, DateInterval, DateRangeSummary};
use crate::error::ProviderError;
use crate::provider::ProviderResponse;
use crate::timeseries::{align_previous, normalize, provider_date, TimeSeriesPoint};

const METRICS: [&str; 3] = ["totalUsers", "sessions", "screenPageViews"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyChartReport {
    pub chart_data: Vec<TimeSeriesPoint>,
    pub previous_chart_data: Vec<TimeSeriesPoint>,
    pub previous_period_label: String,
    pub date_range: DateRangeSummary,
}

fn points(response: ProviderResponse) -> Vec<TimeSeriesPoint> {
    response
        .rows
        .iter()
        .map(|row| {
            TimeSeriesPoint::new(
                provider_date(row.dimension(0, "")),
                row.metric_i64(0),
                row.metric_i64(1),
                row.metric_i64(2),
            )
        })
        .collect()
}

async fn series(
    ctx: &ReportContext<'_>,
    interval: &DateInterval,
) -> Result<Vec<TimeSeriesPoint>, ProviderError> {
    let request = ctx
        .provider_request(interval)
        .dimensions(&["date"])
        .metrics(&METRICS);
    let response = ctx.provider.run_report(&request).await?;
    Ok(normalize(points(response), interval, ctx.preset()))
}

pub async fn fetch(ctx: &ReportContext<'_>) -> Result<DailyChartReport, ProviderError> {
    let mut chart_data = series(ctx, &ctx.interval).await?;

    // The comparison series is optional: the chart still renders without it.
    let previous_interval = previous_period(&ctx.interval, ctx.preset());
    let previous_chart_data = match series(ctx, &previous_interval).await {
        Ok(points) => points,
        Err(e) => {
            warn!(
                report = "daily_chart",
                property_id = ctx.property_id,
                error = %e,
                "previous period fetch failed"
            );
            Vec::new()
        }
    };
    align_previous(&mut chart_data, &previous_chart_data);

    Ok(DailyChartReport {
        chart_data,
        previous_chart_data,
        previous_period_label: previous_period_label(&ctx.interval, ctx.preset()),
        date_range: ctx.interval.summary(),
    })
}

pub fn fallback(ctx: &ReportContext<'_>) -> DailyChartReport {
    DailyChartReport {
        chart_data: Vec::new(),
        previous_chart_data: Vec::new(),
        previous_period_label: String::new(),
        date_range: ctx.interval.summary(),
    }
}
