use serde::{Deserialize, Serialize};

use super::{share_pct, ReportContext};
use crate::date_range::DateRangeSummary;
use crate::error::ProviderError;
use crate::provider::ProviderRow;

const METRICS: [&str; 2] = ["sessions", "newUsers"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficChartReport {
    pub traffic_acquisition: TrafficAcquisition,
    pub date_range: DateRangeSummary,
}

/// New versus returning split of all sessions in the range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficAcquisition {
    pub new_sessions: i64,
    pub new_sessions_percentage: f64,
    pub returning_sessions: i64,
    pub returning_sessions_percentage: f64,
}

impl TrafficAcquisition {
    fn from_row(row: Option<&ProviderRow>) -> Self {
        let Some(row) = row else {
            return Self::default();
        };
        let total = row.metric_i64(0).max(0);
        let new_sessions = row.metric_i64(1).clamp(0, total);
        let returning_sessions = total - new_sessions;

        Self {
            new_sessions,
            new_sessions_percentage: share_pct(new_sessions, total, 1),
            returning_sessions,
            returning_sessions_percentage: share_pct(returning_sessions, total, 1),
        }
    }
}

pub async fn fetch(ctx: &ReportContext<'_>) -> Result<TrafficChartReport, ProviderError> {
    let request = ctx.provider_request(&ctx.interval).metrics(&METRICS);
    let response = ctx.provider.run_report(&request).await?;

    Ok(TrafficChartReport {
        traffic_acquisition: TrafficAcquisition::from_row(response.first()),
        date_range: ctx.interval.summary(),
    })
}

pub fn fallback(ctx: &ReportContext<'_>) -> TrafficChartReport {
    TrafficChartReport {
        traffic_acquisition: TrafficAcquisition::default(),
        date_range: ctx.interval.summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_rounded_to_one_decimal() {
        let row = ProviderRow::new(Vec::<String>::new(), ["3", "1"]);
        let split = TrafficAcquisition::from_row(Some(&row));
        assert_eq!(split.new_sessions, 1);
        assert_eq!(split.returning_sessions, 2);
        assert_eq!(split.new_sessions_percentage, 33.3);
        assert_eq!(split.returning_sessions_percentage, 66.7);
    }

    #[test]
    fn no_sessions_means_zero_percentages() {
        let row = ProviderRow::new(Vec::<String>::new(), ["0", "0"]);
        assert_eq!(TrafficAcquisition::from_row(Some(&row)), TrafficAcquisition::default());
        assert_eq!(TrafficAcquisition::from_row(None), TrafficAcquisition::default());
    }
}
