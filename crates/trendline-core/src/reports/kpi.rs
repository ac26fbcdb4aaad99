use serde::{Deserialize, Serialize};

use super::ReportContext;
use crate::date_range::{previous_period, DateInterval, DateRangeSummary};
use crate::error::ProviderError;
use crate::format::{format_count, round_to};
use crate::provider::ProviderRow;
use crate::trend::{duration_trend, format_duration, rate_trend, trend, TrendMetric};

const METRICS: [&str; 6] = [
    "totalUsers",
    "sessions",
    "screenPageViews",
    "averageSessionDuration",
    "bounceRate",
    "newUsers",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub summary: KpiSummary,
    pub date_range: DateRangeSummary,
    pub previous_date_range: DateRangeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_users: i64,
    pub sessions: i64,
    pub page_views: i64,
    /// `m:ss`
    pub avg_session_duration: String,
    /// Percent, two decimals.
    pub bounce_rate: f64,
    pub formatted_users: String,
    pub formatted_sessions: String,
    pub formatted_page_views: String,
    pub kpi_metrics: KpiMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiMetrics {
    pub sessions: TrendMetric,
    pub total_users: TrendMetric,
    pub new_users: TrendMetric,
    pub returning_users: TrendMetric,
    pub bounce_rate: TrendMetric,
    pub avg_session_duration: TrendMetric,
}

/// Totals for one period, read from a single aggregate row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Snapshot {
    total_users: i64,
    sessions: i64,
    page_views: i64,
    avg_session_secs: u64,
    bounce_rate: f64,
    new_users: i64,
}

impl Snapshot {
    fn from_row(row: Option<&ProviderRow>) -> Self {
        let Some(row) = row else {
            return Self::default();
        };
        Self {
            total_users: row.metric_i64(0),
            sessions: row.metric_i64(1),
            page_views: row.metric_i64(2),
            avg_session_secs: row.metric_i64(3).max(0) as u64,
            bounce_rate: round_to(row.metric_f64(4) * 100.0, 2),
            new_users: row.metric_i64(5),
        }
    }

    fn returning_users(&self) -> i64 {
        self.total_users.saturating_sub(self.new_users).max(0)
    }
}

fn summarize(current: &Snapshot, previous: &Snapshot) -> KpiSummary {
    let current_duration = format_duration(current.avg_session_secs);
    let previous_duration = format_duration(previous.avg_session_secs);

    KpiSummary {
        total_users: current.total_users,
        sessions: current.sessions,
        page_views: current.page_views,
        avg_session_duration: current_duration.clone(),
        bounce_rate: current.bounce_rate,
        formatted_users: format_count(current.total_users),
        formatted_sessions: format_count(current.sessions),
        formatted_page_views: format_count(current.page_views),
        kpi_metrics: KpiMetrics {
            sessions: trend(current.sessions, previous.sessions, format_count(current.sessions)),
            total_users: trend(
                current.total_users,
                previous.total_users,
                format_count(current.total_users),
            ),
            new_users: trend(current.new_users, previous.new_users, format_count(current.new_users)),
            returning_users: trend(
                current.returning_users(),
                previous.returning_users(),
                format_count(current.returning_users()),
            ),
            bounce_rate: rate_trend(current.bounce_rate, previous.bounce_rate),
            avg_session_duration: duration_trend(&current_duration, &previous_duration),
        },
    }
}

async fn snapshot(ctx: &ReportContext<'_>, interval: &DateInterval) -> Result<Snapshot, ProviderError> {
    let request = ctx.provider_request(interval).metrics(&METRICS);
    let response = ctx.provider.run_report(&request).await?;
    Ok(Snapshot::from_row(response.first()))
}

pub async fn fetch(ctx: &ReportContext<'_>) -> Result<KpiReport, ProviderError> {
    let previous_interval = previous_period(&ctx.interval, ctx.preset());
    let current = snapshot(ctx, &ctx.interval).await?;
    let previous = snapshot(ctx, &previous_interval).await?;

    Ok(KpiReport {
        summary: summarize(&current, &previous),
        date_range: ctx.interval.summary(),
        previous_date_range: previous_interval.summary(),
    })
}

pub fn fallback(ctx: &ReportContext<'_>) -> KpiReport {
    let zero = Snapshot::default();
    KpiReport {
        summary: summarize(&zero, &zero),
        date_range: ctx.interval.summary(),
        previous_date_range: previous_period(&ctx.interval, ctx.preset()).summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(metrics: [&str; 6]) -> ProviderRow {
        ProviderRow::new(Vec::<String>::new(), metrics)
    }

    #[test]
    fn snapshot_reads_metrics_positionally() {
        let snap = Snapshot::from_row(Some(&row(["1200", "1500", "4000", "125.7", "0.4275", "300"])));
        assert_eq!(snap.total_users, 1200);
        assert_eq!(snap.sessions, 1500);
        assert_eq!(snap.page_views, 4000);
        assert_eq!(snap.avg_session_secs, 125);
        assert_eq!(snap.bounce_rate, 42.75);
        assert_eq!(snap.new_users, 300);
        assert_eq!(snap.returning_users(), 900);
    }

    #[test]
    fn missing_row_is_all_zero() {
        assert_eq!(Snapshot::from_row(None), Snapshot::default());
    }

    #[test]
    fn summary_compares_against_previous() {
        let current = Snapshot::from_row(Some(&row(["1200", "1500", "4000", "150", "0.44", "300"])));
        let previous = Snapshot::from_row(Some(&row(["1000", "1200", "3500", "120", "0.40", "300"])));

        let summary = summarize(&current, &previous);
        assert_eq!(summary.formatted_sessions, "1,500");
        assert_eq!(summary.avg_session_duration, "2:30");

        let kpi = &summary.kpi_metrics;
        assert_eq!(kpi.sessions.relative_change, "+25.0%");
        assert_eq!(kpi.sessions.absolute_change, "+300");
        assert!(kpi.sessions.is_positive);
        assert_eq!(kpi.new_users.absolute_change, "+0");
        assert!(!kpi.new_users.is_positive);
        assert_eq!(kpi.returning_users.current, "900");
        assert_eq!(kpi.returning_users.absolute_change, "+200");
        assert_eq!(kpi.bounce_rate.current, "44.00%");
        assert_eq!(kpi.bounce_rate.absolute_change, "+4.00%");
        assert_eq!(kpi.avg_session_duration.current, "00:02:30");
        assert_eq!(kpi.avg_session_duration.absolute_change, "+00:00:30");
    }

    #[test]
    fn zero_summary_has_stable_shape() {
        let zero = Snapshot::default();
        let summary = summarize(&zero, &zero);
        assert_eq!(summary.kpi_metrics.sessions.current, "0");
        assert!(!summary.kpi_metrics.sessions.is_positive);
        assert_eq!(summary.kpi_metrics.avg_session_duration.current, "00:00:00");
        assert_eq!(summary.kpi_metrics.bounce_rate.current, "0.00%");
        assert_eq!(summary.avg_session_duration, "0:00");
    }
}
