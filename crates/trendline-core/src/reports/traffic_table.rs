use serde::{Deserialize, Serialize};

use super::{average, saturating_sum, sort_rows, ReportContext};
use crate::date_range::DateRangeSummary;
use crate::error::ProviderError;
use crate::format::{format_count, round_to};
use crate::pagination::{paginate, PaginatedResult, PaginationMeta};
use crate::provider::ProviderRow;
use crate::request::{ReportRequest, SortBy};

/// Sources beyond this are not shown in the table.
const FETCH_LIMIT: u32 = 1000;

const DIMENSIONS: [&str; 2] = ["sessionSource", "sessionMedium"];
const METRICS: [&str; 5] = [
    "sessions",
    "totalUsers",
    "screenPageViews",
    "newUsers",
    "bounceRate",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficTableReport {
    pub items: Vec<TrafficSourceRow>,
    pub pagination: PaginationMeta,
    pub totals: TrafficTotals,
    pub date_range: DateRangeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSourceRow {
    /// `"{source} / {medium}"`
    pub source: String,
    pub sessions: i64,
    pub users: i64,
    pub new_users: i64,
    pub page_views: i64,
    pub bounce_rate: f64,
    pub formatted_sessions: String,
    pub formatted_users: String,
    pub formatted_page_views: String,
}

impl TrafficSourceRow {
    fn from_row(row: &ProviderRow) -> Self {
        let sessions = row.metric_i64(0);
        let users = row.metric_i64(1);
        let page_views = row.metric_i64(2);
        Self {
            source: format!(
                "{} / {}",
                row.dimension(0, "(not set)"),
                row.dimension(1, "(not set)")
            ),
            sessions,
            users,
            new_users: row.metric_i64(3),
            page_views,
            bounce_rate: round_to(row.metric_f64(4) * 100.0, 2),
            formatted_sessions: format_count(sessions),
            formatted_users: format_count(users),
            formatted_page_views: format_count(page_views),
        }
    }

    fn sort_value(&self, sort_by: SortBy) -> f64 {
        match sort_by {
            SortBy::Users => self.users as f64,
            SortBy::Pageviews => self.page_views as f64,
            SortBy::BounceRate => self.bounce_rate,
            SortBy::Sessions | SortBy::AvgSessionDuration => self.sessions as f64,
        }
    }
}

/// Aggregates over every fetched source, not just the visible page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficTotals {
    pub sessions: i64,
    pub new_users: i64,
    pub total_users: i64,
    /// Unweighted mean of the per-source rates.
    pub bounce_rate: f64,
}

impl TrafficTotals {
    fn over(rows: &[TrafficSourceRow]) -> Self {
        Self {
            sessions: saturating_sum(rows.iter().map(|r| r.sessions)),
            new_users: saturating_sum(rows.iter().map(|r| r.new_users)),
            total_users: saturating_sum(rows.iter().map(|r| r.users)),
            bounce_rate: round_to(average(rows.iter().map(|r| r.bounce_rate)), 2),
        }
    }
}

fn build(
    mut rows: Vec<TrafficSourceRow>,
    request: &ReportRequest,
) -> (PaginatedResult<TrafficSourceRow>, TrafficTotals) {
    let totals = TrafficTotals::over(&rows);
    let sort_by = request.sort_by;
    sort_rows(&mut rows, request.sort_direction, |r| r.sort_value(sort_by));
    (paginate(rows, request.page, request.per_page), totals)
}

pub async fn fetch(ctx: &ReportContext<'_>) -> Result<TrafficTableReport, ProviderError> {
    let request = ctx
        .provider_request(&ctx.interval)
        .dimensions(&DIMENSIONS)
        .metrics(&METRICS)
        .limit(FETCH_LIMIT);
    let response = ctx.provider.run_report(&request).await?;

    let rows = response.rows.iter().map(TrafficSourceRow::from_row).collect();
    let (page, totals) = build(rows, ctx.request);

    Ok(TrafficTableReport {
        items: page.items,
        pagination: page.pagination,
        totals,
        date_range: ctx.interval.summary(),
    })
}

pub fn fallback(ctx: &ReportContext<'_>) -> TrafficTableReport {
    TrafficTableReport {
        items: Vec::new(),
        pagination: PaginationMeta::empty(ctx.request.page, ctx.request.per_page),
        totals: TrafficTotals::default(),
        date_range: ctx.interval.summary(),
    }
}
