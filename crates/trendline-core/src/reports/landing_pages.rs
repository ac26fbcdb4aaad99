use serde::{Deserialize, Serialize};

use super::{average, saturating_sum, share_pct, sort_rows, ReportContext};
use crate::date_range::DateRangeSummary;
use crate::error::ProviderError;
use crate::format::{format_count, round_to};
use crate::pagination::{paginate_ranked, PaginatedResult, PaginationMeta, Ranked};
use crate::provider::ProviderRow;
use crate::request::{ReportRequest, SortBy};

/// Headroom fetched beyond the requested page.
const FETCH_HEADROOM: u32 = 50;

const DIMENSIONS: [&str; 2] = ["pagePath", "pageTitle"];
const METRICS: [&str; 4] = ["sessions", "newUsers", "totalUsers", "bounceRate"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPagesReport {
    pub items: Vec<LandingPageRow>,
    pub pagination: PaginationMeta,
    pub totals: LandingPageTotals,
    pub date_range: DateRangeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPageRow {
    pub rank: usize,
    pub landing_page: String,
    pub page_title: String,
    pub sessions: i64,
    /// Share of all fetched sessions.
    pub percentage: f64,
    pub new_users: i64,
    pub total_users: i64,
    pub bounce_rate: f64,
    pub formatted_sessions: String,
    pub formatted_new_users: String,
    pub formatted_total_users: String,
}

impl LandingPageRow {
    fn from_row(row: &ProviderRow, total_sessions: i64) -> Self {
        let sessions = row.metric_i64(0);
        let new_users = row.metric_i64(1);
        let total_users = row.metric_i64(2);
        Self {
            rank: 0,
            landing_page: row.dimension(0, "/").to_string(),
            page_title: row.dimension(1, "Untitled").to_string(),
            sessions,
            percentage: share_pct(sessions, total_sessions, 2),
            new_users,
            total_users,
            bounce_rate: round_to(row.metric_f64(3) * 100.0, 2),
            formatted_sessions: format_count(sessions),
            formatted_new_users: format_count(new_users),
            formatted_total_users: format_count(total_users),
        }
    }

    fn sort_value(&self, sort_by: SortBy) -> f64 {
        match sort_by {
            SortBy::Users => self.total_users as f64,
            SortBy::BounceRate => self.bounce_rate,
            SortBy::Sessions | SortBy::Pageviews | SortBy::AvgSessionDuration => {
                self.sessions as f64
            }
        }
    }
}

impl Ranked for LandingPageRow {
    fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandingPageTotals {
    pub sessions: i64,
    pub new_users: i64,
    pub total_users: i64,
    pub bounce_rate: f64,
    pub percentage: f64,
}

impl LandingPageTotals {
    fn over(rows: &[LandingPageRow]) -> Self {
        if rows.is_empty() {
            return Self {
                percentage: 100.0,
                ..Self::default()
            };
        }
        Self {
            sessions: saturating_sum(rows.iter().map(|r| r.sessions)),
            new_users: saturating_sum(rows.iter().map(|r| r.new_users)),
            total_users: saturating_sum(rows.iter().map(|r| r.total_users)),
            bounce_rate: round_to(average(rows.iter().map(|r| r.bounce_rate)), 2),
            percentage: round_to(rows.iter().map(|r| r.percentage).sum(), 2),
        }
    }
}

/// Rows requested from the provider. Totals and shares cover this window only.
fn fetch_limit(request: &ReportRequest) -> u32 {
    request
        .per_page
        .saturating_mul(request.page)
        .saturating_add(FETCH_HEADROOM)
}

fn build(
    rows: &[ProviderRow],
    request: &ReportRequest,
) -> (PaginatedResult<LandingPageRow>, LandingPageTotals) {
    let total_sessions = saturating_sum(rows.iter().map(|r| r.metric_i64(0)));
    let mut pages: Vec<LandingPageRow> = rows
        .iter()
        .map(|r| LandingPageRow::from_row(r, total_sessions))
        .collect();

    let totals = LandingPageTotals::over(&pages);
    let sort_by = request.sort_by;
    sort_rows(&mut pages, request.sort_direction, |r| r.sort_value(sort_by));
    (paginate_ranked(pages, request.page, request.per_page), totals)
}

pub async fn fetch(ctx: &ReportContext<'_>) -> Result<LandingPagesReport, ProviderError> {
    let request = ctx
        .provider_request(&ctx.interval)
        .dimensions(&DIMENSIONS)
        .metrics(&METRICS)
        .limit(fetch_limit(ctx.request));
    let response = ctx.provider.run_report(&request).await?;

    let (page, totals) = build(&response.rows, ctx.request);
    Ok(LandingPagesReport {
        items: page.items,
        pagination: page.pagination,
        totals,
        date_range: ctx.interval.summary(),
    })
}

pub fn fallback(ctx: &ReportContext<'_>) -> LandingPagesReport {
    LandingPagesReport {
        items: Vec::new(),
        pagination: PaginationMeta::empty(ctx.request.page, ctx.request.per_page),
        totals: LandingPageTotals::default(),
        date_range: ctx.interval.summary(),
    }
}
