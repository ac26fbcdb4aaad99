//! Report kinds and the engine that runs them.
//!
//! Every kind resolves its dates, fetches from the provider, shapes a typed
//! payload and caches it. Provider failures never escape: they are logged
//! and replaced with a zero-valued payload of the same shape.

pub mod daily_chart;
pub mod kpi;
pub mod landing_pages;
pub mod traffic_chart;
pub mod traffic_table;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cache::ReportCache;
use crate::clock::Clock;
use crate::date_range::{DateInterval, DateRangeResolver, Preset};
use crate::error::{ProviderError, ValidationError};
use crate::provider::{AnalyticsProvider, ProviderRequest};
use crate::request::{ReportRequest, SortDirection};

pub use daily_chart::DailyChartReport;
pub use kpi::KpiReport;
pub use landing_pages::LandingPagesReport;
pub use traffic_chart::TrafficChartReport;
pub use traffic_table::TrafficTableReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    KpiMetrics,
    DailyChart,
    TrafficChart,
    TrafficTable,
    LandingPages,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        Self::KpiMetrics,
        Self::DailyChart,
        Self::TrafficChart,
        Self::TrafficTable,
        Self::LandingPages,
    ];

    /// Accepts `kpi_metrics` as well as `kpi-metrics`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == normalized)
            .ok_or_else(|| ValidationError::UnknownReport(raw.to_string()))
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::KpiMetrics => "kpi_metrics",
            Self::DailyChart => "daily_chart",
            Self::TrafficChart => "traffic_chart",
            Self::TrafficTable => "traffic_table",
            Self::LandingPages => "landing_pages",
        }
    }

    /// The paginated traffic table has many more distinct keys, so it
    /// expires sooner.
    pub fn ttl(&self) -> Duration {
        match self {
            Self::TrafficTable => Duration::from_secs(1200),
            _ => Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Kpi(KpiReport),
    DailyChart(DailyChartReport),
    TrafficChart(TrafficChartReport),
    TrafficTable(TrafficTableReport),
    LandingPages(LandingPagesReport),
}

/// Everything a report kind needs for one run.
pub struct ReportContext<'a> {
    pub provider: &'a dyn AnalyticsProvider,
    pub property_id: &'a str,
    pub interval: DateInterval,
    pub request: &'a ReportRequest,
}

impl ReportContext<'_> {
    pub fn preset(&self) -> Option<Preset> {
        self.request.preset
    }

    /// Base provider request for `interval` with the request filters
    /// already attached.
    pub fn provider_request(&self, interval: &DateInterval) -> ProviderRequest {
        ProviderRequest::new(self.property_id, interval)
            .filters(provider_filters(&self.request.filters))
    }
}

/// Maps request filter names onto provider dimension names. Unknown
/// names are dropped.
pub fn provider_filters(filters: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    filters
        .iter()
        .filter_map(|(name, value)| {
            let dimension = match name.as_str() {
                "country" => "countryId",
                "device_category" => "deviceCategory",
                "source" => "sessionSource",
                _ => return None,
            };
            Some((dimension.to_string(), value.clone()))
        })
        .collect()
}

/// Stable sort by a numeric key in the requested direction.
pub(crate) fn sort_rows<T>(rows: &mut [T], direction: SortDirection, key: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| {
        let ordering = key(a).total_cmp(&key(b));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Sum that pins at `i64::MAX` / `i64::MIN` instead of overflowing.
pub(crate) fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0i64, i64::saturating_add)
}

pub(crate) fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub(crate) fn share_pct(part: i64, whole: i64, places: u32) -> f64 {
    if whole > 0 {
        crate::format::round_to(part as f64 / whole as f64 * 100.0, places)
    } else {
        0.0
    }
}

pub struct ReportEngine {
    provider: Arc<dyn AnalyticsProvider>,
    cache: ReportCache,
    clock: Arc<dyn Clock>,
    property_id: String,
    default_days: u32,
}

impl ReportEngine {
    pub fn new(
        provider: Arc<dyn AnalyticsProvider>,
        cache: ReportCache,
        clock: Arc<dyn Clock>,
        property_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            cache,
            clock,
            property_id: property_id.into(),
            default_days: 30,
        }
    }

    pub fn with_default_days(mut self, days: u32) -> Self {
        self.default_days = days.max(1);
        self
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    /// Resolve the request's dates against today.
    pub fn resolve_interval(&self, request: &ReportRequest) -> Result<DateInterval, ValidationError> {
        DateRangeResolver::new(self.clock.today()).resolve(
            request.preset,
            request.start_date,
            request.end_date,
            self.default_days,
        )
    }

    /// Run one report. Only request validation can fail; provider
    /// problems come back as a fallback payload.
    pub async fn run(
        &self,
        kind: ReportKind,
        request: &ReportRequest,
    ) -> Result<ReportPayload, ValidationError> {
        let interval = self.resolve_interval(request)?;
        let key = ReportCache::generate_key(kind.slug(), &cache_params(request, &interval));
        let ctx = ReportContext {
            provider: self.provider.as_ref(),
            property_id: &self.property_id,
            interval,
            request,
        };

        let payload = match kind {
            ReportKind::KpiMetrics => ReportPayload::Kpi(
                self.cached(kind, &key, request.refresh_cache, kpi::fetch(&ctx), || {
                    kpi::fallback(&ctx)
                })
                .await,
            ),
            ReportKind::DailyChart => ReportPayload::DailyChart(
                self.cached(kind, &key, request.refresh_cache, daily_chart::fetch(&ctx), || {
                    daily_chart::fallback(&ctx)
                })
                .await,
            ),
            ReportKind::TrafficChart => ReportPayload::TrafficChart(
                self.cached(kind, &key, request.refresh_cache, traffic_chart::fetch(&ctx), || {
                    traffic_chart::fallback(&ctx)
                })
                .await,
            ),
            ReportKind::TrafficTable => ReportPayload::TrafficTable(
                self.cached(kind, &key, request.refresh_cache, traffic_table::fetch(&ctx), || {
                    traffic_table::fallback(&ctx)
                })
                .await,
            ),
            ReportKind::LandingPages => ReportPayload::LandingPages(
                self.cached(kind, &key, request.refresh_cache, landing_pages::fetch(&ctx), || {
                    landing_pages::fallback(&ctx)
                })
                .await,
            ),
        };

        Ok(payload)
    }

    async fn cached<T, Fut>(
        &self,
        kind: ReportKind,
        key: &str,
        refresh: bool,
        fetch: Fut,
        fallback: impl FnOnce() -> T,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match self.cache.try_remember(key, kind.ttl(), refresh, || fetch).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    report = kind.slug(),
                    property_id = %self.property_id,
                    error = %e,
                    "provider fetch failed, serving fallback"
                );
                fallback()
            }
        }
    }

    /// One-day, one-metric request against the provider. Used by the
    /// connection check.
    pub async fn test_connection(&self) -> Result<usize, ProviderError> {
        let yesterday = DateInterval::single_day(self.clock.today() - chrono::Duration::days(1));
        let request = ProviderRequest::new(&self.property_id, &yesterday)
            .metrics(&["sessions"])
            .limit(1);
        let response = self.provider.run_report(&request).await?;
        info!(property_id = %self.property_id, rows = response.rows.len(), "provider connection ok");
        Ok(response.rows.len())
    }
}

/// Everything that changes a payload goes into its cache key.
fn cache_params(request: &ReportRequest, interval: &DateInterval) -> Value {
    let summary = interval.summary();
    json!({
        "start_date": summary.start_date,
        "end_date": summary.end_date,
        "preset": request.preset.map(|p| p.as_str()),
        "page": request.page,
        "per_page": request.per_page,
        "sort_by": request.sort_by,
        "sort_direction": request.sort_direction,
        "filters": request.filters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_either_slug_style() {
        assert_eq!(ReportKind::parse("kpi-metrics"), Ok(ReportKind::KpiMetrics));
        assert_eq!(ReportKind::parse("landing_pages"), Ok(ReportKind::LandingPages));
        assert_eq!(ReportKind::parse(" Traffic-Table "), Ok(ReportKind::TrafficTable));
        assert_eq!(
            ReportKind::parse("funnels"),
            Err(ValidationError::UnknownReport("funnels".to_string()))
        );
    }

    #[test]
    fn traffic_table_expires_sooner() {
        assert_eq!(ReportKind::TrafficTable.ttl(), Duration::from_secs(1200));
        for kind in [
            ReportKind::KpiMetrics,
            ReportKind::DailyChart,
            ReportKind::TrafficChart,
            ReportKind::LandingPages,
        ] {
            assert_eq!(kind.ttl(), Duration::from_secs(1800));
        }
    }

    #[test]
    fn filters_map_to_provider_dimensions() {
        let mut filters = BTreeMap::new();
        filters.insert("country".to_string(), "DE".to_string());
        filters.insert("device_category".to_string(), "mobile".to_string());
        filters.insert("unknown".to_string(), "x".to_string());

        let mapped = provider_filters(&filters);
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped.get("countryId").map(String::as_str), Some("DE"));
        assert_eq!(mapped.get("deviceCategory").map(String::as_str), Some("mobile"));
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let mut rows = vec![(1, 5.0), (2, 9.0), (3, 5.0)];
        sort_rows(&mut rows, SortDirection::Desc, |r| r.1);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![2, 1, 3]);
        sort_rows(&mut rows, SortDirection::Asc, |r| r.1);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn share_and_average_handle_empty_input() {
        assert_eq!(share_pct(1, 0, 2), 0.0);
        assert_eq!(share_pct(1, 3, 2), 33.33);
        assert_eq!(average(std::iter::empty()), 0.0);
        assert_eq!(average([1.0, 2.0].into_iter()), 1.5);
    }

    #[test]
    fn cache_params_depend_on_pagination_and_filters() {
        let interval = DateInterval::single_day(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"),
        );
        let base = ReportRequest::default();
        let paged = ReportRequest {
            page: 2,
            ..ReportRequest::default()
        };
        let mut filtered = ReportRequest::default();
        filtered
            .filters
            .insert("country".to_string(), "DE".to_string());
        let refreshed = ReportRequest {
            refresh_cache: true,
            ..ReportRequest::default()
        };

        let key = |r: &ReportRequest| ReportCache::generate_key("t", &cache_params(r, &interval));
        assert_ne!(key(&base), key(&paged));
        assert_ne!(key(&base), key(&filtered));
        assert_eq!(key(&base), key(&refreshed));
    }
}
