use std::sync::Arc;
use std::time::Duration;

use trendline_core::cache::{CacheStore, MemoryCacheStore, ReportCache};
use trendline_core::clock::{Clock, SystemClock};
use trendline_core::config::Config;
use trendline_core::provider::AnalyticsProvider;
use trendline_core::reports::ReportEngine;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    pub engine: ReportEngine,

    /// Handle on the in-process store so the server can purge expired
    /// entries in the background.
    pub store: Arc<MemoryCacheStore>,
}

impl AppState {
    /// Wire the engine with an in-memory cache and the wall clock in the
    /// configured timezone.
    pub fn new(config: Config, provider: Arc<dyn AnalyticsProvider>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone));
        Self::with_clock(config, provider, clock)
    }

    pub fn with_clock(
        config: Config,
        provider: Arc<dyn AnalyticsProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ReportCache::new(
            Arc::clone(&store) as Arc<dyn CacheStore>,
            config.cache_prefix.clone(),
        );
        let engine = ReportEngine::new(provider, cache, clock, config.property_id.clone())
            .with_default_days(config.default_days);

        Self {
            config: Arc::new(config),
            engine,
            store,
        }
    }

    /// Periodically drop expired cache entries. Reads already skip them;
    /// this only bounds memory.
    pub async fn run_cache_purge_loop(&self, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = self.store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "expired cache entries purged");
            }
        }
    }
}
