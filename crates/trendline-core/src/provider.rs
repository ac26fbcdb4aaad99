use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::date_range::DateInterval;
use crate::error::ProviderError;

/// One `runReport` call: a date window, the dimensions to group by and the
/// metrics to return, in positional order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRequest {
    pub property_id: String,
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub limit: Option<u32>,
    /// Exact-match filters keyed by provider dimension name.
    pub filters: BTreeMap<String, String>,
}

impl ProviderRequest {
    pub fn new(property_id: impl Into<String>, interval: &DateInterval) -> Self {
        let summary = interval.summary();
        Self {
            property_id: property_id.into(),
            start_date: summary.start_date,
            end_date: summary.end_date,
            dimensions: Vec::new(),
            metrics: Vec::new(),
            limit: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn dimensions(mut self, names: &[&str]) -> Self {
        self.dimensions = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn metrics(mut self, names: &[&str]) -> Self {
        self.metrics = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filters(mut self, filters: BTreeMap<String, String>) -> Self {
        self.filters = filters;
        self
    }
}

/// A positional result row. Values are strings exactly as the provider
/// returned them; interpretation belongs to the report kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<String>,
}

impl ProviderRow {
    pub fn new<D, M>(dimensions: D, metrics: M) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            dimension_values: dimensions.into_iter().map(Into::into).collect(),
            metric_values: metrics.into_iter().map(Into::into).collect(),
        }
    }

    /// Dimension at `index`, or `default` when absent or blank.
    pub fn dimension<'a>(&'a self, index: usize, default: &'a str) -> &'a str {
        match self.dimension_values.get(index).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        }
    }

    /// Integer metric at `index`. Missing or unparsable values read as 0;
    /// fractional values are truncated.
    pub fn metric_i64(&self, index: usize) -> i64 {
        let Some(raw) = self.metric_values.get(index) else {
            return 0;
        };
        raw.trim()
            .parse::<i64>()
            .ok()
            .or_else(|| raw.trim().parse::<f64>().ok().map(|v| v as i64))
            .unwrap_or(0)
    }

    /// Decimal metric at `index`. Missing or unparsable values read as 0.
    pub fn metric_f64(&self, index: usize) -> f64 {
        self.metric_values
            .get(index)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub rows: Vec<ProviderRow>,
}

impl ProviderResponse {
    pub fn new(rows: Vec<ProviderRow>) -> Self {
        Self { rows }
    }

    pub fn first(&self) -> Option<&ProviderRow> {
        self.rows.first()
    }
}

/// The external analytics data source.
///
/// Timeouts and retries are the implementation's concern; report kinds
/// treat any error as "no data" and fall back.
#[async_trait]
pub trait AnalyticsProvider: Send + Sync + 'static {
    async fn run_report(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, ProviderError>;
}
