use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use trendline_core::config::Config;
use trendline_core::error::ProviderError;
use trendline_core::provider::{AnalyticsProvider, ProviderRequest, ProviderResponse, ProviderRow};

/// HTTP client for the analytics Data API.
///
/// Each report is a single `POST {base}/properties/{id}:runReport` with a
/// bearer token. Timeouts come from the client; there are no retries.
#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl DataApiClient {
    pub fn new(base_url: &str, access_token: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::new(&config.api_base_url, &config.access_token, client))
    }

    fn report_url(&self, property_id: &str) -> String {
        format!("{}/properties/{}:runReport", self.base_url, property_id)
    }
}

#[async_trait]
impl AnalyticsProvider for DataApiClient {
    async fn run_report(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = self.report_url(&request.property_id);
        debug!(
            url = %url,
            dimensions = ?request.dimensions,
            metrics = ?request.metrics,
            "runReport"
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&report_body(request))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RunReportResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(body.into())
    }
}

/// Request body in the Data API's camelCase shape.
pub fn report_body(request: &ProviderRequest) -> Value {
    let mut body = json!({
        "dateRanges": [{
            "startDate": request.start_date,
            "endDate": request.end_date,
        }],
        "dimensions": request.dimensions.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>(),
        "metrics": request.metrics.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>(),
    });

    if let Some(limit) = request.limit {
        body["limit"] = json!(limit);
    }
    if let Some(filter) = dimension_filter(&request.filters) {
        body["dimensionFilter"] = filter;
    }
    body
}

fn dimension_filter(filters: &BTreeMap<String, String>) -> Option<Value> {
    let mut expressions: Vec<Value> = filters
        .iter()
        .map(|(field, value)| {
            json!({
                "filter": {
                    "fieldName": field,
                    "stringFilter": { "matchType": "EXACT", "value": value }
                }
            })
        })
        .collect();

    match expressions.len() {
        0 => None,
        1 => expressions.pop(),
        _ => Some(json!({ "andGroup": { "expressions": expressions } })),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<RunReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRow {
    #[serde(default)]
    dimension_values: Vec<CellValue>,
    #[serde(default)]
    metric_values: Vec<CellValue>,
}

#[derive(Debug, Deserialize)]
struct CellValue {
    #[serde(default)]
    value: String,
}

impl From<RunReportResponse> for ProviderResponse {
    fn from(resp: RunReportResponse) -> Self {
        ProviderResponse::new(
            resp.rows
                .into_iter()
                .map(|row| {
                    ProviderRow::new(
                        row.dimension_values.into_iter().map(|c| c.value),
                        row.metric_values.into_iter().map(|c| c.value),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use trendline_core::date_range::DateInterval;

    use super::*;

    fn request() -> ProviderRequest {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).expect("date");
        ProviderRequest::new("123", &DateInterval::single_day(day))
            .dimensions(&["date"])
            .metrics(&["sessions", "totalUsers"])
    }

    #[test]
    fn body_uses_data_api_names() {
        let body = report_body(&request().limit(25));
        assert_eq!(body["dateRanges"][0]["startDate"], "2024-01-10");
        assert_eq!(body["dimensions"][0]["name"], "date");
        assert_eq!(body["metrics"][1]["name"], "totalUsers");
        assert_eq!(body["limit"], 25);
        assert!(body.get("dimensionFilter").is_none());
    }

    #[test]
    fn filters_become_exact_matches() {
        let mut filters = BTreeMap::new();
        filters.insert("countryId".to_string(), "DE".to_string());
        let body = report_body(&request().filters(filters.clone()));
        assert_eq!(body["dimensionFilter"]["filter"]["fieldName"], "countryId");
        assert_eq!(
            body["dimensionFilter"]["filter"]["stringFilter"]["matchType"],
            "EXACT"
        );

        filters.insert("deviceCategory".to_string(), "mobile".to_string());
        let body = report_body(&request().filters(filters));
        let expressions = &body["dimensionFilter"]["andGroup"]["expressions"];
        assert_eq!(expressions.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn response_rows_are_flattened() {
        let raw = json!({
            "rows": [
                {
                    "dimensionValues": [{ "value": "20240110" }],
                    "metricValues": [{ "value": "12" }, { "value": "9" }]
                }
            ],
            "rowCount": 1
        });
        let parsed: RunReportResponse = serde_json::from_value(raw).expect("parse");
        let response = ProviderResponse::from(parsed);
        assert_eq!(response.rows[0].dimension_values, vec!["20240110"]);
        assert_eq!(response.rows[0].metric_i64(1), 9);
    }

    #[test]
    fn missing_rows_mean_empty_report() {
        let parsed: RunReportResponse = serde_json::from_value(json!({})).expect("parse");
        assert!(ProviderResponse::from(parsed).rows.is_empty());
    }

    #[test]
    fn url_targets_property() {
        let client = DataApiClient::new("https://example.test/v1beta/", "t", Client::new());
        assert_eq!(
            client.report_url("42"),
            "https://example.test/v1beta/properties/42:runReport"
        );
    }
}
