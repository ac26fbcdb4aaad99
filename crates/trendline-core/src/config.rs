use std::time::Duration;

pub use chrono_tz::Tz;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Numeric property id, without the `properties/` prefix.
    pub property_id: String,
    pub access_token: String,
    pub api_base_url: String,
    pub cache_prefix: String,
    pub timezone: Tz,
    pub default_days: u32,
    pub request_timeout_ms: u64,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let property_id = non_empty("ANALYTICS_PROPERTY_ID")
            .ok_or(ConfigError::Missing("ANALYTICS_PROPERTY_ID"))
            .and_then(|raw| normalize_property_id(&raw))?;
        let access_token =
            non_empty("ANALYTICS_ACCESS_TOKEN").ok_or(ConfigError::Missing("ANALYTICS_ACCESS_TOKEN"))?;

        Ok(Self {
            port: parse_or("TRENDLINE_PORT", non_empty("TRENDLINE_PORT"), 3000)?,
            property_id,
            access_token: access_token.trim().to_string(),
            api_base_url: non_empty("ANALYTICS_API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            cache_prefix: lookup("ANALYTICS_CACHE_PREFIX")
                .unwrap_or_else(|| "analytics:".to_string()),
            timezone: match non_empty("ANALYTICS_TIMEZONE") {
                Some(raw) => raw.trim().parse::<Tz>().map_err(|e| ConfigError::Invalid {
                    name: "ANALYTICS_TIMEZONE",
                    reason: e.to_string(),
                })?,
                None => chrono_tz::UTC,
            },
            default_days: match parse_or("ANALYTICS_DEFAULT_DAYS", non_empty("ANALYTICS_DEFAULT_DAYS"), 30)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        name: "ANALYTICS_DEFAULT_DAYS",
                        reason: "must be at least 1".to_string(),
                    })
                }
                days => days,
            },
            request_timeout_ms: parse_or(
                "ANALYTICS_REQUEST_TIMEOUT_MS",
                non_empty("ANALYTICS_REQUEST_TIMEOUT_MS"),
                10_000,
            )?,
            cors_origins: non_empty("TRENDLINE_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Accepts `123456` or `properties/123456`.
fn normalize_property_id(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let id = trimmed.strip_prefix("properties/").unwrap_or(trimmed);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Invalid {
            name: "ANALYTICS_PROPERTY_ID",
            reason: format!("expected a numeric property id, got {trimmed:?}"),
        });
    }
    Ok(id.to_string())
}
