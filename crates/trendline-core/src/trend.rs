//! Current-versus-previous trend computation.
//!
//! `is_positive` is strictly `change > 0`: an unchanged metric is never
//! reported as positive.

use serde::{Deserialize, Serialize};

use crate::format::{format_count, format_decimal, round_to, signed};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendMetric {
    pub current: String,
    pub relative_change: String,
    pub absolute_change: String,
    pub is_positive: bool,
}

impl TrendMetric {
    /// Zero-change trend used by fallback payloads.
    pub fn unchanged(current: impl Into<String>, absolute_change: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            relative_change: "+0.0%".to_string(),
            absolute_change: absolute_change.into(),
            is_positive: false,
        }
    }
}

/// Percentage change relative to `previous`; zero when there is no baseline.
pub fn relative_change_pct(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

fn format_relative(pct: f64) -> String {
    let rounded = round_to(pct, 1);
    format!("{}%", signed(format_decimal(rounded, 1), rounded >= 0.0))
}

/// Trend for a count metric (sessions, users).
pub fn trend(current: i64, previous: i64, formatted_current: impl Into<String>) -> TrendMetric {
    let change = current.saturating_sub(previous);
    TrendMetric {
        current: formatted_current.into(),
        relative_change: format_relative(relative_change_pct(current as f64, previous as f64)),
        absolute_change: signed(format_count(change), change >= 0),
        is_positive: change > 0,
    }
}

/// Trend for a metric that is already a percentage (bounce rate).
///
/// The absolute change is the percentage-point difference.
pub fn rate_trend(current_pct: f64, previous_pct: f64) -> TrendMetric {
    let change = round_to(current_pct - previous_pct, 2);
    TrendMetric {
        current: format!("{}%", format_decimal(current_pct, 2)),
        relative_change: format_relative(relative_change_pct(current_pct, previous_pct)),
        absolute_change: format!("{}%", signed(format_decimal(change, 2), change >= 0.0)),
        is_positive: change > 0.0,
    }
}

/// Trend for `mm:ss` / `hh:mm:ss` durations. Malformed input counts as zero.
pub fn duration_trend(current: &str, previous: &str) -> TrendMetric {
    let current_secs = i64::try_from(parse_duration(current)).unwrap_or(i64::MAX);
    let previous_secs = i64::try_from(parse_duration(previous)).unwrap_or(i64::MAX);
    let change = current_secs.saturating_sub(previous_secs);
    let magnitude = format_clock(change.unsigned_abs());

    TrendMetric {
        current: format_clock(current_secs.unsigned_abs()),
        relative_change: format_relative(relative_change_pct(
            current_secs as f64,
            previous_secs as f64,
        )),
        absolute_change: if change < 0 {
            format!("-{magnitude}")
        } else {
            format!("+{magnitude}")
        },
        is_positive: change > 0,
    }
}

/// Total seconds of an `mm:ss` or `hh:mm:ss` string, `0` when malformed.
pub fn parse_duration(raw: &str) -> u64 {
    let parts: Option<Vec<u64>> = raw
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect();

    let total = match parts.as_deref() {
        Some([minutes, seconds]) => minutes.checked_mul(60).and_then(|m| m.checked_add(*seconds)),
        Some([hours, minutes, seconds]) => hours
            .checked_mul(3600)
            .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(*seconds)),
        _ => None,
    };

    match total {
        Some(secs) => secs,
        None => {
            tracing::debug!(duration = raw, "unparsable duration treated as zero");
            0
        }
    }
}

/// Re-render any accepted duration string as zero-padded `hh:mm:ss`.
pub fn normalize_duration(raw: &str) -> String {
    format_clock(parse_duration(raw))
}

/// `3725` -> `"01:02:05"`.
pub fn format_clock(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Compact summary form: `65` -> `"1:05"`, `5` -> `"0:05"`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
