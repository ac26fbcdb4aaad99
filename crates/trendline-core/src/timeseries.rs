use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::{DateInterval, Preset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub users: i64,
    pub sessions: i64,
    pub page_views: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sessions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_date: Option<String>,
}

impl TimeSeriesPoint {
    pub fn new(date: impl Into<String>, users: i64, sessions: i64, page_views: i64) -> Self {
        Self {
            date: date.into(),
            users,
            sessions,
            page_views,
            previous_sessions: None,
            previous_date: None,
        }
    }

    pub fn zero(day: NaiveDate) -> Self {
        Self::new(day.format("%Y-%m-%d").to_string(), 0, 0, 0)
    }

    fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// Shape a fetched daily series for charting.
///
/// * non-custom presets drop rows outside `interval`;
/// * `custom` gap-fills every missing day with a zero point;
/// * `ytd` additionally extends the series with zero points up to the
///   interval end (Dec 31);
/// * the result is always sorted by date.
pub fn normalize(
    raw: Vec<TimeSeriesPoint>,
    interval: &DateInterval,
    preset: Option<Preset>,
) -> Vec<TimeSeriesPoint> {
    let mut points = if preset == Some(Preset::Custom) {
        fill_missing_days(raw, interval)
    } else {
        raw.into_iter()
            .filter(|p| p.day().is_some_and(|d| interval.contains(d)))
            .collect()
    };

    points.sort_by(|a, b| a.date.cmp(&b.date));

    if preset == Some(Preset::YearToDate) {
        extend_to_interval_end(&mut points, interval);
    }

    points
}

fn fill_missing_days(raw: Vec<TimeSeriesPoint>, interval: &DateInterval) -> Vec<TimeSeriesPoint> {
    let mut by_date: HashMap<String, TimeSeriesPoint> = HashMap::with_capacity(raw.len());
    for point in raw {
        // First occurrence wins.
        by_date.entry(point.date.clone()).or_insert(point);
    }

    interval
        .days()
        .map(|day| {
            let key = day.format("%Y-%m-%d").to_string();
            by_date
                .remove(&key)
                .unwrap_or_else(|| TimeSeriesPoint::zero(day))
        })
        .collect()
}

fn extend_to_interval_end(points: &mut Vec<TimeSeriesPoint>, interval: &DateInterval) {
    let Some(last) = points.last().and_then(TimeSeriesPoint::day) else {
        return;
    };
    let mut day = last.succ_opt();
    while let Some(d) = day.filter(|d| *d <= interval.end()) {
        points.push(TimeSeriesPoint::zero(d));
        day = d.succ_opt();
    }
}

/// Attach the previous-period series to the current one, position by
/// position, as `previous_sessions` / `previous_date`.
pub fn align_previous(current: &mut [TimeSeriesPoint], previous: &[TimeSeriesPoint]) {
    for (point, prev) in current.iter_mut().zip(previous) {
        point.previous_sessions = Some(prev.sessions);
        point.previous_date = Some(prev.date.clone());
    }
}

/// Provider day keys arrive as `YYYYMMDD`; anything else passes through.
pub fn provider_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn interval(start: NaiveDate, end: NaiveDate) -> DateInterval {
        DateInterval::new(start, end).expect("interval")
    }

    #[test]
    fn custom_range_is_gap_filled_and_sorted() {
        let range = interval(date(2024, 3, 1), date(2024, 3, 7));
        let raw = vec![
            TimeSeriesPoint::new("2024-03-05", 5, 6, 7),
            TimeSeriesPoint::new("2024-03-02", 2, 3, 4),
            TimeSeriesPoint::new("2024-03-07", 1, 1, 1),
        ];

        let out = normalize(raw, &range, Some(Preset::Custom));
        assert_eq!(out.len(), 7);
        let dates: Vec<&str> = out.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-03-01",
                "2024-03-02",
                "2024-03-03",
                "2024-03-04",
                "2024-03-05",
                "2024-03-06",
                "2024-03-07"
            ]
        );
        let zeros = out.iter().filter(|p| p.sessions == 0 && p.users == 0).count();
        assert_eq!(zeros, 4);
        assert_eq!(out[1], TimeSeriesPoint::new("2024-03-02", 2, 3, 4));
    }

    #[test]
    fn preset_range_discards_rows_outside_interval() {
        let range = interval(date(2024, 1, 4), date(2024, 1, 10));
        let raw = vec![
            TimeSeriesPoint::new("2024-01-11", 9, 9, 9),
            TimeSeriesPoint::new("2024-01-05", 1, 2, 3),
            TimeSeriesPoint::new("2024-01-03", 9, 9, 9),
            TimeSeriesPoint::new("2024-01-04", 1, 1, 1),
            TimeSeriesPoint::new("not-a-date", 9, 9, 9),
        ];

        let out = normalize(raw, &range, Some(Preset::Last7Days));
        let dates: Vec<&str> = out.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-04", "2024-01-05"]);
    }

    #[test]
    fn ytd_extends_with_zero_days_to_year_end() {
        let range = interval(date(2024, 1, 1), date(2024, 12, 31));
        let raw = vec![
            TimeSeriesPoint::new("2024-12-28", 3, 3, 3),
            TimeSeriesPoint::new("2024-12-27", 2, 2, 2),
        ];

        let out = normalize(raw, &range, Some(Preset::YearToDate));
        let dates: Vec<&str> = out.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-12-27",
                "2024-12-28",
                "2024-12-29",
                "2024-12-30",
                "2024-12-31"
            ]
        );
        assert!(out[2..].iter().all(|p| p.sessions == 0 && p.page_views == 0));
    }

    #[test]
    fn ytd_with_no_rows_stays_empty() {
        let range = interval(date(2024, 1, 1), date(2024, 12, 31));
        assert!(normalize(Vec::new(), &range, Some(Preset::YearToDate)).is_empty());
    }

    #[test]
    fn alignment_pairs_by_position() {
        let mut current = vec![
            TimeSeriesPoint::new("2024-01-04", 1, 10, 1),
            TimeSeriesPoint::new("2024-01-05", 1, 20, 1),
        ];
        let previous = vec![TimeSeriesPoint::new("2023-12-28", 1, 7, 1)];

        align_previous(&mut current, &previous);
        assert_eq!(current[0].previous_sessions, Some(7));
        assert_eq!(current[0].previous_date.as_deref(), Some("2023-12-28"));
        assert_eq!(current[1].previous_sessions, None);
    }

    #[test]
    fn provider_dates_are_dashed() {
        assert_eq!(provider_date("20240105"), "2024-01-05");
        assert_eq!(provider_date("2024-01-05"), "2024-01-05");
    }
}
