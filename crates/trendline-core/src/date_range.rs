//! Preset resolution and previous-period derivation.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest span (end - start, in days) accepted for a custom range.
pub const MAX_CUSTOM_RANGE_DAYS: i64 = 365;

/// Inclusive calendar-day interval. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Every day of the interval in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn summary(&self) -> DateRangeSummary {
        DateRangeSummary {
            start_date: self.start.format("%Y-%m-%d").to_string(),
            end_date: self.end.format("%Y-%m-%d").to_string(),
            days: self.day_count(),
        }
    }
}

/// Serialized form of an interval as it appears in report payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeSummary {
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "last_month")]
    LastMonth,
    #[serde(rename = "custom")]
    Custom,
}

impl Preset {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "7d" => Some(Self::Last7Days),
            "30d" => Some(Self::Last30Days),
            "90d" => Some(Self::Last90Days),
            "ytd" => Some(Self::YearToDate),
            "last_month" => Some(Self::LastMonth),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
            Self::YearToDate => "ytd",
            Self::LastMonth => "last_month",
            Self::Custom => "custom",
        }
    }
}

/// Turns presets or explicit bounds into a concrete [`DateInterval`],
/// relative to a fixed `today`.
#[derive(Debug, Clone, Copy)]
pub struct DateRangeResolver {
    today: NaiveDate,
}

impl DateRangeResolver {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn resolve(
        &self,
        preset: Option<Preset>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        default_days: u32,
    ) -> Result<DateInterval, ValidationError> {
        let today = self.today;
        let Some(preset) = preset else {
            return match (start, end) {
                (Some(start), Some(end)) => DateInterval::new(start, end),
                _ => Ok(self.trailing_days(default_days)),
            };
        };

        match preset {
            Preset::Today => Ok(DateInterval::single_day(today)),
            Preset::Yesterday => Ok(DateInterval::single_day(today - Duration::days(1))),
            Preset::Last7Days => Ok(self.trailing_days(7)),
            Preset::Last30Days => Ok(self.trailing_days(30)),
            Preset::Last90Days => Ok(self.trailing_days(90)),
            Preset::YearToDate => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                DateInterval::new(start, end)
            }
            Preset::LastMonth => {
                let this_month = today.with_day(1).unwrap_or(today);
                let end = this_month - Duration::days(1);
                let start = end.with_day(1).unwrap_or(end);
                DateInterval::new(start, end)
            }
            Preset::Custom => self.custom(start, end),
        }
    }

    /// Like [`resolve`](Self::resolve) but takes the raw preset token;
    /// unrecognised tokens fall back to the default trailing range.
    pub fn resolve_token(
        &self,
        preset: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        default_days: u32,
    ) -> Result<DateInterval, ValidationError> {
        match preset.filter(|p| !p.trim().is_empty()) {
            None => self.resolve(None, start, end, default_days),
            Some(raw) => match Preset::parse(raw) {
                Some(preset) => self.resolve(Some(preset), start, end, default_days),
                None => Ok(self.trailing_days(default_days)),
            },
        }
    }

    fn custom(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DateInterval, ValidationError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(ValidationError::MissingCustomRange);
        };
        let interval = DateInterval::new(start, end)?;

        if (end - start).num_days() > MAX_CUSTOM_RANGE_DAYS {
            return Err(ValidationError::RangeTooLarge {
                max_days: MAX_CUSTOM_RANGE_DAYS,
            });
        }
        if start < shift_back_one_year(self.today) {
            return Err(ValidationError::StartTooOld);
        }
        if end > self.today {
            return Err(ValidationError::EndInFuture);
        }
        Ok(interval)
    }

    fn trailing_days(&self, days: u32) -> DateInterval {
        let span = i64::from(days.max(1)) - 1;
        DateInterval {
            start: self.today - Duration::days(span),
            end: self.today,
        }
    }
}

/// Same month/day one calendar year earlier. Feb 29 clamps to Feb 28.
pub fn shift_back_one_year(day: NaiveDate) -> NaiveDate {
    day.checked_sub_months(Months::new(12))
        .unwrap_or(day - Duration::days(365))
}

/// The interval a report is compared against.
///
/// Single days compare with the day before; `ytd` compares with the same
/// calendar span one year earlier; everything else compares with the
/// immediately preceding span of equal length.
pub fn previous_period(current: &DateInterval, preset: Option<Preset>) -> DateInterval {
    if current.is_single_day() {
        return DateInterval::single_day(current.start - Duration::days(1));
    }

    if preset == Some(Preset::YearToDate) {
        return DateInterval {
            start: shift_back_one_year(current.start),
            end: shift_back_one_year(current.end),
        };
    }

    let end = current.start - Duration::days(1);
    let start = end - Duration::days(current.day_count() - 1);
    DateInterval { start, end }
}

/// Human label for the comparison interval, e.g. `"Dec 28 - Jan 3"`.
pub fn previous_period_label(current: &DateInterval, preset: Option<Preset>) -> String {
    if current.is_single_day() {
        return "Previous day".to_string();
    }
    if preset == Some(Preset::YearToDate) {
        return "Previous year".to_string();
    }

    let previous = previous_period(current, preset);
    let start = short_date(previous.start);
    let end = short_date(previous.end);
    if start == end {
        start
    } else {
        format!("{start} - {end}")
    }
}

fn short_date(day: NaiveDate) -> String {
    day.format("%b %-d").to_string()
}
