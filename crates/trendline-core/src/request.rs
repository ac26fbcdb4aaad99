use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::Preset;
use crate::error::ValidationError;

pub const MAX_PAGE: u32 = 1000;
pub const MAX_PER_PAGE: u32 = 100;
pub const DEFAULT_PER_PAGE: u32 = 10;

const MAX_SOURCE_LEN: usize = 255;
const DEVICE_CATEGORIES: [&str; 3] = ["mobile", "desktop", "tablet"];

/// Raw report parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub preset: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub filter_country: Option<String>,
    pub filter_device_category: Option<String>,
    pub filter_source: Option<String>,
    pub refresh_cache: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Sessions,
    Users,
    Pageviews,
    BounceRate,
    AvgSessionDuration,
}

impl SortBy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "sessions" => Some(Self::Sessions),
            "users" => Some(Self::Users),
            "pageviews" => Some(Self::Pageviews),
            "bounce_rate" => Some(Self::BounceRate),
            "avg_session_duration" => Some(Self::AvgSessionDuration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// A validated report request. Date bounds are only kept for `custom` or
/// when no preset was given; range rules that depend on "today" are
/// applied later by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub preset: Option<Preset>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
    /// `country`, `device_category` and/or `source`.
    pub filters: BTreeMap<String, String>,
    pub refresh_cache: bool,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            preset: None,
            start_date: None,
            end_date: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortBy::default(),
            sort_direction: SortDirection::default(),
            filters: BTreeMap::new(),
            refresh_cache: false,
        }
    }
}

impl ReportRequest {
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            preset: Some(Preset::Custom),
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        }
    }
}

impl TryFrom<ReportQuery> for ReportRequest {
    type Error = ValidationError;

    fn try_from(query: ReportQuery) -> Result<Self, Self::Error> {
        let preset = match non_blank(&query.preset) {
            None => None,
            Some(raw) => Some(Preset::parse(raw).ok_or(ValidationError::InvalidPreset)?),
        };

        let keep_dates = matches!(preset, None | Some(Preset::Custom));
        let (start_date, end_date) = if keep_dates {
            (
                parse_date(&query.start_date, "start_date")?,
                parse_date(&query.end_date, "end_date")?,
            )
        } else {
            (None, None)
        };

        let page = parse_bounded(&query.page, 1, MAX_PAGE)
            .map_err(|_| ValidationError::InvalidPage { max: MAX_PAGE })?
            .unwrap_or(1);
        let per_page = parse_bounded(&query.per_page, 1, MAX_PER_PAGE)
            .map_err(|_| ValidationError::InvalidPerPage { max: MAX_PER_PAGE })?
            .unwrap_or(DEFAULT_PER_PAGE);

        let sort_by = match non_blank(&query.sort_by) {
            None => SortBy::default(),
            Some(raw) => SortBy::parse(raw).ok_or(ValidationError::InvalidSortBy)?,
        };
        let sort_direction = match non_blank(&query.sort_direction) {
            None => SortDirection::default(),
            Some(raw) => SortDirection::parse(raw).ok_or(ValidationError::InvalidSortDirection)?,
        };

        let mut filters = BTreeMap::new();
        if let Some(country) = non_blank(&query.filter_country) {
            if country.chars().count() > 2 {
                return Err(ValidationError::InvalidFilter {
                    field: "filter_country",
                    reason: "must be a 2-character ISO code",
                });
            }
            filters.insert("country".to_string(), country.to_string());
        }
        if let Some(device) = non_blank(&query.filter_device_category) {
            if !DEVICE_CATEGORIES.contains(&device) {
                return Err(ValidationError::InvalidFilter {
                    field: "filter_device_category",
                    reason: "must be one of: mobile, desktop, tablet",
                });
            }
            filters.insert("device_category".to_string(), device.to_string());
        }
        if let Some(source) = non_blank(&query.filter_source) {
            if source.chars().count() > MAX_SOURCE_LEN {
                return Err(ValidationError::InvalidFilter {
                    field: "filter_source",
                    reason: "cannot exceed 255 characters",
                });
            }
            filters.insert("source".to_string(), source.to_string());
        }

        let refresh_cache = match non_blank(&query.refresh_cache) {
            None => false,
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            Some(_) => return Err(ValidationError::InvalidRefreshCache),
        };

        Ok(Self {
            preset,
            start_date,
            end_date,
            page,
            per_page,
            sort_by,
            sort_direction,
            filters,
            refresh_cache,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<NaiveDate>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate { field })
        })
        .transpose()
}

fn parse_bounded(value: &Option<String>, min: u32, max: u32) -> Result<Option<u32>, ()> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (min..=max).contains(&n) => Ok(Some(n)),
            _ => Err(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ReportQuery {
        ReportQuery::default()
    }

    #[test]
    fn defaults_when_nothing_is_supplied() {
        let req = ReportRequest::try_from(query()).expect("valid");
        assert_eq!(req, ReportRequest::default());
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 10);
        assert_eq!(req.sort_by, SortBy::Sessions);
        assert_eq!(req.sort_direction, SortDirection::Desc);
    }

    #[test]
    fn preset_is_trimmed_and_checked() {
        let req = ReportRequest::try_from(ReportQuery {
            preset: Some(" 7d ".into()),
            ..query()
        })
        .expect("valid");
        assert_eq!(req.preset, Some(Preset::Last7Days));

        let err = ReportRequest::try_from(ReportQuery {
            preset: Some("fortnight".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err, ValidationError::InvalidPreset);
    }

    #[test]
    fn non_custom_preset_discards_dates() {
        let req = ReportRequest::try_from(ReportQuery {
            preset: Some("30d".into()),
            start_date: Some("not a date".into()),
            end_date: Some("2024-01-10".into()),
            ..query()
        })
        .expect("valid");
        assert_eq!(req.start_date, None);
        assert_eq!(req.end_date, None);
    }

    #[test]
    fn custom_dates_must_be_iso() {
        let err = ReportRequest::try_from(ReportQuery {
            preset: Some("custom".into()),
            start_date: Some("01/04/2024".into()),
            end_date: Some("2024-01-10".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err, ValidationError::InvalidDate { field: "start_date" });
        assert_eq!(err.field(), Some("start_date"));
    }

    #[test]
    fn pagination_bounds() {
        for (page, ok) in [("0", false), ("1", true), ("1000", true), ("1001", false), ("x", false)] {
            let result = ReportRequest::try_from(ReportQuery {
                page: Some(page.into()),
                ..query()
            });
            assert_eq!(result.is_ok(), ok, "page={page}");
        }
        let err = ReportRequest::try_from(ReportQuery {
            per_page: Some("101".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err, ValidationError::InvalidPerPage { max: 100 });
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        let req = ReportRequest::try_from(ReportQuery {
            sort_by: Some("bounce_rate".into()),
            sort_direction: Some(" ASC".into()),
            ..query()
        })
        .expect("valid");
        assert_eq!(req.sort_by, SortBy::BounceRate);
        assert_eq!(req.sort_direction, SortDirection::Asc);

        let err = ReportRequest::try_from(ReportQuery {
            sort_by: Some("revenue".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err, ValidationError::InvalidSortBy);
    }

    #[test]
    fn filters_are_validated() {
        let req = ReportRequest::try_from(ReportQuery {
            filter_country: Some("DE".into()),
            filter_device_category: Some("mobile".into()),
            filter_source: Some("google".into()),
            ..query()
        })
        .expect("valid");
        assert_eq!(req.filters.get("country").map(String::as_str), Some("DE"));
        assert_eq!(req.filters.len(), 3);

        let err = ReportRequest::try_from(ReportQuery {
            filter_country: Some("DEU".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err.field(), Some("filter_country"));

        let err = ReportRequest::try_from(ReportQuery {
            filter_device_category: Some("watch".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err.field(), Some("filter_device_category"));

        let err = ReportRequest::try_from(ReportQuery {
            filter_source: Some("s".repeat(256)),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err.field(), Some("filter_source"));
    }

    #[test]
    fn refresh_cache_accepts_boolean_forms() {
        for (raw, expected) in [("true", true), ("1", true), ("false", false), ("0", false)] {
            let req = ReportRequest::try_from(ReportQuery {
                refresh_cache: Some(raw.into()),
                ..query()
            })
            .expect("valid");
            assert_eq!(req.refresh_cache, expected);
        }
        let err = ReportRequest::try_from(ReportQuery {
            refresh_cache: Some("yes".into()),
            ..query()
        })
        .expect_err("invalid");
        assert_eq!(err, ValidationError::InvalidRefreshCache);
    }
}
