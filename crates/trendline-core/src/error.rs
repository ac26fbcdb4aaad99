use chrono::NaiveDate;
use thiserror::Error;

/// A report request that was rejected before any computation ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start date {start} must be on or before end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("start_date and end_date are required when preset is custom")]
    MissingCustomRange,

    #[error("custom date range cannot exceed {max_days} days")]
    RangeTooLarge { max_days: i64 },

    #[error("start date cannot be more than 1 year ago")]
    StartTooOld,

    #[error("end date cannot be in the future")]
    EndInFuture,

    #[error("invalid {field} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str },

    #[error("preset must be one of: today, yesterday, 7d, 30d, 90d, ytd, last_month, custom")]
    InvalidPreset,

    #[error("page must be an integer between 1 and {max}")]
    InvalidPage { max: u32 },

    #[error("per_page must be an integer between 1 and {max}")]
    InvalidPerPage { max: u32 },

    #[error("sort_by must be one of: sessions, users, pageviews, bounce_rate, avg_session_duration")]
    InvalidSortBy,

    #[error("sort_direction must be either asc or desc")]
    InvalidSortDirection,

    #[error("invalid filter {field}: {reason}")]
    InvalidFilter {
        field: &'static str,
        reason: &'static str,
    },

    #[error("refresh_cache must be a boolean")]
    InvalidRefreshCache,

    #[error("unsupported report type: {0}")]
    UnknownReport(String),
}

impl ValidationError {
    /// Name of the request field the rejection refers to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRange { .. } | Self::MissingCustomRange | Self::StartTooOld => {
                Some("start_date")
            }
            Self::RangeTooLarge { .. } | Self::EndInFuture => Some("end_date"),
            Self::InvalidDate { field } => Some(field),
            Self::InvalidPreset => Some("preset"),
            Self::InvalidPage { .. } => Some("page"),
            Self::InvalidPerPage { .. } => Some("per_page"),
            Self::InvalidSortBy => Some("sort_by"),
            Self::InvalidSortDirection => Some("sort_direction"),
            Self::InvalidFilter { field, .. } => Some(field),
            Self::InvalidRefreshCache => Some("refresh_cache"),
            Self::UnknownReport(_) => None,
        }
    }
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Failure talking to the external analytics provider.
///
/// Report kinds never let this escape; it is logged and turned into a
/// zero-valued payload of the same shape.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Decode(String),
}
