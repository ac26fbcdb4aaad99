pub mod cache;
pub mod clock;
pub mod config;
pub mod date_range;
pub mod error;
pub mod format;
pub mod pagination;
pub mod provider;
pub mod reports;
pub mod request;
pub mod timeseries;
pub mod trend;
