use {
    crate::sync::schedule::time::CalendarDate,
    thiserror::Error,
};

pub type Result<T> = std::result::Result<T, HoursError>;

/// Failures raised while building or serializing an hours model.
///
/// Construction errors are atomic: a constructor that returns one of these
/// never hands out a partially built collection.
#[derive(Debug, Error)]
pub enum HoursError {
    /// Malformed or inconsistent weekly period: unknown day name, missing
    /// time, or open time after close time.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Date exception whose start date is after its end date.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: CalendarDate,
        end:   CalendarDate,
    },

    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("could not serialize canonical form: {0}")]
    Serialization(#[from] serde_json::Error),
}
