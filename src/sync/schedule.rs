pub mod canonical;
pub mod date_exceptions;
pub mod time;
pub mod weekly_hours;

use crate::sync::schedule::{
    date_exceptions::DateExceptions,
    weekly_hours::WeeklyHours,
};

/// Both facets of one location's schedule as extracted from one system.
///
/// A facet is `None` when extraction failed; that is never the same thing
/// as an empty schedule.
#[derive(Debug, Clone, Default)]
pub struct LocationHours {
    pub weekly:     Option<WeeklyHours>,
    pub exceptions: Option<DateExceptions>,
}

impl LocationHours {
    pub fn weekly_display(&self, include_lunch_breaks: bool) -> String {
        self.weekly
            .as_ref()
            .map(|weekly| weekly.to_display_string(include_lunch_breaks))
            .unwrap_or_default()
    }

    pub fn exceptions_display(&self) -> String {
        self.exceptions
            .as_ref()
            .map(DateExceptions::to_display_string)
            .unwrap_or_default()
    }
}
