//! Date-bound exceptions to the weekly schedule (holidays, special openings).

use {
    super::{
        canonical::Canonical,
        time::{
            CalendarDate,
            RawTime,
            TimeOfDay,
        },
    },
    crate::sync::error::{
        HoursError,
        Result,
    },
    chrono::NaiveDate,
    serde::{
        Deserialize,
        Serialize,
    },
    std::fmt,
};

/// A validated calendar-bound override: either closed for a date range, or
/// open for a date range with an optional time window of its own.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatedException {
    start_date: CalendarDate,
    end_date:   CalendarDate,
    closed:     bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_time:  Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    close_time: Option<TimeOfDay>,
}

/// One entry of a `DateExceptions` collection.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DateException {
    Dated(DatedException),
    /// A record with an unresolved (year 0) date, serialized exactly as the
    /// upstream sent it.
    Unresolved(RawDateException),
}

type SortKey = (
    CalendarDate,
    TimeOfDay,
    CalendarDate,
    bool,
    Option<TimeOfDay>,
    Option<TimeOfDay>,
);

impl DateException {
    pub fn start_date(&self) -> CalendarDate {
        match self {
            Self::Dated(dated) => dated.start_date,
            Self::Unresolved(raw) => raw.start_date.unwrap_or_default(),
        }
    }

    /// For unresolved records without an end date this is the start date.
    pub fn end_date(&self) -> CalendarDate {
        match self {
            Self::Dated(dated) => dated.end_date,
            Self::Unresolved(raw) => raw.end_date.unwrap_or_else(|| self.start_date()),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Dated(dated) => dated.closed,
            Self::Unresolved(raw) => raw.closed.unwrap_or(false),
        }
    }

    pub fn open_time(&self) -> Option<TimeOfDay> {
        match self {
            Self::Dated(dated) => dated.open_time,
            Self::Unresolved(raw) => raw.open_time.and_then(|time| time.to_time_of_day().ok()),
        }
    }

    pub fn close_time(&self) -> Option<TimeOfDay> {
        match self {
            Self::Dated(dated) => dated.close_time,
            Self::Unresolved(raw) => raw.close_time.and_then(|time| time.to_time_of_day().ok()),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    /// Start date, then open time with a missing time counting as midnight.
    /// The remaining fields only break ties so that the order is total.
    fn sort_key(&self) -> SortKey {
        (
            self.start_date(),
            self.open_time().unwrap_or(TimeOfDay::MIDNIGHT),
            self.end_date(),
            self.is_closed(),
            self.open_time(),
            self.close_time(),
        )
    }

    fn closed_label(&self) -> String {
        let (start, end) = (self.start_date(), self.end_date());
        if start == end {
            start.month_day_label()
        } else {
            format!("{}-{}", start.month_day_label(), end.month_day_label())
        }
    }

    fn open_label(&self) -> String {
        match (self.open_time(), self.close_time()) {
            (Some(open), Some(close)) => {
                format!("{} {open}-{close}", self.start_date().day_month_label())
            }
            _ => self.start_date().day_month_label(),
        }
    }
}

/// A special-hours period as the listing API reports it. Absent fields stay
/// absent when serialized again.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDateException {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<CalendarDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date:   Option<CalendarDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed:     Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_time:  Option<RawTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<RawTime>,
}

/// A location's forward-looking set of date exceptions.
///
/// The collection is evaluated against a fixed `today`: exceptions that
/// ended before it are dropped on insertion. Like `WeeklyHours` it is a
/// multiset whose insertion order is irrelevant.
#[derive(Clone, Debug)]
pub struct DateExceptions {
    today:      NaiveDate,
    exceptions: Vec<DateException>,
}

impl DateExceptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            exceptions: vec![],
        }
    }

    /// Builds the collection from raw upstream periods. Records carrying a
    /// year-0 date are kept verbatim; any other invalid record fails the
    /// whole construction.
    pub fn from_raw<'a>(
        raw: impl IntoIterator<Item = &'a RawDateException>,
        today: NaiveDate,
    ) -> Result<Self> {
        let mut exceptions = Self::new(today);
        for record in raw {
            exceptions.add_raw(record)?;
        }
        Ok(exceptions)
    }

    fn add_raw(&mut self, raw: &RawDateException) -> Result<()> {
        let start = raw
            .start_date
            .ok_or_else(|| HoursError::InvalidDate("start date is required".to_string()))?;

        if start.is_sentinel() || raw.end_date.is_some_and(|end| end.is_sentinel()) {
            self.exceptions.push(DateException::Unresolved(raw.clone()));
            return Ok(());
        }

        let start_date = to_naive(start)?;
        let end_date = raw.end_date.map(to_naive).transpose()?;
        let open_time = raw
            .open_time
            .as_ref()
            .map(RawTime::to_time_of_day)
            .transpose()?;
        let close_time = raw
            .close_time
            .as_ref()
            .map(RawTime::to_time_of_day)
            .transpose()?;

        self.add_period(
            !raw.closed.unwrap_or(false),
            start_date,
            end_date,
            open_time,
            close_time,
        )
    }

    /// Validates and appends an exception.
    ///
    /// `end_date` defaults to `start_date`. An exception that ended before
    /// today is silently ignored. Closed exceptions never carry times; open
    /// ones keep whichever times were given.
    pub fn add_period(
        &mut self,
        is_open: bool,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        open_time: Option<TimeOfDay>,
        close_time: Option<TimeOfDay>,
    ) -> Result<()> {
        let end_date = end_date.unwrap_or(start_date);

        if end_date < self.today {
            tracing::trace!(%start_date, %end_date, today = %self.today, "Ignoring expired date exception.");
            return Ok(());
        }

        if start_date > end_date {
            return Err(HoursError::InvalidDateRange {
                start: start_date.into(),
                end:   end_date.into(),
            });
        }

        let exception = if is_open {
            if let (Some(open), Some(close)) = (open_time, close_time) {
                if open > close {
                    return Err(HoursError::InvalidPeriod(format!(
                        "{start_date} opens at {open} after closing at {close}"
                    )));
                }
            }
            DatedException {
                start_date: start_date.into(),
                end_date: end_date.into(),
                closed: false,
                open_time,
                close_time,
            }
        } else {
            DatedException {
                start_date: start_date.into(),
                end_date:   end_date.into(),
                closed:     true,
                open_time:  None,
                close_time: None,
            }
        };

        self.exceptions.push(DateException::Dated(exception));
        Ok(())
    }

    pub fn add_closed_day(&mut self, date: NaiveDate) -> Result<()> {
        self.add_period(false, date, None, None, None)
    }

    pub fn add_open_day(&mut self, date: NaiveDate) -> Result<()> {
        self.add_period(true, date, None, None, None)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Exceptions in canonical order.
    pub fn periods(&self) -> Vec<DateException> {
        let mut exceptions = self.exceptions.clone();
        exceptions.sort_by_key(DateException::sort_key);
        exceptions
    }

    pub fn len(&self) -> usize {
        self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    /// Renders e.g. `Closed: Aug 25-Aug 27, Dec 25. Open: 24 Dec 10:00-14:00.`
    ///
    /// Closed days on consecutive calendar dates are merged into ranges;
    /// open entries are listed one per exception.
    pub fn to_display_string(&self) -> String {
        let periods = self.periods();
        let (closed, open): (Vec<&DateException>, Vec<&DateException>) =
            periods.iter().partition(|exception| exception.is_closed());

        let mut clauses = Vec::with_capacity(2);

        let closed_ranges = merge_closed_ranges(&closed);
        if !closed_ranges.is_empty() {
            clauses.push(format!("Closed: {}.", closed_ranges.join(", ")));
        }

        let open_entries: Vec<String> = open.iter().map(|exception| exception.open_label()).collect();
        if !open_entries.is_empty() {
            clauses.push(format!("Open: {}.", open_entries.join(", ")));
        }

        clauses.join(" ").trim().to_string()
    }
}

fn to_naive(date: CalendarDate) -> Result<NaiveDate> {
    date.to_naive()
        .ok_or_else(|| HoursError::InvalidDate(format!("{date} is not a calendar date")))
}

fn merge_closed_ranges(closed: &[&DateException]) -> Vec<String> {
    let mut sorted = closed.to_vec();
    sorted.sort_by_key(|exception| (exception.start_date(), exception.end_date()));

    let mut seen: Vec<String> = Vec::new();
    let mut ranges: Vec<(CalendarDate, CalendarDate)> = Vec::new();
    for exception in sorted {
        let label = exception.closed_label();
        if seen.contains(&label) {
            continue;
        }
        seen.push(label);

        match ranges.last_mut() {
            Some((_, end)) if end.next_day() == Some(exception.start_date()) => {
                *end = exception.end_date();
            }
            _ => ranges.push((exception.start_date(), exception.end_date())),
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.month_day_label()
            } else {
                format!("{}-{}", start.month_day_label(), end.month_day_label())
            }
        })
        .collect()
}

impl Canonical for DateExceptions {
    type Item = DateException;

    fn canonical_items(&self) -> Vec<DateException> {
        self.periods()
    }
}

impl fmt::Display for DateExceptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn t(hours: u32, minutes: u32) -> TimeOfDay {
        TimeOfDay::new(hours, minutes).unwrap()
    }

    fn raw_date(year: i32, month: u32, day: u32) -> CalendarDate {
        CalendarDate { year, month, day }
    }

    #[test]
    fn test_past_exceptions_are_dropped() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        exceptions.add_closed_day(date(7, 31))?;
        exceptions.add_period(true, date(7, 1), Some(date(7, 31)), Some(t(10, 0)), Some(t(14, 0)))?;
        assert!(exceptions.is_empty());

        // Started in the past but still running
        exceptions.add_period(false, date(7, 30), Some(date(8, 2)), None, None)?;
        // Ends today
        exceptions.add_closed_day(today())?;
        assert_eq!(exceptions.len(), 2);
        Ok(())
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let mut exceptions = DateExceptions::new(today());
        let err = exceptions
            .add_period(false, date(8, 10), Some(date(8, 5)), None, None)
            .unwrap_err();
        assert!(matches!(err, HoursError::InvalidDateRange { .. }));
        assert!(exceptions.is_empty());

        // Expiry is checked first, so an inverted range in the past is ignored
        assert!(
            exceptions
                .add_period(false, date(7, 10), Some(date(7, 5)), None, None)
                .is_ok()
        );
    }

    #[test]
    fn test_open_exception_times() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        let err = exceptions
            .add_period(true, date(12, 24), None, Some(t(14, 0)), Some(t(10, 0)))
            .unwrap_err();
        assert!(matches!(err, HoursError::InvalidPeriod(_)));

        exceptions.add_period(true, date(12, 24), None, Some(t(10, 0)), None)?;
        exceptions.add_open_day(date(12, 31))?;
        assert_eq!(
            exceptions.canonical_json()?,
            concat!(
                r#"[{"startDate":{"year":2026,"month":12,"day":24},"endDate":{"year":2026,"month":12,"day":24},"closed":false,"openTime":{"hours":10}},"#,
                r#"{"startDate":{"year":2026,"month":12,"day":31},"endDate":{"year":2026,"month":12,"day":31},"closed":false}]"#,
            )
        );
        Ok(())
    }

    #[test]
    fn test_closed_exceptions_never_carry_times() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        exceptions.add_period(false, date(8, 25), None, Some(t(10, 0)), Some(t(12, 0)))?;
        assert_eq!(
            exceptions.canonical_json()?,
            r#"[{"startDate":{"year":2026,"month":8,"day":25},"endDate":{"year":2026,"month":8,"day":25},"closed":true}]"#
        );
        Ok(())
    }

    #[test]
    fn test_consecutive_closed_days_merge() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        exceptions.add_closed_day(date(8, 27))?;
        exceptions.add_closed_day(date(8, 25))?;
        exceptions.add_closed_day(date(8, 26))?;
        assert_eq!(exceptions.to_display_string(), "Closed: Aug 25-Aug 27.");

        let mut exceptions = DateExceptions::new(today());
        exceptions.add_closed_day(date(8, 30))?;
        exceptions.add_closed_day(date(8, 25))?;
        assert_eq!(exceptions.to_display_string(), "Closed: Aug 25, Aug 30.");
        Ok(())
    }

    #[test]
    fn test_closed_ranges_merge_across_months() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        exceptions.add_period(false, date(8, 25), Some(date(9, 1)), None, None)?;
        assert_eq!(exceptions.to_display_string(), "Closed: Aug 25-Sep 1.");

        exceptions.add_closed_day(date(9, 2))?;
        exceptions.add_closed_day(date(9, 2))?;
        assert_eq!(exceptions.len(), 3);
        assert_eq!(exceptions.to_display_string(), "Closed: Aug 25-Sep 2.");
        Ok(())
    }

    #[test]
    fn test_display_with_open_and_closed_clauses() -> Result<()> {
        let mut exceptions = DateExceptions::new(today());
        exceptions.add_open_day(date(12, 31))?;
        exceptions.add_period(true, date(12, 24), None, Some(t(10, 0)), Some(t(14, 30)))?;
        exceptions.add_closed_day(date(12, 25))?;

        assert_eq!(
            exceptions.to_display_string(),
            "Closed: Dec 25. Open: 24 Dec 10:00-14:30, 31 Dec."
        );

        let mut open_only = DateExceptions::new(today());
        open_only.add_open_day(date(12, 31))?;
        assert_eq!(open_only.to_display_string(), "Open: 31 Dec.");

        assert_eq!(DateExceptions::new(today()).to_display_string(), "");
        Ok(())
    }

    #[test]
    fn test_from_raw_passes_unresolved_dates_through() -> Result<()> {
        let raw = vec![
            RawDateException {
                start_date: Some(raw_date(0, 12, 24)),
                closed: Some(true),
                ..Default::default()
            },
            RawDateException {
                start_date: Some(raw_date(2026, 12, 25)),
                end_date: Some(raw_date(2026, 12, 26)),
                closed: Some(true),
                ..Default::default()
            },
            RawDateException {
                start_date: Some(raw_date(2020, 1, 1)),
                closed: Some(true),
                ..Default::default()
            },
        ];
        let exceptions = DateExceptions::from_raw(&raw, today())?;
        assert_eq!(exceptions.len(), 2);

        let periods = exceptions.periods();
        assert!(periods[0].is_unresolved());
        assert_eq!(periods[0].start_date(), raw_date(0, 12, 24));
        assert_eq!(periods[0].end_date(), raw_date(0, 12, 24));
        assert!(periods[0].is_closed());
        assert_eq!(
            exceptions.to_display_string(),
            "Closed: Dec 24, Dec 25-Dec 26."
        );
        Ok(())
    }

    #[test]
    fn test_from_raw_fails_atomically() {
        let raw = vec![
            RawDateException {
                start_date: Some(raw_date(2026, 12, 25)),
                closed: Some(true),
                ..Default::default()
            },
            RawDateException {
                start_date: Some(raw_date(2026, 12, 28)),
                end_date: Some(raw_date(2026, 12, 27)),
                closed: Some(true),
                ..Default::default()
            },
        ];
        let result = DateExceptions::from_raw(&raw, today());
        assert!(matches!(result, Err(HoursError::InvalidDateRange { .. })));

        let missing_start = vec![RawDateException::default()];
        assert!(DateExceptions::from_raw(&missing_start, today()).is_err());
    }

    #[test]
    fn test_raw_zero_minutes_hash_like_missing_minutes() -> Result<()> {
        let with_minutes = RawDateException {
            start_date: Some(raw_date(2026, 12, 24)),
            closed: Some(false),
            open_time: Some(RawTime {
                hours:   Some(10),
                minutes: Some(0),
            }),
            close_time: Some(RawTime {
                hours:   Some(14),
                minutes: Some(0),
            }),
            ..Default::default()
        };
        let without_minutes = RawDateException {
            open_time: Some(RawTime {
                hours:   Some(10),
                minutes: None,
            }),
            close_time: Some(RawTime {
                hours:   Some(14),
                minutes: None,
            }),
            ..with_minutes.clone()
        };

        let a = DateExceptions::from_raw(&[with_minutes], today())?;
        let b = DateExceptions::from_raw(&[without_minutes], today())?;
        assert_eq!(a.canonical_hash()?, b.canonical_hash()?);
        Ok(())
    }

    #[test]
    fn test_canonical_order_ignores_insertion_order() -> Result<()> {
        let mut a = DateExceptions::new(today());
        a.add_closed_day(date(12, 25))?;
        a.add_period(true, date(12, 24), None, Some(t(10, 0)), Some(t(14, 0)))?;
        a.add_period(true, date(12, 24), None, Some(t(9, 0)), Some(t(11, 0)))?;

        let mut b = DateExceptions::new(today());
        b.add_period(true, date(12, 24), None, Some(t(9, 0)), Some(t(11, 0)))?;
        b.add_closed_day(date(12, 25))?;
        b.add_period(true, date(12, 24), None, Some(t(10, 0)), Some(t(14, 0)))?;

        assert!(a.canonical_eq(&b)?);
        assert_eq!(a.periods()[0].open_time(), Some(t(9, 0)));
        assert_eq!(a.to_display_string(), b.to_display_string());

        let mut c = b.clone();
        c.add_closed_day(date(12, 26))?;
        assert!(!a.canonical_eq(&c)?);
        Ok(())
    }

    #[test]
    fn test_unresolved_records_serialize_as_received() -> Result<()> {
        let input = concat!(
            r#"[{"startDate":{"year":0,"month":12,"day":24},"closed":true},"#,
            r#"{"startDate":{"year":0,"month":12,"day":31},"openTime":{"hours":10,"minutes":0},"closeTime":{"hours":99}}]"#,
        );
        let raw: Vec<RawDateException> = serde_json::from_str(input)?;
        let exceptions = DateExceptions::from_raw(&raw, today())?;

        assert_eq!(exceptions.canonical_json()?, input);
        assert!(!exceptions.periods()[1].is_closed());
        assert_eq!(exceptions.periods()[1].close_time(), None);
        Ok(())
    }

    #[test]
    fn test_unresolved_end_date_is_kept() -> Result<()> {
        let input = r#"[{"startDate":{"year":2026,"month":12,"day":24},"endDate":{"year":0,"month":1,"day":2},"closed":true}]"#;
        let raw: Vec<RawDateException> = serde_json::from_str(input)?;
        let exceptions = DateExceptions::from_raw(&raw, today())?;

        assert_eq!(exceptions.canonical_json()?, input);
        assert_eq!(exceptions.to_display_string(), "Closed: Dec 24-Jan 2.");
        Ok(())
    }
}
