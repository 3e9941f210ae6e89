//! Recurring weekly opening hours: model, canonical form and display.

use {
    super::{
        canonical::Canonical,
        time::{
            DayOfWeek,
            RawTime,
            TimeOfDay,
        },
    },
    crate::sync::error::{
        HoursError,
        Result,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::fmt,
};

/// One recurring open/close interval.
///
/// Field order is the canonical serialization order and, through the derived
/// `Ord`, the canonical sort order: day first, then open time.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    open_day:   DayOfWeek,
    open_time:  TimeOfDay,
    close_day:  DayOfWeek,
    close_time: TimeOfDay,
}

impl Period {
    /// Periods that close on a later day may close at an earlier time of day;
    /// within a single day the close time must not precede the open time.
    pub fn new(
        open_day: DayOfWeek,
        open_time: TimeOfDay,
        close_day: DayOfWeek,
        close_time: TimeOfDay,
    ) -> Result<Self> {
        if open_day == close_day && open_time > close_time {
            return Err(HoursError::InvalidPeriod(format!(
                "{open_day} opens at {open_time} after closing at {close_time}"
            )));
        }
        Ok(Self {
            open_day,
            open_time,
            close_day,
            close_time,
        })
    }

    pub fn open_day(&self) -> DayOfWeek {
        self.open_day
    }

    pub fn open_time(&self) -> TimeOfDay {
        self.open_time
    }

    pub fn close_day(&self) -> DayOfWeek {
        self.close_day
    }

    pub fn close_time(&self) -> TimeOfDay {
        self.close_time
    }
}

/// A period as the listing API reports it.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPeriod {
    pub open_day:   Option<String>,
    pub open_time:  Option<RawTime>,
    pub close_day:  Option<String>,
    pub close_time: Option<RawTime>,
}

impl RawPeriod {
    fn to_period(&self) -> Result<Period> {
        let open_day = self
            .open_day
            .as_deref()
            .ok_or_else(|| HoursError::InvalidPeriod("open day is required".to_string()))?;
        let close_day = self
            .close_day
            .as_deref()
            .ok_or_else(|| HoursError::InvalidPeriod("close day is required".to_string()))?;
        let open_time = required_time("open", self.open_time.as_ref())?;
        let close_time = required_time("close", self.close_time.as_ref())?;

        build_period(open_day, open_time, Some(close_day), Some(close_time))
    }
}

fn required_time(which: &str, raw: Option<&RawTime>) -> Result<TimeOfDay> {
    raw.ok_or_else(|| HoursError::InvalidPeriod(format!("{which} time is required")))?
        .to_time_of_day()
        .map_err(|e| HoursError::InvalidPeriod(format!("{which} time: {e}")))
}

fn build_period(
    open_day: &str,
    open_time: TimeOfDay,
    close_day: Option<&str>,
    close_time: Option<TimeOfDay>,
) -> Result<Period> {
    let open_day: DayOfWeek = open_day.parse()?;
    let close_day: DayOfWeek = match close_day {
        Some(day) => day.parse()?,
        None => open_day,
    };
    let close_time = close_time
        .ok_or_else(|| HoursError::InvalidPeriod("close time is required".to_string()))?;

    Period::new(open_day, open_time, close_day, close_time)
}

/// A location's recurring weekly schedule.
///
/// Periods form a multiset: duplicates are kept as given, and insertion
/// order does not matter for hashing or display.
#[derive(Clone, Debug, Default)]
pub struct WeeklyHours {
    periods: Vec<Period>,
}

impl WeeklyHours {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the schedule from raw upstream periods. Any invalid period
    /// fails the whole construction.
    pub fn from_raw<'a>(raw: impl IntoIterator<Item = &'a RawPeriod>) -> Result<Self> {
        let periods = raw
            .into_iter()
            .map(RawPeriod::to_period)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { periods })
    }

    pub fn from_periods(periods: impl IntoIterator<Item = Period>) -> Self {
        Self {
            periods: periods.into_iter().collect(),
        }
    }

    /// Validates and appends a period. Day names are case-insensitive and the
    /// close day defaults to the open day. On error nothing is appended.
    pub fn add_period(
        &mut self,
        open_day: &str,
        open_time: TimeOfDay,
        close_day: Option<&str>,
        close_time: Option<TimeOfDay>,
    ) -> Result<()> {
        let period = build_period(open_day, open_time, close_day, close_time)?;
        self.periods.push(period);
        Ok(())
    }

    /// Periods in canonical order.
    pub fn periods(&self) -> Vec<Period> {
        let mut periods = self.periods.clone();
        periods.sort();
        periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Renders e.g. `Mon-Fri 08:00-12:00/13:00-17:00, Sat 09:00-13:00`.
    ///
    /// Without lunch breaks, a day with several periods is shown as one span
    /// from its earliest opening to its latest closing. Days without periods
    /// are left out.
    ///
    /// Only weekday-adjacent days with identical spans merge into a range. A
    /// closed day between two equal days keeps them apart, so `Mon` and `Wed`
    /// with a closed `Tue` render as `Mon 08:00-17:00, Wed 08:00-17:00` and
    /// never as `Mon-Wed`, which would read as open on Tuesday.
    pub fn to_display_string(&self, include_lunch_breaks: bool) -> String {
        let mut days: Vec<DayHours> = Vec::new();
        for period in self.periods() {
            match days.last_mut() {
                Some(day) if day.day == period.open_day => {
                    day.spans.push((period.open_time, period.close_time))
                }
                _ => days.push(DayHours {
                    day:   period.open_day,
                    spans: vec![(period.open_time, period.close_time)],
                }),
            }
        }

        let mut ranges: Vec<DayRange> = Vec::new();
        for day in days {
            let spans = day.rendered_spans(include_lunch_breaks);
            match ranges.last_mut() {
                Some(range)
                    if range.last.index() + 1 == day.day.index()
                        && same_spans(&range.spans, &spans) =>
                {
                    range.last = day.day;
                }
                _ => ranges.push(DayRange {
                    first: day.day,
                    last: day.day,
                    spans,
                }),
            }
        }

        ranges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Canonical for WeeklyHours {
    type Item = Period;

    fn canonical_items(&self) -> Vec<Period> {
        self.periods()
    }
}

impl fmt::Display for WeeklyHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string(true))
    }
}

struct DayHours {
    day:   DayOfWeek,
    spans: Vec<(TimeOfDay, TimeOfDay)>,
}

impl DayHours {
    /// `HH:MM-HH:MM` strings for the day, de-duplicated by text.
    fn rendered_spans(&self, include_lunch_breaks: bool) -> Vec<String> {
        let collapsed;
        let spans = if !include_lunch_breaks && self.spans.len() > 1 {
            let open = self.spans.iter().map(|(open, _)| *open).min();
            let close = self.spans.iter().map(|(_, close)| *close).max();
            collapsed = open.zip(close).into_iter().collect::<Vec<_>>();
            &collapsed[..]
        } else {
            &self.spans[..]
        };

        let mut rendered: Vec<String> = Vec::with_capacity(spans.len());
        for (open, close) in spans {
            let span = format!("{open}-{close}");
            if !rendered.contains(&span) {
                rendered.push(span);
            }
        }
        rendered
    }
}

fn same_spans(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

struct DayRange {
    first: DayOfWeek,
    last:  DayOfWeek,
    spans: Vec<String>,
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            f.write_str(self.first.abbrev())?;
        } else {
            write!(f, "{}-{}", self.first.abbrev(), self.last.abbrev())?;
        }
        write!(f, " {}", self.spans.join("/"))
    }
}
