//! Wall-clock time primitives shared by weekly hours and date exceptions.
//!
//! Every value here is timezone-naive. Converting instants into these
//! wall-clock values is the job of the extractor that knows the location's
//! zone.

use {
    crate::sync::error::{
        HoursError,
        Result,
    },
    chrono::{
        Datelike,
        Month,
        NaiveDate,
        NaiveTime,
        Timelike,
        Weekday,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        fmt,
        str::FromStr,
    },
    winnow::{
        ModalResult,
        Parser,
        combinator::{
            opt,
            preceded,
            separated_pair,
            seq,
            terminated,
        },
        token::{
            rest,
            take_while,
        },
    },
};

/// Day of the week, serialized the way both upstream systems spell it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Monday is 0, Sunday is 6.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "MONDAY",
            Self::Tuesday => "TUESDAY",
            Self::Wednesday => "WEDNESDAY",
            Self::Thursday => "THURSDAY",
            Self::Friday => "FRIDAY",
            Self::Saturday => "SATURDAY",
            Self::Sunday => "SUNDAY",
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = HoursError;
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|day| day.name() == upper)
            .ok_or_else(|| HoursError::InvalidPeriod(format!("unknown day {s:?}")))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time of day with minute precision.
///
/// `24:00` is accepted as end of day; it orders after every other value.
/// Zero minutes are left out of the serialized form, so `{"hours":9}` and
/// `{"hours":9,"minutes":0}` describe the same value.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TimeOfDay {
    hours:   u32,
    #[serde(skip_serializing_if = "is_zero")]
    minutes: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay {
        hours:   0,
        minutes: 0,
    };
    pub const END_OF_DAY: TimeOfDay = TimeOfDay {
        hours:   24,
        minutes: 0,
    };

    pub fn new(hours: u32, minutes: u32) -> Result<Self> {
        let valid = (hours < 24 && minutes < 60) || (hours == 24 && minutes == 0);
        if !valid {
            return Err(HoursError::InvalidTime(format!(
                "{hours:02}:{minutes:02} is outside 00:00-24:00"
            )));
        }
        Ok(Self { hours, minutes })
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self {
            hours:   time.hour(),
            minutes: time.minute(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

fn hours_parser(input: &mut &str) -> ModalResult<u32> {
    take_while(1..=2, '0'..='9')
        .parse_to::<u32>()
        .parse_next(input)
}

fn minutes_parser(input: &mut &str) -> ModalResult<u32> {
    take_while(2, '0'..='9').parse_to::<u32>().parse_next(input)
}

/// `H:MM` or `HH:MM`, optionally followed by `:SS` and anything the CRM
/// appends after it (fractions, a `Z` suffix).
fn time_of_day_parser(input: &mut &str) -> ModalResult<TimeOfDay> {
    terminated(
        separated_pair(hours_parser, ':', minutes_parser),
        opt(preceded(':', rest)),
    )
    .verify_map(|(hours, minutes)| TimeOfDay::new(hours, minutes).ok())
    .parse_next(input)
}

impl FromStr for TimeOfDay {
    type Err = HoursError;
    fn from_str(s: &str) -> Result<Self> {
        time_of_day_parser
            .parse(s.trim())
            .map_err(|e| HoursError::InvalidTime(format!("{s:?}: {e}")))
    }
}

/// Time of day as it arrives in raw upstream records, before validation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RawTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours:   Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
}

impl RawTime {
    pub fn to_time_of_day(&self) -> Result<TimeOfDay> {
        let hours = self
            .hours
            .ok_or_else(|| HoursError::InvalidTime("hours are required".to_string()))?;
        TimeOfDay::new(hours, self.minutes.unwrap_or(0))
    }
}

/// Calendar date as exchanged with the upstream systems.
///
/// A year of 0 marks a date the listing API could not resolve (for example
/// an open-ended range); such dates are carried through untouched.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(default)]
pub struct CalendarDate {
    pub year:  i32,
    pub month: u32,
    pub day:   u32,
}

impl CalendarDate {
    pub fn is_sentinel(&self) -> bool {
        self.year == 0
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        if self.is_sentinel() {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn next_day(&self) -> Option<CalendarDate> {
        self.to_naive()
            .and_then(|date| date.succ_opt())
            .map(CalendarDate::from)
    }

    /// `Aug 25`
    pub fn month_day_label(&self) -> String {
        match self.to_naive() {
            Some(date) => date.format("%b %-d").to_string(),
            None => format!("{} {}", self.month_abbrev(), self.day),
        }
    }

    /// `25 Aug`
    pub fn day_month_label(&self) -> String {
        match self.to_naive() {
            Some(date) => date.format("%-d %b").to_string(),
            None => format!("{} {}", self.day, self.month_abbrev()),
        }
    }

    fn month_abbrev(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .and_then(|month| month.name().get(..3))
            .unwrap_or("???")
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year:  date.year(),
            month: date.month(),
            day:   date.day(),
        }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn calendar_date_parser(input: &mut &str) -> ModalResult<CalendarDate> {
    seq!(
        CalendarDate {
            year: take_while(4, '0'..='9').parse_to::<i32>(),
            _: '-',
            month: take_while(2, '0'..='9').parse_to::<u32>(),
            _: '-',
            day: take_while(2, '0'..='9').parse_to::<u32>(),
        }
    )
    .verify(|date: &CalendarDate| date.to_naive().is_some())
    .parse_next(input)
}

impl FromStr for CalendarDate {
    type Err = HoursError;
    fn from_str(s: &str) -> Result<Self> {
        calendar_date_parser
            .parse(s.trim())
            .map_err(|e| HoursError::InvalidDate(format!("{s:?}: {e}")))
    }
}
