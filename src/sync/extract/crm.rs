//! Clinic records of the CRM (the truth side).
//!
//! The CRM keeps business hours as flat per-day text fields plus a shared
//! lunch break, and special hours as a handful of fixed date slots.

use {
    super::{
        ExtractContext,
        ExtractionFailure,
        Result,
    },
    crate::sync::{
        error::HoursError,
        schedule::{
            date_exceptions::DateExceptions,
            time::{
                CalendarDate,
                DayOfWeek,
                TimeOfDay,
            },
            weekly_hours::WeeklyHours,
        },
    },
    chrono::{
        DateTime,
        FixedOffset,
        NaiveDate,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::str::FromStr,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CrmLocation {
    #[serde(rename = "Id")]
    pub id:             Option<String>,
    #[serde(rename = "Name")]
    pub name:           Option<String>,
    #[serde(rename = "Country__c")]
    pub country:        Option<String>,
    #[serde(rename = "Google_Place_ID__c")]
    pub place_id:       Option<String>,
    #[serde(flatten)]
    pub business_hours: BusinessHours,
    #[serde(flatten)]
    pub special_dates:  SpecialDates,
}

/// Weekly hours fields. Times are wall-clock values such as `08:00:00.000Z`;
/// the `Z` suffix is the CRM's and does not mean UTC.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BusinessHours {
    #[serde(rename = "BH_MondayStartTime__c")]
    pub monday_start:    Option<String>,
    #[serde(rename = "BH_MondayEndTime__c")]
    pub monday_end:      Option<String>,
    #[serde(rename = "BH_TuesdayStartTime__c")]
    pub tuesday_start:   Option<String>,
    #[serde(rename = "BH_TuesdayEndTime__c")]
    pub tuesday_end:     Option<String>,
    #[serde(rename = "BH_WednesdayStartTime__c")]
    pub wednesday_start: Option<String>,
    #[serde(rename = "BH_WednesdayEndTime__c")]
    pub wednesday_end:   Option<String>,
    #[serde(rename = "BH_ThursdayStartTime__c")]
    pub thursday_start:  Option<String>,
    #[serde(rename = "BH_ThursdayEndTime__c")]
    pub thursday_end:    Option<String>,
    #[serde(rename = "BH_FridayStartTime__c")]
    pub friday_start:    Option<String>,
    #[serde(rename = "BH_FridayEndTime__c")]
    pub friday_end:      Option<String>,
    #[serde(rename = "BH_SaturdayStartTime__c")]
    pub saturday_start:  Option<String>,
    #[serde(rename = "BH_SaturdayEndTime__c")]
    pub saturday_end:    Option<String>,
    #[serde(rename = "BH_SundayStartTime__c")]
    pub sunday_start:    Option<String>,
    #[serde(rename = "BH_SundayEndTime__c")]
    pub sunday_end:      Option<String>,

    /// Lunch break shared by every day that has its lunch flag set.
    #[serde(rename = "BH_LunchTime_From__c")]
    pub lunch_from: Option<String>,
    #[serde(rename = "BH_LunchTime_To__c")]
    pub lunch_to:   Option<String>,

    #[serde(rename = "BH_MondayLunchTime__c")]
    pub monday_lunch:    Option<bool>,
    #[serde(rename = "BH_TuesdayLunchTime__c")]
    pub tuesday_lunch:   Option<bool>,
    #[serde(rename = "BH_WednesdayLunchTime__c")]
    pub wednesday_lunch: Option<bool>,
    #[serde(rename = "BH_ThursdayLunchTime__c")]
    pub thursday_lunch:  Option<bool>,
    #[serde(rename = "BH_FridayLunchTime__c")]
    pub friday_lunch:    Option<bool>,
    #[serde(rename = "BH_SaturdayLunchTime__c")]
    pub saturday_lunch:  Option<bool>,
    #[serde(rename = "BH_SundayLunchTime__c")]
    pub sunday_lunch:    Option<bool>,
}

/// Special hours slots.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpecialDates {
    #[serde(rename = "BH_SpecialDateClosed01__c")]
    pub closed_date_01:       Option<String>,
    #[serde(rename = "BH_SpecialDateClosed02__c")]
    pub closed_date_02:       Option<String>,
    #[serde(rename = "BH_SpecialDateClosed03__c")]
    pub closed_date_03:       Option<String>,
    #[serde(rename = "BH_Closedbetween_StartDate__c")]
    pub closed_between_start: Option<String>,
    #[serde(rename = "BH_Closedbetween_EndDate__c")]
    pub closed_between_end:   Option<String>,
    /// UTC timestamp of the opening; its local date is the exception date.
    #[serde(rename = "BH_SpecialDateTimeOpen01__c")]
    pub special_open_01:      Option<String>,
    /// Wall-clock closing time for the first special opening.
    #[serde(rename = "BH_SpecialTimeClosed01__c")]
    pub special_close_01:     Option<String>,
    #[serde(rename = "BH_SpecialDateTimeOpen02__c")]
    pub special_open_02:      Option<String>,
    #[serde(rename = "BH_SpecialTimeClosed02__c")]
    pub special_close_02:     Option<String>,
}

struct DayFields<'a> {
    start_field: &'static str,
    end_field:   &'static str,
    start:       Option<&'a String>,
    end:         Option<&'a String>,
    lunch:       bool,
}

impl BusinessHours {
    fn day(&self, day: DayOfWeek) -> DayFields<'_> {
        let (start_field, end_field, start, end, lunch) = match day {
            DayOfWeek::Monday => (
                "BH_MondayStartTime__c",
                "BH_MondayEndTime__c",
                &self.monday_start,
                &self.monday_end,
                self.monday_lunch,
            ),
            DayOfWeek::Tuesday => (
                "BH_TuesdayStartTime__c",
                "BH_TuesdayEndTime__c",
                &self.tuesday_start,
                &self.tuesday_end,
                self.tuesday_lunch,
            ),
            DayOfWeek::Wednesday => (
                "BH_WednesdayStartTime__c",
                "BH_WednesdayEndTime__c",
                &self.wednesday_start,
                &self.wednesday_end,
                self.wednesday_lunch,
            ),
            DayOfWeek::Thursday => (
                "BH_ThursdayStartTime__c",
                "BH_ThursdayEndTime__c",
                &self.thursday_start,
                &self.thursday_end,
                self.thursday_lunch,
            ),
            DayOfWeek::Friday => (
                "BH_FridayStartTime__c",
                "BH_FridayEndTime__c",
                &self.friday_start,
                &self.friday_end,
                self.friday_lunch,
            ),
            DayOfWeek::Saturday => (
                "BH_SaturdayStartTime__c",
                "BH_SaturdayEndTime__c",
                &self.saturday_start,
                &self.saturday_end,
                self.saturday_lunch,
            ),
            DayOfWeek::Sunday => (
                "BH_SundayStartTime__c",
                "BH_SundayEndTime__c",
                &self.sunday_start,
                &self.sunday_end,
                self.sunday_lunch,
            ),
        };

        DayFields {
            start_field,
            end_field,
            start: start.as_ref(),
            end: end.as_ref(),
            lunch: lunch.unwrap_or(false),
        }
    }

    fn lunch_break(&self) -> Result<Option<(TimeOfDay, TimeOfDay)>> {
        match (non_empty(self.lunch_from.as_ref()), non_empty(self.lunch_to.as_ref())) {
            (Some(from), Some(to)) => Ok(Some((
                parse_field("BH_LunchTime_From__c", from)?,
                parse_field("BH_LunchTime_To__c", to)?,
            ))),
            _ => Ok(None),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

fn parse_field<T>(field: &'static str, value: &str) -> Result<T>
where
    T: FromStr<Err = HoursError>,
{
    value
        .parse()
        .map_err(|source| ExtractionFailure::InvalidField {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    let date: CalendarDate = parse_field(field, value)?;
    date.to_naive()
        .ok_or_else(|| ExtractionFailure::InvalidField {
            field,
            value: value.to_string(),
            source: HoursError::InvalidDate(format!("{date} is not a calendar date")),
        })
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map_err(|e| ExtractionFailure::InvalidField {
            field,
            value: value.to_string(),
            source: HoursError::InvalidDate(e.to_string()),
        })
}

impl CrmLocation {
    pub fn place_id(&self) -> Option<&str> {
        non_empty(self.place_id.as_ref())
    }

    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.name.as_ref())
    }

    pub fn log_name(&self) -> String {
        self.display_name()
            .or_else(|| non_empty(self.id.as_ref()))
            .unwrap_or("Unknown")
            .to_string()
    }

    /// One period per day with both start and end time. A day with its lunch
    /// flag set is split around the shared lunch break, when one is defined.
    pub fn weekly_hours(&self) -> Result<WeeklyHours> {
        let hours = &self.business_hours;
        let mut weekly = WeeklyHours::new();

        for day in DayOfWeek::ALL {
            let fields = hours.day(day);
            let (Some(start), Some(end)) = (non_empty(fields.start), non_empty(fields.end)) else {
                continue;
            };

            let open: TimeOfDay = parse_field(fields.start_field, start)?;
            let close: TimeOfDay = parse_field(fields.end_field, end)?;

            let lunch = if fields.lunch {
                hours.lunch_break()?
            } else {
                None
            };

            match lunch {
                Some((lunch_start, lunch_end)) => {
                    weekly.add_period(day.name(), open, None, Some(lunch_start))?;
                    weekly.add_period(day.name(), lunch_end, None, Some(close))?;
                }
                None => weekly.add_period(day.name(), open, None, Some(close))?,
            }
        }

        Ok(weekly)
    }

    /// Closed dates, the closed range and the special openings. Opening
    /// timestamps are converted to the clinic's local zone before their date
    /// and time are taken.
    pub fn date_exceptions(&self, context: &ExtractContext) -> Result<DateExceptions> {
        let dates = &self.special_dates;
        let mut exceptions = DateExceptions::new(context.today);

        for (field, value) in [
            ("BH_SpecialDateClosed01__c", &dates.closed_date_01),
            ("BH_SpecialDateClosed02__c", &dates.closed_date_02),
            ("BH_SpecialDateClosed03__c", &dates.closed_date_03),
        ] {
            if let Some(value) = non_empty(value.as_ref()) {
                exceptions.add_closed_day(parse_date(field, value)?)?;
            }
        }

        if let (Some(start), Some(end)) = (
            non_empty(dates.closed_between_start.as_ref()),
            non_empty(dates.closed_between_end.as_ref()),
        ) {
            exceptions.add_period(
                false,
                parse_date("BH_Closedbetween_StartDate__c", start)?,
                Some(parse_date("BH_Closedbetween_EndDate__c", end)?),
                None,
                None,
            )?;
        }

        let timezone = context.timezone_for_country(self.country.as_deref());
        for (open_field, opens_at, close_field, closes_at) in [
            (
                "BH_SpecialDateTimeOpen01__c",
                &dates.special_open_01,
                "BH_SpecialTimeClosed01__c",
                &dates.special_close_01,
            ),
            (
                "BH_SpecialDateTimeOpen02__c",
                &dates.special_open_02,
                "BH_SpecialTimeClosed02__c",
                &dates.special_close_02,
            ),
        ] {
            let (Some(opens_at), Some(closes_at)) =
                (non_empty(opens_at.as_ref()), non_empty(closes_at.as_ref()))
            else {
                continue;
            };

            let opens_at = parse_timestamp(open_field, opens_at)?.with_timezone(&timezone);
            let date = opens_at.date_naive();
            let close_time: TimeOfDay = parse_field(close_field, closes_at)?;

            exceptions.add_period(
                true,
                date,
                Some(date),
                Some(TimeOfDay::from(opens_at.time())),
                Some(close_time),
            )?;
        }

        Ok(exceptions)
    }
}
