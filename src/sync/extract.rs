//! Extraction of hours models from each system's raw location records.
//!
//! Extractors validate at the boundary: a record that cannot be turned into a
//! model fails with `ExtractionFailure`, and callers then treat that facet as
//! absent rather than empty.

pub mod crm;
pub mod listing;

use {
    crate::sync::{
        error::HoursError,
        schedule::LocationHours,
    },
    chrono::NaiveDate,
    chrono_tz::Tz,
    lazy_static::lazy_static,
    serde::Deserialize,
    std::collections::HashMap,
    thiserror::Error,
};

lazy_static! {
    /// Zones of the countries the CRM tracks clinics in. CRM timestamps are
    /// stored in UTC and have to be read back as local wall-clock times.
    static ref DEFAULT_COUNTRY_TIMEZONES: HashMap<String, Tz> = HashMap::from([
        ("Sweden".to_string(), Tz::Europe__Stockholm),
        ("Norway".to_string(), Tz::Europe__Oslo),
        ("Denmark".to_string(), Tz::Europe__Copenhagen),
        ("Netherlands".to_string(), Tz::Europe__Amsterdam),
    ]);
}

pub type Result<T> = std::result::Result<T, ExtractionFailure>;

#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("field {field} has unexpected value {value:?}: {source}")]
    InvalidField {
        field:  &'static str,
        value:  String,
        #[source]
        source: HoursError,
    },

    #[error(transparent)]
    Hours(#[from] HoursError),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zone used to decide what "today" is when filtering expired
    /// exceptions, and for CRM countries without a configured zone.
    pub default_timezone:  Tz,
    /// Country name (as stored in the CRM) to IANA zone.
    pub country_timezones: HashMap<String, Tz>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone:  Tz::UTC,
            country_timezones: DEFAULT_COUNTRY_TIMEZONES.clone(),
        }
    }
}

/// Everything an extractor needs besides the record itself.
#[derive(Clone, Debug)]
pub struct ExtractContext {
    pub today:             NaiveDate,
    pub default_timezone:  Tz,
    pub country_timezones: HashMap<String, Tz>,
}

impl ExtractContext {
    pub fn new(config: &Config, today: NaiveDate) -> Self {
        Self {
            today,
            default_timezone: config.default_timezone,
            country_timezones: config.country_timezones.clone(),
        }
    }

    /// Uses the current date in the configured default zone.
    pub fn from_config(config: &Config) -> Self {
        let today = chrono::Utc::now()
            .with_timezone(&config.default_timezone)
            .date_naive();
        Self::new(config, today)
    }

    /// Country names are matched case-insensitively.
    pub fn timezone_for_country(&self, country: Option<&str>) -> Tz {
        country
            .and_then(|country| {
                self.country_timezones
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(country.trim()))
                    .map(|(_, tz)| *tz)
            })
            .unwrap_or(self.default_timezone)
    }
}

/// Turns a failed extraction into an absent facet, logging why.
pub fn facet_or_absent<T>(facet: &str, location: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                location = %location,
                facet = %facet,
                err = %err,
                "Extraction failed, treating facet as absent."
            );
            None
        }
    }
}

pub fn listing_hours(location: &listing::ListingLocation, context: &ExtractContext) -> LocationHours {
    let name = location.log_name();
    LocationHours {
        weekly:     facet_or_absent("regular", &name, location.weekly_hours()),
        exceptions: facet_or_absent("special", &name, location.date_exceptions(context)),
    }
}

pub fn crm_hours(location: &crm::CrmLocation, context: &ExtractContext) -> LocationHours {
    let name = location.log_name();
    LocationHours {
        weekly:     facet_or_absent("regular", &name, location.weekly_hours()),
        exceptions: facet_or_absent("special", &name, location.date_exceptions(context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_timezone_lookup() {
        let context = ExtractContext::new(
            &Config::default(),
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        );

        assert_eq!(
            context.timezone_for_country(Some("Sweden")),
            Tz::Europe__Stockholm
        );
        assert_eq!(
            context.timezone_for_country(Some("netherlands ")),
            Tz::Europe__Amsterdam
        );
        assert_eq!(context.timezone_for_country(Some("Finland")), Tz::UTC);
        assert_eq!(context.timezone_for_country(None), Tz::UTC);
    }

    #[test]
    fn test_failed_extraction_is_absent() {
        let failed: Result<u32> = Err(HoursError::InvalidPeriod("broken".to_string()).into());
        assert_eq!(facet_or_absent("regular", "Store 1", failed), None);
        assert_eq!(facet_or_absent("regular", "Store 1", Ok(3)), Some(3));
    }
}
