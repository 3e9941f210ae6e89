//! Location records of the listing API (the mirror side).

use {
    super::{
        ExtractContext,
        Result,
    },
    crate::sync::schedule::{
        date_exceptions::{
            DateExceptions,
            RawDateException,
        },
        weekly_hours::{
            RawPeriod,
            WeeklyHours,
        },
    },
    serde::{
        Deserialize,
        Serialize,
    },
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingLocation {
    /// Resource name, e.g. `locations/1234567890`.
    pub name:               Option<String>,
    pub title:              Option<String>,
    pub store_code:         Option<String>,
    pub regular_hours:      Option<RegularHours>,
    pub special_hours:      Option<SpecialHours>,
    pub storefront_address: Option<Address>,
    pub metadata:           Option<Metadata>,
    pub open_info:          Option<OpenInfo>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegularHours {
    pub periods: Vec<RawPeriod>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecialHours {
    pub special_hour_periods: Vec<RawDateException>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub locality: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub place_id:           Option<String>,
    pub maps_uri:           Option<String>,
    /// Set when the listing API considers this location a duplicate of
    /// another one.
    pub duplicate_location: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenInfo {
    pub status: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl ListingLocation {
    pub fn place_id(&self) -> Option<&str> {
        non_empty(self.metadata.as_ref().and_then(|m| m.place_id.as_ref()))
    }

    pub fn store_code(&self) -> Option<&str> {
        non_empty(self.store_code.as_ref())
    }

    pub fn status(&self) -> Option<&str> {
        non_empty(self.open_info.as_ref().and_then(|o| o.status.as_ref()))
    }

    pub fn is_duplicate(&self) -> bool {
        non_empty(
            self.metadata
                .as_ref()
                .and_then(|m| m.duplicate_location.as_ref()),
        )
        .is_some()
    }

    /// Human label for logs: store code and locality, falling back to the
    /// resource name.
    pub fn log_name(&self) -> String {
        let locality = non_empty(
            self.storefront_address
                .as_ref()
                .and_then(|a| a.locality.as_ref()),
        );
        let label = [self.store_code(), locality]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        if !label.is_empty() {
            return label;
        }
        non_empty(self.name.as_ref())
            .unwrap_or("Unknown")
            .to_string()
    }

    /// A listing without regular hours has an empty weekly schedule.
    pub fn weekly_hours(&self) -> Result<WeeklyHours> {
        let periods = self
            .regular_hours
            .as_ref()
            .map(|hours| hours.periods.as_slice())
            .unwrap_or_default();
        Ok(WeeklyHours::from_raw(periods)?)
    }

    pub fn date_exceptions(&self, context: &ExtractContext) -> Result<DateExceptions> {
        let periods = self
            .special_hours
            .as_ref()
            .map(|hours| hours.special_hour_periods.as_slice())
            .unwrap_or_default();
        Ok(DateExceptions::from_raw(periods, context.today)?)
    }
}
