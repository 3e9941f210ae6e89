//! Side-by-side comparison of both systems, without pushing anything.

use {
    crate::sync::{
        extract::{
            self,
            ExtractContext,
        },
        reconcile::compare_facet,
        schedule::{
            LocationHours,
            canonical::Canonical,
        },
        source::LocationSource,
    },
    anyhow::{
        Context,
        Result,
    },
    serde::Deserialize,
    std::{
        fmt,
        fs::{
            self,
            File,
        },
        io,
        path::PathBuf,
    },
    tracing::instrument,
};

const NO_CRM_RECORD: &str = "NO_CRM_RECORD";
const UNAVAILABLE: &str = "UNAVAILABLE";

const HEADERS: [&str; 10] = [
    "Store",
    "CRM name",
    "Status",
    "Place ID",
    "Listing regular",
    "CRM regular",
    "Regular",
    "Listing special",
    "CRM special",
    "Special",
];

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory CSV reports are written to.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Outcome of comparing one facet of a location across both systems.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    Equal,
    Different,
    /// The listing has no CRM counterpart, so there is nothing to compare.
    NoCrmRecord,
    /// At least one side failed to extract; equality cannot be established.
    Unavailable,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "EQUAL",
            Self::Different => "DIFFERENT",
            Self::NoCrmRecord => NO_CRM_RECORD,
            Self::Unavailable => UNAVAILABLE,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportRow {
    pub store_code:      String,
    pub crm_name:        String,
    pub status:          String,
    pub has_place_id:    bool,
    pub listing_regular: String,
    pub crm_regular:     String,
    pub regular:         Verdict,
    pub listing_special: String,
    pub crm_special:     String,
    pub special:         Verdict,
}

impl ReportRow {
    fn cells(&self) -> [String; 10] {
        [
            self.store_code.clone(),
            self.crm_name.clone(),
            self.status.clone(),
            if self.has_place_id { "Yes" } else { "No" }.to_string(),
            self.listing_regular.clone(),
            self.crm_regular.clone(),
            self.regular.to_string(),
            self.listing_special.clone(),
            self.crm_special.clone(),
            self.special.to_string(),
        ]
    }
}

/// Display string of a facet, or a marker when it could not be extracted.
fn facet_display<F>(facet: Option<&F>, render: impl Fn(&F) -> String) -> String {
    facet.map(render).unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn verdict<F: Canonical>(listing: Option<&F>, crm: Option<&F>) -> Result<Verdict> {
    if listing.is_none() || crm.is_none() {
        return Ok(Verdict::Unavailable);
    }
    Ok(if compare_facet(listing, crm)? {
        Verdict::Equal
    } else {
        Verdict::Different
    })
}

fn row(
    location: &extract::listing::ListingLocation,
    listing: &LocationHours,
    crm: Option<(&str, &LocationHours)>,
) -> Result<ReportRow> {
    let mut row = ReportRow {
        store_code:      location.store_code().unwrap_or_default().to_string(),
        crm_name:        NO_CRM_RECORD.to_string(),
        status:          location.status().unwrap_or_default().to_string(),
        has_place_id:    location.place_id().is_some(),
        listing_regular: facet_display(listing.weekly.as_ref(), |w| w.to_display_string(false)),
        crm_regular:     NO_CRM_RECORD.to_string(),
        regular:         Verdict::NoCrmRecord,
        listing_special: facet_display(listing.exceptions.as_ref(), |e| e.to_display_string()),
        crm_special:     NO_CRM_RECORD.to_string(),
        special:         Verdict::NoCrmRecord,
    };

    if let Some((name, hours)) = crm {
        row.crm_name = name.to_string();
        row.crm_regular = facet_display(hours.weekly.as_ref(), |w| w.to_display_string(false));
        row.regular = verdict(listing.weekly.as_ref(), hours.weekly.as_ref())?;
        row.crm_special = facet_display(hours.exceptions.as_ref(), |e| e.to_display_string());
        row.special = verdict(listing.exceptions.as_ref(), hours.exceptions.as_ref())?;
    }

    Ok(row)
}

/// One row per listing location, sorted by CRM name. Locations without a
/// CRM counterpart are marked rather than compared.
#[instrument(skip_all)]
pub fn build_report<S: LocationSource>(source: &S, context: &ExtractContext) -> Result<Vec<ReportRow>> {
    let mut rows = Vec::new();

    for location in source.listing_locations()? {
        let clinic = match location.place_id() {
            Some(place_id) => source.crm_location_by_place_id(place_id)?,
            None => None,
        };

        let listing = extract::listing_hours(&location, context);
        let crm = clinic.as_ref().map(|clinic| {
            (
                clinic.display_name().unwrap_or_default(),
                extract::crm_hours(clinic, context),
            )
        });

        rows.push(row(
            &location,
            &listing,
            crm.as_ref().map(|(name, hours)| (*name, hours)),
        )?);
    }

    rows.sort_by(|a, b| a.crm_name.cmp(&b.crm_name));
    tracing::debug!(rows = rows.len(), "Report built.");
    Ok(rows)
}

/// Renders rows as left-aligned plain-text columns under a header line.
pub fn render_table(rows: &[ReportRow]) -> String {
    let mut lines = vec![HEADERS.map(str::to_string)];
    lines.extend(rows.iter().map(ReportRow::cells));

    let mut widths = [0; HEADERS.len()];
    for line in &lines {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the header and one record per row as CSV.
pub fn write_csv<W: io::Write>(rows: &[ReportRow], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a timestamped CSV report into the configured directory and returns
/// its path.
pub fn write_csv_report(rows: &[ReportRow], config: &Config) -> Result<PathBuf> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Could not create report directory {}",
            config.output_dir.display()
        )
    })?;

    let path = config.output_dir.join(format!(
        "locations_report_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M")
    ));
    let file = File::create(&path)
        .with_context(|| format!("Could not create report {}", path.display()))?;
    write_csv(rows, file)?;

    tracing::info!(path = %path.display(), rows = rows.len(), "CSV report written.");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sync::extract::{
            Config as ExtractConfig,
            crm::CrmLocation,
            listing::ListingLocation,
        },
        chrono::NaiveDate,
        tempfile::TempDir,
    };

    struct FakeSource {
        listings: Vec<ListingLocation>,
        clinics:  Vec<CrmLocation>,
    }

    impl LocationSource for FakeSource {
        fn listing_locations(&self) -> Result<Vec<ListingLocation>> {
            Ok(self.listings.clone())
        }

        fn crm_locations(&self) -> Result<Vec<CrmLocation>> {
            Ok(self.clinics.clone())
        }
    }

    fn context() -> ExtractContext {
        ExtractContext::new(
            &ExtractConfig::default(),
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        )
    }

    fn source() -> Result<FakeSource> {
        Ok(FakeSource {
            listings: serde_json::from_str(
                r#"[
                    { "storeCode": "S2", "openInfo": { "status": "OPEN" }, "metadata": { "placeId": "place-2" },
                      "regularHours": { "periods": [
                        { "openDay": "MONDAY", "openTime": { "hours": 8 }, "closeDay": "MONDAY", "closeTime": { "hours": 12 } },
                        { "openDay": "MONDAY", "openTime": { "hours": 13 }, "closeDay": "MONDAY", "closeTime": { "hours": 17 } }
                      ] } },
                    { "storeCode": "S1", "openInfo": { "status": "OPEN" }, "metadata": { "placeId": "place-1" },
                      "specialHours": { "specialHourPeriods": [
                        { "startDate": { "year": 2026, "month": 12, "day": 25 }, "closed": true }
                      ] } },
                    { "storeCode": "S3", "openInfo": { "status": "CLOSED_PERMANENTLY" } }
                ]"#,
            )?,
            clinics:  serde_json::from_str(
                r#"[
                    { "Name": "Clinic Alpha", "Google_Place_ID__c": "place-1",
                      "BH_MondayStartTime__c": "08:00:00.000Z", "BH_MondayEndTime__c": "17:00:00.000Z",
                      "BH_SpecialDateClosed01__c": "2026-12-25" },
                    { "Name": "Clinic Beta", "Google_Place_ID__c": "place-2",
                      "BH_MondayStartTime__c": "08:00:00.000Z", "BH_MondayEndTime__c": "17:00:00.000Z",
                      "BH_LunchTime_From__c": "12:00:00.000Z", "BH_LunchTime_To__c": "13:00:00.000Z",
                      "BH_MondayLunchTime__c": true }
                ]"#,
            )?,
        })
    }

    #[test]
    fn test_build_report() -> Result<()> {
        let rows = build_report(&source()?, &context())?;

        assert_eq!(
            rows.iter().map(|row| row.crm_name.as_str()).collect::<Vec<_>>(),
            vec!["Clinic Alpha", "Clinic Beta", "NO_CRM_RECORD"]
        );

        let alpha = &rows[0];
        assert_eq!(alpha.store_code, "S1");
        assert_eq!(alpha.listing_regular, "");
        assert_eq!(alpha.crm_regular, "Mon 08:00-17:00");
        assert_eq!(alpha.regular, Verdict::Different);
        assert_eq!(alpha.listing_special, "Closed: Dec 25.");
        assert_eq!(alpha.special, Verdict::Equal);

        let beta = &rows[1];
        assert_eq!(beta.listing_regular, "Mon 08:00-17:00");
        assert_eq!(beta.regular, Verdict::Equal);
        assert_eq!(beta.special, Verdict::Equal);

        let orphan = &rows[2];
        assert!(!orphan.has_place_id);
        assert_eq!(orphan.status, "CLOSED_PERMANENTLY");
        assert_eq!(orphan.crm_regular, "NO_CRM_RECORD");
        assert_eq!(orphan.regular, Verdict::NoCrmRecord);
        assert_eq!(orphan.special, Verdict::NoCrmRecord);
        Ok(())
    }

    #[test]
    fn test_listing_without_crm_record_is_marked() -> Result<()> {
        let source = FakeSource {
            listings: serde_json::from_str(r#"[{ "storeCode": "S9", "metadata": { "placeId": "p9" } }]"#)?,
            clinics:  vec![],
        };
        let rows = build_report(&source, &context())?;

        assert_eq!(rows[0].crm_regular, "NO_CRM_RECORD");
        assert_eq!(rows[0].crm_special, "NO_CRM_RECORD");
        assert_eq!(rows[0].regular, Verdict::NoCrmRecord);
        assert_eq!(rows[0].special, Verdict::NoCrmRecord);
        assert!(!render_table(&rows).contains("DIFFERENT"));
        Ok(())
    }

    #[test]
    fn test_failed_extraction_is_unavailable_not_empty() -> Result<()> {
        let source = FakeSource {
            listings: serde_json::from_str(r#"[{ "storeCode": "S4", "metadata": { "placeId": "p4" } }]"#)?,
            clinics:  serde_json::from_str(
                r#"[{ "Name": "Clinic Four", "Google_Place_ID__c": "p4",
                      "BH_MondayStartTime__c": "eight", "BH_MondayEndTime__c": "17:00:00.000Z" }]"#,
            )?,
        };
        let rows = build_report(&source, &context())?;

        assert_eq!(rows[0].listing_regular, "");
        assert_eq!(rows[0].crm_regular, "UNAVAILABLE");
        assert_eq!(rows[0].regular, Verdict::Unavailable);
        assert_eq!(rows[0].special, Verdict::Equal);
        Ok(())
    }

    #[test]
    fn test_render_table_aligns_columns() -> Result<()> {
        let rows = build_report(&source()?, &context())?;
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Store  CRM name       Status"));
        assert!(lines[1].starts_with("S1     Clinic Alpha   OPEN"));
        assert!(lines[3].starts_with("S3     NO_CRM_RECORD  CLOSED_PERMANENTLY  No"));

        let column = lines[0].find("Regular").unwrap_or_default();
        assert_eq!(&lines[1][column..column + "DIFFERENT".len()], "DIFFERENT");
        assert_eq!(&lines[2][column..column + "EQUAL".len()], "EQUAL");
        Ok(())
    }

    #[test]
    fn test_empty_report_has_header_only() {
        assert_eq!(render_table(&[]).lines().count(), 1);
    }

    #[test]
    fn test_csv_report_round_trips_rows() -> Result<()> {
        let dir = TempDir::new()?;
        let rows = build_report(&source()?, &context())?;

        let path = write_csv_report(&rows, &Config {
            output_dir: dir.path().join("reports"),
        })?;
        assert!(
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("locations_report_") && name.ends_with(".csv"))
        );

        let mut reader = csv::Reader::from_path(&path)?;
        assert_eq!(reader.headers()?.iter().collect::<Vec<_>>(), HEADERS.to_vec());

        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][0], "S1");
        assert_eq!(&records[0][1], "Clinic Alpha");
        assert_eq!(&records[0][6], "DIFFERENT");
        assert_eq!(&records[0][7], "Closed: Dec 25.");
        assert_eq!(&records[2][5], "NO_CRM_RECORD");
        Ok(())
    }
}
