//! Reconciler
//!
//! Walks every listing location, pairs it with its CRM record by place id
//! and pushes whatever the CRM says the listing should look like. One
//! location failing never stops the run.

use {
    crate::sync::{
        extract::{
            self,
            ExtractContext,
            listing::ListingLocation,
        },
        reconcile::{
            FacetUpdate,
            UpdateDirective,
            decide_location_update,
        },
        schedule::LocationHours,
        source::{
            LocationSource,
            LocationUpdater,
        },
    },
    anyhow::Result,
    std::fmt,
    tracing::instrument,
};

const EMPTY: &str = "EMPTY";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    NoPlaceId,
    DuplicateListing,
    NoCrmRecord,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoPlaceId => "no place id",
            Self::DuplicateListing => "duplicate listing",
            Self::NoCrmRecord => "no CRM record",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Skipped(SkipReason),
    NoChanges,
    Updated { regular: bool, special: bool },
    Failed(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocationOutcome {
    pub location: String,
    pub outcome:  Outcome,
}

/// Per-location outcomes of one reconciliation run, in listing order.
#[derive(Clone, Debug, Default)]
pub struct ReconcileSummary {
    pub outcomes: Vec<LocationOutcome>,
}

impl ReconcileSummary {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|location| predicate(&location.outcome))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::NoChanges))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed(_)))
    }
}

fn or_empty(display: String) -> String {
    if display.is_empty() {
        EMPTY.to_string()
    } else {
        display
    }
}

fn log_facet<T>(location: &str, facet: &str, update: &FacetUpdate<T>, old: String, new: String) {
    match update {
        FacetUpdate::Replace(_) => {
            tracing::info!(
                location = %location,
                "Update {} - {} -> {}",
                facet,
                or_empty(old),
                or_empty(new),
            );
        }
        FacetUpdate::Skipped => {
            tracing::warn!(
                location = %location,
                facet = %facet,
                "CRM facet unavailable, leaving listing untouched."
            );
        }
        FacetUpdate::Unchanged => {}
    }
}

/// Reconciles every listing location. Only failing to list the mirror's
/// locations aborts the run.
#[instrument(skip_all)]
pub fn reconcile<S, U>(source: &S, updater: &U, context: &ExtractContext) -> Result<ReconcileSummary>
where
    S: LocationSource,
    U: LocationUpdater,
{
    let mut summary = ReconcileSummary::default();

    for location in source.listing_locations()? {
        let name = location.log_name();
        let outcome = match reconcile_location(source, updater, context, &location) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(location = %name, err = ?err, "Reconciliation failed.");
                Outcome::Failed(format!("{err:#}"))
            }
        };
        summary.outcomes.push(LocationOutcome {
            location: name,
            outcome,
        });
    }

    tracing::info!(
        updated = summary.updated(),
        unchanged = summary.unchanged(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "Reconciliation finished."
    );
    Ok(summary)
}

fn reconcile_location<S, U>(
    source: &S,
    updater: &U,
    context: &ExtractContext,
    location: &ListingLocation,
) -> Result<Outcome>
where
    S: LocationSource,
    U: LocationUpdater,
{
    let name = location.log_name();

    let Some(place_id) = location.place_id() else {
        tracing::info!(location = %name, "Skipping location without place id.");
        return Ok(Outcome::Skipped(SkipReason::NoPlaceId));
    };

    if location.is_duplicate() {
        tracing::info!(location = %name, "Skipping duplicate listing.");
        return Ok(Outcome::Skipped(SkipReason::DuplicateListing));
    }

    let Some(clinic) = source.crm_location_by_place_id(place_id)? else {
        tracing::info!(location = %name, place_id = %place_id, "Skipping location without CRM record.");
        return Ok(Outcome::Skipped(SkipReason::NoCrmRecord));
    };

    let mirror = extract::listing_hours(location, context);
    let truth = extract::crm_hours(&clinic, context);
    let directive = decide_location_update(&mirror, &truth)?;

    log_directive(&name, &directive, &mirror, &truth);

    if directive.is_noop() {
        tracing::info!(location = %name, "No changes.");
        return Ok(Outcome::NoChanges);
    }

    let resource = location.name.as_deref().unwrap_or(name.as_str());
    updater.push(resource, &directive)?;

    Ok(Outcome::Updated {
        regular: directive.regular_hours.is_changed(),
        special: directive.special_hours.is_changed(),
    })
}

fn log_directive(
    location: &str,
    directive: &UpdateDirective,
    mirror: &LocationHours,
    truth: &LocationHours,
) {
    log_facet(
        location,
        "regular",
        &directive.regular_hours,
        mirror.weekly_display(true),
        truth.weekly_display(true),
    );
    log_facet(
        location,
        "special",
        &directive.special_hours,
        mirror.exceptions_display(),
        truth.exceptions_display(),
    );
}
