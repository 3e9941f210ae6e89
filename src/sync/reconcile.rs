//! One-way reconciliation decision between a mirror and a truth system.
//!
//! Facets are compared by canonical hash only and, when they differ, the
//! truth side's whole canonical payload is scheduled for replacement. No I/O
//! happens here; pushing a directive is the updater's job.

use {
    crate::sync::{
        error::Result,
        schedule::{
            LocationHours,
            canonical::Canonical,
            date_exceptions::{
                DateException,
                DateExceptions,
            },
            weekly_hours::{
                Period,
                WeeklyHours,
            },
        },
    },
    serde::Serialize,
};

/// What to do with one facet of the mirror.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum FacetUpdate<T> {
    /// Both sides agree, or neither side has the facet.
    Unchanged,
    /// The truth side could not provide the facet, so equality cannot be
    /// established and there is nothing to push.
    Skipped,
    /// Replace the mirror's facet wholesale with this canonical payload.
    Replace(T),
}

impl<T> FacetUpdate<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Replace(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Replace(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Per-facet instructions for the updater.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirective {
    pub regular_hours: FacetUpdate<Vec<Period>>,
    pub special_hours: FacetUpdate<Vec<DateException>>,
}

impl UpdateDirective {
    pub fn noop() -> Self {
        Self {
            regular_hours: FacetUpdate::Unchanged,
            special_hours: FacetUpdate::Unchanged,
        }
    }

    /// True when nothing has to be pushed.
    pub fn is_noop(&self) -> bool {
        !self.regular_hours.is_changed() && !self.special_hours.is_changed()
    }
}

/// Facet equality: hashes match, or both sides are missing. A facet that is
/// missing on exactly one side is never equal to anything.
pub fn compare_facet<F: Canonical>(a: Option<&F>, b: Option<&F>) -> Result<bool> {
    match (a, b) {
        (None, None) => Ok(true),
        (Some(a), Some(b)) => a.canonical_eq(b),
        _ => Ok(false),
    }
}

/// Decides how the mirror's facet must change to match the truth's.
pub fn decide_facet<F: Canonical>(
    mirror: Option<&F>,
    truth: Option<&F>,
) -> Result<FacetUpdate<Vec<F::Item>>> {
    if compare_facet(mirror, truth)? {
        return Ok(FacetUpdate::Unchanged);
    }
    Ok(match truth {
        Some(truth) => FacetUpdate::Replace(truth.canonical_items()),
        None => FacetUpdate::Skipped,
    })
}

/// Truth flows to mirror, never the other way round. Each facet is decided
/// independently.
pub fn decide_update(
    mirror_weekly: Option<&WeeklyHours>,
    mirror_exceptions: Option<&DateExceptions>,
    truth_weekly: Option<&WeeklyHours>,
    truth_exceptions: Option<&DateExceptions>,
) -> Result<UpdateDirective> {
    Ok(UpdateDirective {
        regular_hours: decide_facet(mirror_weekly, truth_weekly)?,
        special_hours: decide_facet(mirror_exceptions, truth_exceptions)?,
    })
}

/// `decide_update` over two extracted locations.
pub fn decide_location_update(
    mirror: &LocationHours,
    truth: &LocationHours,
) -> Result<UpdateDirective> {
    decide_update(
        mirror.weekly.as_ref(),
        mirror.exceptions.as_ref(),
        truth.weekly.as_ref(),
        truth.exceptions.as_ref(),
    )
}
