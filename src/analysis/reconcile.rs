/// Reconciliation of new candidate events against the event log.
///
/// A candidate survives only if
///
/// 1. its interval does not overlap the padded interval of any event already
///    recorded for the same site, and
/// 2. it has clearly ended: `end + settle_margin` is strictly before the
///    reference time.
///
/// Record intervals are padded by `record_margin` on both ends; candidate
/// intervals are used as is.

use chrono::{DateTime, Duration, Utc};

use crate::model::{CandidateEvent, EventRecord};

/// A time interval used only for overlap tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A zero-length interval at `at`.
    pub fn point(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    /// The interval widened by `margin` on both ends.
    pub fn padded(&self, margin: Duration) -> Self {
        Self {
            start: self.start - margin,
            end: self.end + margin,
        }
    }

    /// Each interval starts strictly before the other ends.
    ///
    /// For intervals with length this is "the later start is strictly before
    /// the earlier end". A zero-length interval overlaps anything that
    /// strictly contains it, but not an interval it merely touches.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Parameters for one reconciliation pass.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileParams {
    pub record_margin: Duration,
    pub settle_margin: Duration,
    pub reference_time: DateTime<Utc>,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Overlaps the recorded event with this number.
    Overlaps(u32),
    /// Ended too close to the reference time.
    InProgress,
}

pub fn candidate_interval(candidate: &CandidateEvent) -> Interval {
    Interval::new(candidate.start(), candidate.end())
}

pub fn record_interval(record: &EventRecord, margin: Duration) -> Interval {
    Interval::new(record.start, record.end).padded(margin)
}

/// Checks a single candidate; `None` means it survives.
pub fn check_candidate(
    candidate: &CandidateEvent,
    records: &[EventRecord],
    params: &ReconcileParams,
) -> Option<Rejection> {
    if candidate.end() + params.settle_margin >= params.reference_time {
        return Some(Rejection::InProgress);
    }

    let interval = candidate_interval(candidate);
    records
        .iter()
        .find(|record| {
            record.site == candidate.site
                && interval.overlaps(&record_interval(record, params.record_margin))
        })
        .map(|record| Rejection::Overlaps(record.event_number))
}

/// Drops overlapping and in-progress candidates, keeping the rest in order.
pub fn reconcile(
    candidates: Vec<CandidateEvent>,
    records: &[EventRecord],
    params: &ReconcileParams,
) -> Vec<CandidateEvent> {
    candidates
        .into_iter()
        .filter(|candidate| match check_candidate(candidate, records, params) {
            None => true,
            Some(Rejection::InProgress) => {
                tracing::debug!(
                    place = %candidate.site.place,
                    sensor_id = %candidate.site.sensor_id,
                    end = %candidate.end(),
                    "Skipping event still in progress"
                );
                false
            }
            Some(Rejection::Overlaps(existing)) => {
                tracing::debug!(
                    place = %candidate.site.place,
                    sensor_id = %candidate.site.sensor_id,
                    start = %candidate.start(),
                    existing,
                    "Skipping event already in the log"
                );
                false
            }
        })
        .collect()
}
