/// Gap-based flood event segmentation.
///
/// A site's flooding readings are cut into events wherever two consecutive
/// readings are more than `lag` apart. The comparison uses the absolute
/// difference, so a reading that steps slightly backwards in time stays in
/// the current event; a badly misordered series can merge events that should
/// have been separate. Reconciliation relies on exactly this grouping, so it
/// is kept as is.

use chrono::{DateTime, Duration, Utc};

use crate::model::{CandidateEvent, Reading, SiteId};

/// Assigns an event number to every timestamp.
///
/// The first timestamp never splits. Each later timestamp whose absolute
/// distance from its predecessor exceeds `lag` bumps the running count, and
/// the numbers come out as `start + 1, start + 2, ...` with no gaps.
/// Numbers saturate at `u32::MAX`; callers that need them unique check the
/// headroom first (see `numbering::has_headroom`).
pub fn assign_event_numbers(timestamps: &[DateTime<Utc>], start: u32, lag: Duration) -> Vec<u32> {
    let mut numbers = Vec::with_capacity(timestamps.len());
    let mut current = start.saturating_add(1);

    for (i, ts) in timestamps.iter().enumerate() {
        if i > 0 && (*ts - timestamps[i - 1]).abs() > lag {
            current = current.saturating_add(1);
        }
        numbers.push(current);
    }

    numbers
}

/// Partitions one site's readings into candidate events.
///
/// Readings are expected in time order; each returned event holds a
/// contiguous slice of the input in the original order.
pub fn segment(site: &SiteId, readings: &[Reading], start: u32, lag: Duration) -> Vec<CandidateEvent> {
    let timestamps: Vec<DateTime<Utc>> = readings.iter().map(|r| r.date).collect();
    let numbers = assign_event_numbers(&timestamps, start, lag);

    let mut events: Vec<CandidateEvent> = Vec::new();
    for (reading, number) in readings.iter().zip(numbers) {
        match events.last_mut() {
            Some(event) if event.event_number == number => event.readings.push(reading.clone()),
            _ => events.push(CandidateEvent {
                site: site.clone(),
                event_number: number,
                readings: vec![reading.clone()],
            }),
        }
    }

    events
}
