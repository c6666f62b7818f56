/// Event number assignment for reconciled events.
///
/// Survivors are renumbered by running the gap segmentation again over their
/// readings, seeded with the highest number already in the log. Dropping
/// events during reconciliation only widens the gaps between the ones that
/// remain, so grouping is unchanged while numbering becomes contiguous from
/// `existing_max + 1`.

use chrono::Duration;

use crate::analysis::segment::segment;
use crate::model::CandidateEvent;

/// Renumbers one site's surviving candidates.
///
/// `survivors` must all belong to the same site and be in chronological
/// order. Returns an empty list when there is nothing to number.
pub fn assign_ids(survivors: Vec<CandidateEvent>, existing_max: u32, lag: Duration) -> Vec<CandidateEvent> {
    let Some(site) = survivors.first().map(|c| c.site.clone()) else {
        return Vec::new();
    };

    let readings: Vec<_> = survivors.into_iter().flat_map(|c| c.readings).collect();
    segment(&site, &readings, existing_max, lag)
}

/// Whether `survivors` can be numbered after `existing_max` without running
/// past `u32::MAX`. Renumbering never produces more events than it is given.
pub fn has_headroom(survivors: &[CandidateEvent], existing_max: u32) -> bool {
    u32::try_from(survivors.len())
        .ok()
        .and_then(|n| existing_max.checked_add(n))
        .is_some()
}
