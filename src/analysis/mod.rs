/// Flood event analysis.
///
/// Submodules, in pipeline order:
/// - `groupings` — flooding filter, per-site grouping, event log aggregation.
/// - `segment`   — gap-based segmentation into candidate events.
/// - `reconcile` — drops candidates already in the log or still in progress.
/// - `numbering` — renumbers survivors after the highest logged event.

pub mod groupings;
pub mod numbering;
pub mod reconcile;
pub mod segment;
