/// Flood event pipeline.
///
/// One run takes the readings for the lookback window and the current
/// event log, and produces the rows to append:
///
/// 1. keep flooding readings (`road_water_level_adj > flood_cutoff`)
/// 2. per site, segment into candidate events (numbers from 1)
/// 3. drop candidates already in the log or still in progress
/// 4. renumber survivors after the site's highest logged event
/// 5. optionally attach photo links
/// 6. append the rows to the event log
///
/// Steps 2-4 run per site on a worker pool; sites share nothing, and the
/// results are re-sorted by site after merging so output order does not
/// depend on scheduling.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;
use threadpool::ThreadPool;

use crate::analysis::groupings::{aggregate_records, flooding_readings, group_by_site, max_event_numbers};
use crate::analysis::numbering::{assign_ids, has_headroom};
use crate::analysis::reconcile::{ReconcileParams, reconcile};
use crate::analysis::segment::segment;
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::model::{CandidateEvent, EventRecord, EventRow, ExistingEventRow, FinalizedEvent, Reading, SiteId};
use crate::pictures::{PhotoArchive, correlate};
use crate::store::RecordWriter;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a completed run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No reading was above the flood cutoff.
    NoFlooding,
    /// Flooding was seen, but every event is already logged or still in
    /// progress.
    NothingNew,
    /// New events were found but writing was disabled.
    DryRun { events: usize, rows: usize },
    /// New events were appended to the log.
    Written { events: usize, rows: usize },
    /// New events were found but the log rejected the batch.
    WriteFailed { events: usize, rows: usize, reason: String },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoFlooding => write!(f, "No flooding to update event log"),
            RunOutcome::NothingNew => write!(f, "No new flood events to write"),
            RunOutcome::DryRun { events, rows } => {
                write!(f, "Dry run: {} new flood events ({} rows) not written", events, rows)
            }
            RunOutcome::Written { events, rows } => {
                write!(f, "Wrote {} new flood events ({} rows)", events, rows)
            }
            RunOutcome::WriteFailed { events, rows, reason } => write!(
                f,
                "Failed to write {} new flood events ({} rows): {}",
                events, rows, reason
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-site processing
// ---------------------------------------------------------------------------

/// The processing reference time: `now` minus the configured offset.
pub fn reference_time(now: DateTime<Utc>, config: &TrackerConfig) -> DateTime<Utc> {
    now - config.reference_offset()
}

/// Segments, reconciles, and renumbers one site's flooding readings.
///
/// `existing_max` is the site's highest logged event number, counted over
/// every log row, including rows too malformed to become `records`.
pub fn process_site(
    site: &SiteId,
    readings: &[Reading],
    records: &[EventRecord],
    existing_max: u32,
    config: &TrackerConfig,
    reference_time: DateTime<Utc>,
) -> Result<Vec<CandidateEvent>> {
    let lag = config.event_lag();
    let params = ReconcileParams {
        record_margin: config.record_margin(),
        settle_margin: config.settle_margin(),
        reference_time,
    };

    let candidates = segment(site, readings, 0, lag);
    let found = candidates.len();
    let survivors = reconcile(candidates, records, &params);
    if !has_headroom(&survivors, existing_max) {
        return Err(Error::EventNumbersExhausted {
            site: site.to_string(),
            existing_max,
        });
    }

    let events = assign_ids(survivors, existing_max, lag);
    tracing::info!(
        place = %site.place,
        sensor_id = %site.sensor_id,
        candidates = found,
        new = events.len(),
        existing_max,
        "Processed site"
    );
    Ok(events)
}

/// Runs per-site processing for every site on a worker pool and returns the
/// finalized events ordered by site, then event number.
///
/// Fails if any site fails or any worker panics, so a partial set of new
/// events is never reported as the whole.
pub fn finalize_events(
    flooding: Vec<Reading>,
    existing: &[ExistingEventRow],
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> Result<Vec<FinalizedEvent>> {
    let reference = reference_time(now, config);
    let mut records = aggregate_records(existing);
    let maxima = max_event_numbers(existing);
    let sites = group_by_site(flooding);
    let site_count = sites.len();

    let pool = ThreadPool::new(config.worker_threads.max(1));
    let (tx, rx) = mpsc::channel::<(SiteId, Result<Vec<CandidateEvent>>)>();

    for (site, readings) in sites {
        let site_records = records.remove(&site).unwrap_or_default();
        let existing_max = maxima.get(&site).copied().unwrap_or(0);
        let config = config.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let events = process_site(&site, &readings, &site_records, existing_max, &config, reference);
            // The receiver outlives the pool, so this cannot fail.
            let _ = tx.send((site, events));
        });
    }
    drop(tx);
    pool.join();

    if pool.panic_count() > 0 {
        tracing::error!(panics = pool.panic_count(), "Site workers panicked");
        return Err(Error::WorkerPanic(pool.panic_count()));
    }

    let mut by_site: HashMap<SiteId, Vec<CandidateEvent>> = HashMap::new();
    for (site, result) in rx.iter() {
        by_site.insert(site, result?);
    }
    if by_site.len() < site_count {
        return Err(Error::WorkerPanic(site_count - by_site.len()));
    }

    let mut sites: Vec<SiteId> = by_site.keys().cloned().collect();
    sites.sort();

    Ok(sites
        .into_iter()
        .flat_map(|site| by_site.remove(&site).unwrap_or_default())
        .map(|candidate| FinalizedEvent::from_candidate(candidate, now))
        .collect())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One configured pipeline run.
pub struct Pipeline<'a> {
    config: &'a TrackerConfig,
    archive: Option<&'a dyn PhotoArchive>,
    dry_run: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a TrackerConfig) -> Self {
        Self {
            config,
            archive: None,
            dry_run: false,
        }
    }

    /// Attach photo links from `archive` to every finalized reading.
    pub fn with_archive(mut self, archive: &'a dyn PhotoArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Find events but do not write them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Finds the new events without writing them.
    ///
    /// `None` means no reading was above the flood cutoff.
    pub fn new_events(
        &self,
        readings: &[Reading],
        existing: &[ExistingEventRow],
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<FinalizedEvent>>> {
        let flooding = flooding_readings(readings, self.config.flood_cutoff);
        tracing::info!(
            readings = readings.len(),
            flooding = flooding.len(),
            "Filtered flooding readings"
        );
        if flooding.is_empty() {
            return Ok(None);
        }

        let mut events = finalize_events(flooding, existing, self.config, now)?;

        if let Some(archive) = self.archive {
            if !events.is_empty() {
                let summary = correlate(&mut events, archive, self.config.picture_tolerance());
                tracing::info!(
                    readings = summary.readings,
                    attached = summary.attached,
                    missing_folders = summary.missing_folders,
                    "Correlated photos"
                );
            }
        }

        Ok(Some(events))
    }

    /// Runs the whole pipeline and hands new rows to `writer`.
    ///
    /// A write failure is logged and reported as `WriteFailed`; it is not
    /// retried. Errors are returned only when new events could not be
    /// determined, in which case nothing is written.
    pub fn run(
        &self,
        readings: &[Reading],
        existing: &[ExistingEventRow],
        writer: &mut dyn RecordWriter,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let Some(events) = self.new_events(readings, existing, now)? else {
            return Ok(RunOutcome::NoFlooding);
        };
        if events.is_empty() {
            return Ok(RunOutcome::NothingNew);
        }

        let event_count = events.len();
        let rows: Vec<EventRow> = events.iter().flat_map(FinalizedEvent::to_rows).collect();
        let row_count = rows.len();

        if self.dry_run {
            return Ok(RunOutcome::DryRun { events: event_count, rows: row_count });
        }

        let outcome = match writer.append_rows(rows) {
            Ok(written) => {
                if written != row_count {
                    tracing::warn!(sent = row_count, written, "Event log reported a different row count");
                }
                RunOutcome::Written { events: event_count, rows: written }
            }
            Err(e) => {
                tracing::warn!(error = %e, rows = row_count, "Error writing flood events to event log");
                RunOutcome::WriteFailed {
                    events: event_count,
                    rows: row_count,
                    reason: e.to_string(),
                }
            }
        };
        Ok(outcome)
    }
}
