/// Tracker daemon
///
/// Wires the collaborators to the pipeline:
/// 1. Connects to the readings database and validates the readings view
/// 2. Pulls the trailing window of readings and the current event log
/// 3. Runs the pipeline and appends new events
/// 4. Optionally repeats on a fixed interval
///
/// A failed fetch aborts that run only; in watch mode the next run is
/// attempted on schedule.

use chrono::{DateTime, Utc};
use std::thread;
use std::time::Duration as StdDuration;

use crate::config::{ArchiveSettings, SheetSettings, TrackerConfig};
use crate::db;
use crate::error::Result;
use crate::pictures::PhotoArchive;
use crate::pictures::drive::DriveArchive;
use crate::pipeline::{Pipeline, RunOutcome};
use crate::store::readings::PgReadingSource;
use crate::store::sheet::SheetEventLog;
use crate::store::{EventStore, ReadingSource, RecordWriter};

const HTTP_TIMEOUT_SECS: u64 = 60;

/// Main tracker state
pub struct Tracker {
    config: TrackerConfig,
    source: Box<dyn ReadingSource>,
    store: Box<dyn EventStore>,
    writer: Box<dyn RecordWriter>,
    archive: Option<Box<dyn PhotoArchive>>,
    dry_run: bool,
}

impl Tracker {
    /// Create a tracker from explicit collaborators
    pub fn new(
        config: TrackerConfig,
        source: Box<dyn ReadingSource>,
        store: Box<dyn EventStore>,
        writer: Box<dyn RecordWriter>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            writer,
            archive: None,
            dry_run: false,
        }
    }

    pub fn with_archive(mut self, archive: Box<dyn PhotoArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Connect the production collaborators from the environment.
    ///
    /// The photo archive is only configured when `config.attach_pictures`
    /// is set.
    pub fn connect(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let client = db::connect_and_verify()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        let sheet = SheetSettings::from_env()?;
        let store = SheetEventLog::new(http.clone(), sheet.clone());
        let writer = SheetEventLog::new(http.clone(), sheet);

        let attach = config.attach_pictures;
        let mut tracker = Self::new(
            config,
            Box::new(PgReadingSource::new(client)),
            Box::new(store),
            Box::new(writer),
        );

        if attach {
            let archive = DriveArchive::new(http, ArchiveSettings::from_env()?);
            tracker = tracker.with_archive(Box::new(archive));
        }

        Ok(tracker)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// One full pass: fetch, process, write.
    pub fn run_once(&mut self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let start = now - self.config.lookback();
        let readings = self.source.fetch_readings(start, now)?;
        let existing = self.store.existing_rows()?;

        let mut pipeline = Pipeline::new(&self.config).dry_run(self.dry_run);
        if let Some(archive) = self.archive.as_deref() {
            pipeline = pipeline.with_archive(archive);
        }

        let outcome = pipeline.run(&readings, &existing, self.writer.as_mut(), now)?;
        match &outcome {
            RunOutcome::WriteFailed { .. } => tracing::warn!("{}", outcome),
            _ => tracing::info!("{}", outcome),
        }
        Ok(outcome)
    }

    /// Run forever, one pass every `interval_minutes`.
    pub fn run(&mut self, interval_minutes: u64) -> ! {
        let interval = StdDuration::from_secs(interval_minutes.max(1) * 60);

        loop {
            if let Err(e) = self.run_once(Utc::now()) {
                tracing::error!(error = %e, "Tracker run failed");
            }
            tracing::debug!(minutes = interval_minutes, "Sleeping until next run");
            thread::sleep(interval);
        }
    }
}
