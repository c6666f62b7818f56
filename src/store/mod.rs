/// Collaborator boundaries for the tracker.
///
/// The event pipeline never touches a database or an HTTP API directly; it
/// talks to these traits. Concrete adapters:
///
/// - `readings::PgReadingSource` — drift-corrected readings from PostgreSQL
/// - `sheet::SheetEventLog`      — the spreadsheet that holds the event log
/// - `fixtures` (test only)      — representative API payloads

pub mod readings;
pub mod sheet;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{EventRow, ExistingEventRow, Reading};

/// Supplies readings for a time window, deduplicated and sorted by
/// (place, date).
pub trait ReadingSource {
    fn fetch_readings(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Reading>>;
}

/// Supplies the rows already written to the event log.
pub trait EventStore {
    fn existing_rows(&mut self) -> Result<Vec<ExistingEventRow>>;
}

/// Appends finalized rows to the event log as one batch.
///
/// Returns the number of rows the log reports as written.
pub trait RecordWriter {
    fn append_rows(&mut self, rows: Vec<EventRow>) -> Result<usize>;
}
