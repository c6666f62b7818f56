/// Core data types for the flood event tracker.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types and a few formatting helpers for the
/// rows handed to the event log.

use chrono::{DateTime, Utc};
use std::fmt;

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// A monitoring site: a (place, sensor) pair.
///
/// All gap detection and event numbering is scoped to one site. Ordering is
/// by place first, then sensor id, which keeps output deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId {
    pub place: String,
    pub sensor_id: String,
}

impl SiteId {
    pub fn new(place: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self {
            place: place.into(),
            sensor_id: sensor_id.into(),
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.place, self.sensor_id)
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single water level measurement as supplied by the reading source.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub site: SiteId,
    pub date: DateTime<Utc>,
    pub road_water_level_adj: f64,
    pub road_water_level: f64,
    pub voltage: f64,
}

impl Reading {
    /// Raw minus drift-corrected water level.
    pub fn drift(&self) -> f64 {
        self.road_water_level - self.road_water_level_adj
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A burst of readings at one site that has not yet been checked against
/// the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvent {
    pub site: SiteId,
    pub event_number: u32,
    pub readings: Vec<Reading>,
}

impl CandidateEvent {
    /// Earliest reading time. Candidates are never built empty.
    pub fn start(&self) -> DateTime<Utc> {
        self.readings
            .iter()
            .map(|r| r.date)
            .min()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Latest reading time.
    pub fn end(&self) -> DateTime<Utc> {
        self.readings
            .iter()
            .map(|r| r.date)
            .max()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// One raw row of the persisted event log, before any parsing.
///
/// The log stores everything as text; `flood_event` is integer-like
/// (`"3"` or `"3.0"`) and `date` is whatever the writer rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingEventRow {
    pub place: String,
    pub sensor_id: String,
    pub flood_event: String,
    pub date: String,
}

/// A previously recorded event, aggregated from its log rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub site: SiteId,
    pub event_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A reading that made it through reconciliation and numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedReading {
    pub reading: Reading,
    pub drift: f64,
    pub pic_link: Option<String>,
}

/// A genuinely new flood event, ready to be appended to the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedEvent {
    pub site: SiteId,
    pub event_number: u32,
    pub readings: Vec<FinalizedReading>,
    pub date_added: DateTime<Utc>,
}

impl FinalizedEvent {
    pub fn from_candidate(candidate: CandidateEvent, date_added: DateTime<Utc>) -> Self {
        let readings = candidate
            .readings
            .into_iter()
            .map(|reading| FinalizedReading {
                drift: reading.drift(),
                reading,
                pic_link: None,
            })
            .collect();

        Self {
            site: candidate.site,
            event_number: candidate.event_number,
            readings,
            date_added,
        }
    }

    /// Flattens the event into log rows, one per reading, in reading order.
    pub fn to_rows(&self) -> Vec<EventRow> {
        self.readings
            .iter()
            .map(|r| EventRow {
                place: self.site.place.clone(),
                sensor_id: self.site.sensor_id.clone(),
                flood_event: self.event_number.to_string(),
                date: format_timestamp(r.reading.date),
                road_water_level_adj: format_measurement(r.reading.road_water_level_adj),
                road_water_level: format_measurement(r.reading.road_water_level),
                drift: format_measurement(r.drift),
                voltage: format_measurement(r.reading.voltage),
                pic_links: r.pic_link.clone().unwrap_or_default(),
                date_added: format_timestamp(self.date_added),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// Column order of the event log.
pub const EVENT_LOG_COLUMNS: [&str; 10] = [
    "place",
    "sensor_ID",
    "flood_event",
    "date",
    "road_water_level_adj",
    "road_water_level",
    "drift",
    "voltage",
    "pic_links",
    "date_added",
];

/// A finalized reading rendered as text, ready for the record writer.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub place: String,
    pub sensor_id: String,
    pub flood_event: String,
    pub date: String,
    pub road_water_level_adj: String,
    pub road_water_level: String,
    pub drift: String,
    pub voltage: String,
    pub pic_links: String,
    pub date_added: String,
}

impl EventRow {
    /// Cells in `EVENT_LOG_COLUMNS` order.
    pub fn into_cells(self) -> Vec<String> {
        vec![
            self.place,
            self.sensor_id,
            self.flood_event,
            self.date,
            self.road_water_level_adj,
            self.road_water_level,
            self.drift,
            self.voltage,
            self.pic_links,
            self.date_added,
        ]
    }
}

/// Renders a timestamp the way the event log has always stored them,
/// e.g. `2023-10-05 12:30:00+00:00`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

/// Renders a measurement with at most six decimals and no trailing zeros,
/// so float noise from the drift subtraction stays out of the log.
pub fn format_measurement(value: f64) -> String {
    let fixed = format!("{:.6}", value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
