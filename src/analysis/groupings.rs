/// Site grouping and event log aggregation.
///
/// `group_by_site` takes the flat, `(place, date)`-sorted list of readings
/// produced by the reading source and splits it into per-site sequences.
/// `aggregate_records` does the same for the persisted event log, collapsing
/// its per-reading rows into one start/end record per (site, event number).

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::model::{EventRecord, ExistingEventRow, Reading, SiteId};

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Keeps only readings whose adjusted level is strictly above `cutoff`.
pub fn flooding_readings(readings: &[Reading], cutoff: f64) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| r.road_water_level_adj > cutoff)
        .cloned()
        .collect()
}

/// Groups readings by site, keeping each site's readings in input order.
///
/// The map is ordered by site so downstream output is deterministic.
pub fn group_by_site(readings: Vec<Reading>) -> BTreeMap<SiteId, Vec<Reading>> {
    let mut grouped: BTreeMap<SiteId, Vec<Reading>> = BTreeMap::new();

    for reading in readings {
        grouped.entry(reading.site.clone()).or_default().push(reading);
    }

    grouped
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Parses an integer-like event number (`"3"`, `"3.0"`, `" 12 "`).
///
/// Zero, negatives, and fractional values are rejected.
pub fn parse_event_number(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return (n > 0).then_some(n);
    }

    let f: f64 = trimmed.parse().ok()?;
    if f.fract() == 0.0 && f >= 1.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

/// Parses a timestamp as the event log may hold it.
///
/// Accepts RFC 3339, `2023-10-05 12:30:00+00:00` (the format the tracker
/// writes, optionally with fractional seconds), and naive
/// `2023-10-05 12:30:00` values, which are taken as UTC.
pub fn parse_log_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Collapses event log rows into one record per (site, event number).
///
/// Rows with an unparseable event number or date are skipped with a
/// warning. The result is keyed by site; each site's records are sorted by
/// event number.
pub fn aggregate_records(rows: &[ExistingEventRow]) -> HashMap<SiteId, Vec<EventRecord>> {
    let mut bounds: BTreeMap<(SiteId, u32), (DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (Some(event_number), Some(date)) =
            (parse_event_number(&row.flood_event), parse_log_timestamp(&row.date))
        else {
            skipped += 1;
            continue;
        };

        let key = (SiteId::new(row.place.clone(), row.sensor_id.clone()), event_number);
        bounds
            .entry(key)
            .and_modify(|(start, end)| {
                *start = (*start).min(date);
                *end = (*end).max(date);
            })
            .or_insert((date, date));
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped event log rows with unreadable event number or date");
    }

    let mut records: HashMap<SiteId, Vec<EventRecord>> = HashMap::new();
    for ((site, event_number), (start, end)) in bounds {
        records.entry(site.clone()).or_default().push(EventRecord {
            site,
            event_number,
            start,
            end,
        });
    }

    records
}

/// Highest logged event number per site.
///
/// Every row with a readable event number counts, whatever its date, so a
/// number is never handed out twice even when its rows cannot be placed in
/// time. Sites with no readable numbers are absent (numbering starts at 1).
pub fn max_event_numbers(rows: &[ExistingEventRow]) -> HashMap<SiteId, u32> {
    let mut maxima: HashMap<SiteId, u32> = HashMap::new();

    for row in rows {
        let Some(event_number) = parse_event_number(&row.flood_event) else {
            continue;
        };
        maxima
            .entry(SiteId::new(row.place.clone(), row.sensor_id.clone()))
            .and_modify(|max| *max = (*max).max(event_number))
            .or_insert(event_number);
    }

    maxima
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
