/// Photo correlation for finalized flood events.
///
/// Each site has a camera whose photos are filed by day. For every
/// finalized reading we look in the site's folder for the reading's UTC day
/// and attach the first photo whose capture time falls strictly within
/// `tolerance` of the reading. The capture time comes from the filename,
/// e.g. `CAM_BF_01_20231005123000.jpg`.
///
/// Missing folders and listing failures are logged and the affected
/// readings simply go without a picture.

pub mod drive;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

use crate::analysis::reconcile::Interval;
use crate::error::Result;
use crate::model::{FinalizedEvent, SiteId};

// ---------------------------------------------------------------------------
// Archive interface
// ---------------------------------------------------------------------------

/// One file in the photo archive.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoItem {
    /// Stable identifier used to build a link.
    pub id: String,
    pub name: String,
}

/// Result of looking up one site's photos for one day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayListing {
    MissingSiteFolder,
    MissingDayFolder,
    Photos(Vec<PhotoItem>),
}

/// A photo archive addressed by site, then calendar day.
pub trait PhotoArchive {
    /// Lists the photos filed under `site` for `day`, in archive order.
    fn list_day(&self, site: &SiteId, day: NaiveDate) -> Result<DayListing>;

    /// A retrievable link for `item`.
    fn link_for(&self, item: &PhotoItem) -> String;
}

// ---------------------------------------------------------------------------
// Filename timestamps
// ---------------------------------------------------------------------------

/// Extracts the capture time encoded in a photo filename.
///
/// The timestamp is the last `_`-separated token before the extension.
/// Recognized forms: `20231005123000`, `20231005T123000`,
/// `2023-10-05T12-30-00` and `2023-10-05T12:30:00`, all taken as UTC.
pub fn parse_capture_time(filename: &str) -> Option<DateTime<Utc>> {
    let token = filename.rsplit('_').next()?;
    let token = token.split('.').next()?;

    for fmt in ["%Y%m%d%H%M%S", "%Y%m%dT%H%M%S", "%Y-%m-%dT%H-%M-%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(token, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// First photo whose capture time lies strictly inside the reading window.
pub fn find_match<'a>(
    photos: &'a [PhotoItem],
    reading_time: DateTime<Utc>,
    tolerance: Duration,
) -> Option<&'a PhotoItem> {
    let window = Interval::point(reading_time).padded(tolerance);
    photos.iter().find(|photo| {
        parse_capture_time(&photo.name)
            .is_some_and(|t| Interval::point(t).overlaps(&window))
    })
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Counts from one correlation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationSummary {
    pub readings: usize,
    pub attached: usize,
    pub missing_folders: usize,
}

/// Attaches photo links to the readings of `events` in place.
///
/// The archive is queried once per (site, day).
pub fn correlate(
    events: &mut [FinalizedEvent],
    archive: &dyn PhotoArchive,
    tolerance: Duration,
) -> CorrelationSummary {
    let mut listings: HashMap<(SiteId, NaiveDate), Vec<PhotoItem>> = HashMap::new();
    let mut summary = CorrelationSummary::default();

    for event in events.iter_mut() {
        for finalized in event.readings.iter_mut() {
            summary.readings += 1;
            let day = finalized.reading.date.date_naive();
            let key = (event.site.clone(), day);

            if !listings.contains_key(&key) {
                let photos = match archive.list_day(&event.site, day) {
                    Ok(DayListing::Photos(photos)) => photos,
                    Ok(DayListing::MissingSiteFolder) => {
                        summary.missing_folders += 1;
                        tracing::warn!(
                            place = %event.site.place,
                            sensor_id = %event.site.sensor_id,
                            "No camera folder for this site"
                        );
                        Vec::new()
                    }
                    Ok(DayListing::MissingDayFolder) => {
                        summary.missing_folders += 1;
                        tracing::warn!(
                            place = %event.site.place,
                            sensor_id = %event.site.sensor_id,
                            %day,
                            "No photo folder for this day"
                        );
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::warn!(
                            place = %event.site.place,
                            sensor_id = %event.site.sensor_id,
                            %day,
                            error = %e,
                            "Photo archive listing failed"
                        );
                        Vec::new()
                    }
                };
                listings.insert(key.clone(), photos);
            }

            let photos = listings.get(&key).map(Vec::as_slice).unwrap_or_default();
            if let Some(photo) = find_match(photos, finalized.reading.date, tolerance) {
                finalized.pic_link = Some(archive.link_for(photo));
                summary.attached += 1;
            }
        }
    }

    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{CandidateEvent, Reading};
    use chrono::TimeZone;
    use std::cell::RefCell;

    /// In-memory archive: (sensor id, day) -> photos.
    struct MemoryArchive {
        folders: HashMap<String, HashMap<NaiveDate, Vec<PhotoItem>>>,
        failing_day: Option<NaiveDate>,
        calls: RefCell<usize>,
    }

    impl PhotoArchive for MemoryArchive {
        fn list_day(&self, site: &SiteId, day: NaiveDate) -> Result<DayListing> {
            *self.calls.borrow_mut() += 1;
            if self.failing_day == Some(day) {
                return Err(Error::Parse("listing exploded".into()));
            }
            let Some(days) = self.folders.get(&site.sensor_id) else {
                return Ok(DayListing::MissingSiteFolder);
            };
            match days.get(&day) {
                Some(photos) => Ok(DayListing::Photos(photos.clone())),
                None => Ok(DayListing::MissingDayFolder),
            }
        }

        fn link_for(&self, item: &PhotoItem) -> String {
            format!("mem://{}", item.id)
        }
    }

    fn photo(id: &str, name: &str) -> PhotoItem {
        PhotoItem { id: id.into(), name: name.into() }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, d).unwrap()
    }

    fn archive() -> MemoryArchive {
        let mut days = HashMap::new();
        days.insert(day(5), vec![
            photo("a", "CAM_BF_01_20231005115000.jpg"),
            photo("b", "CAM_BF_01_20231005120300.jpg"),
            photo("c", "CAM_BF_01_20231005120400.jpg"),
            photo("d", "thumbs.db"),
        ]);
        let mut folders = HashMap::new();
        folders.insert("BF_01".to_string(), days);
        MemoryArchive { folders, failing_day: None, calls: RefCell::new(0) }
    }

    fn event(sensor: &str, times: &[DateTime<Utc>]) -> FinalizedEvent {
        let site = SiteId::new("Beaufort", sensor);
        let candidate = CandidateEvent {
            site: site.clone(),
            event_number: 1,
            readings: times
                .iter()
                .map(|t| Reading {
                    site: site.clone(),
                    date: *t,
                    road_water_level_adj: 0.2,
                    road_water_level: 0.25,
                    voltage: 4000.0,
                })
                .collect(),
        };
        FinalizedEvent::from_candidate(candidate, Utc::now())
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_capture_time_forms() {
        let expected = at(5, 12, 30);
        assert_eq!(parse_capture_time("CAM_BF_01_20231005123000.jpg"), Some(expected));
        assert_eq!(parse_capture_time("CAM_BF_01_20231005T123000.jpg"), Some(expected));
        assert_eq!(parse_capture_time("CAM_BF_01_2023-10-05T12-30-00.jpeg"), Some(expected));
        assert_eq!(parse_capture_time("20231005123000.png"), Some(expected));
        assert_eq!(parse_capture_time("CAM_BF_01_latest.jpg"), None);
        assert_eq!(parse_capture_time(""), None);
    }

    #[test]
    fn test_first_photo_in_window_wins() {
        let photos = archive().folders["BF_01"][&day(5)].clone();
        let found = find_match(&photos, at(5, 12, 0), Duration::minutes(5));
        assert_eq!(found.map(|p| p.id.as_str()), Some("b"));
    }

    #[test]
    fn test_photo_exactly_at_tolerance_does_not_match() {
        let photos = vec![photo("edge", "CAM_BF_01_20231005120500.jpg")];
        assert!(find_match(&photos, at(5, 12, 0), Duration::minutes(5)).is_none());
    }

    #[test]
    fn test_correlate_attaches_links_and_queries_once_per_day() {
        let archive = archive();
        let mut events = vec![event("BF_01", &[at(5, 12, 0), at(5, 12, 30), at(5, 11, 52)])];

        let summary = correlate(&mut events, &archive, Duration::minutes(5));

        let links: Vec<Option<&str>> = events[0]
            .readings
            .iter()
            .map(|r| r.pic_link.as_deref())
            .collect();
        assert_eq!(links, vec![Some("mem://b"), None, Some("mem://a")]);
        assert_eq!(summary.attached, 2);
        assert_eq!(summary.readings, 3);
        assert_eq!(*archive.calls.borrow(), 1);
    }

    #[test]
    fn test_missing_folders_are_not_errors() {
        let archive = archive();
        let mut events = vec![
            event("BF_02", &[at(5, 12, 0)]),
            event("BF_01", &[at(6, 12, 0)]),
        ];

        let summary = correlate(&mut events, &archive, Duration::minutes(5));

        assert_eq!(summary.missing_folders, 2);
        assert_eq!(summary.attached, 0);
        assert!(events.iter().all(|e| e.readings.iter().all(|r| r.pic_link.is_none())));
    }

    #[test]
    fn test_listing_failure_skips_only_that_day() {
        let mut archive = archive();
        archive.failing_day = Some(day(6));
        let mut events = vec![event("BF_01", &[at(6, 0, 0), at(5, 12, 1)])];

        let summary = correlate(&mut events, &archive, Duration::minutes(5));

        assert!(events[0].readings[0].pic_link.is_none());
        assert_eq!(events[0].readings[1].pic_link.as_deref(), Some("mem://b"));
        assert_eq!(summary.attached, 1);
    }
}
