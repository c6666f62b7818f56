/// PostgreSQL reading source.
///
/// Reads drift-corrected measurements from the `data_for_display` view for a
/// trailing window. Duplicate rows are collapsed in SQL and the result comes
/// back ordered by (place, date), which is the order segmentation needs once
/// readings are split per sensor.

use chrono::{DateTime, Utc};
use postgres::{Client, Row};

use crate::error::Result;
use crate::model::{Reading, SiteId};
use crate::store::ReadingSource;

const READINGS_QUERY: &str = "SELECT DISTINCT place, \"sensor_ID\", date, \
        road_water_level_adj::float8, road_water_level::float8, voltage::float8 \
     FROM data_for_display \
     WHERE date >= $1 AND date <= $2 \
     ORDER BY place, date";

pub struct PgReadingSource {
    client: Client,
}

impl PgReadingSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Converts one result row, skipping rows with missing measurements.
fn reading_from_row(row: &Row) -> Option<Reading> {
    let place: Option<String> = row.get(0);
    let sensor_id: Option<String> = row.get(1);
    let date: Option<DateTime<Utc>> = row.get(2);
    let adj: Option<f64> = row.get(3);
    let raw: Option<f64> = row.get(4);
    let voltage: Option<f64> = row.get(5);

    Some(Reading {
        site: SiteId::new(place?, sensor_id?),
        date: date?,
        road_water_level_adj: adj?,
        road_water_level: raw?,
        voltage: voltage?,
    })
}

impl ReadingSource for PgReadingSource {
    fn fetch_readings(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Reading>> {
        tracing::info!(%start, %end, "Querying readings");
        let rows = self.client.query(READINGS_QUERY, &[&start, &end])?;

        let total = rows.len();
        let readings: Vec<Reading> = rows.iter().filter_map(reading_from_row).collect();
        if readings.len() < total {
            tracing::warn!(
                skipped = total - readings.len(),
                "Skipped readings with missing values"
            );
        }

        Ok(readings)
    }
}
