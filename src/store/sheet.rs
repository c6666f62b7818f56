/// Spreadsheet-backed event log.
///
/// The event log is the first worksheet of a spreadsheet. Row 1 is a header
/// (`place`, `sensor_ID`, `flood_event`, `date`, ...) and every following row
/// is one reading of one recorded flood event. Reads use `values.get` and
/// writes use `values.append`:
///   https://developers.google.com/sheets/api/reference/rest/v4/spreadsheets.values
///
/// Token acquisition is out of scope; a bearer token is supplied by the
/// caller through `SheetSettings`.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SheetSettings;
use crate::error::{Error, Result};
use crate::model::{EventRow, ExistingEventRow};
use crate::store::{EventStore, RecordWriter};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRows")]
    updated_rows: Option<usize>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub fn build_get_url(sheet_id: &str, range: &str) -> String {
    format!(
        "{}/{}/values/{}",
        SHEETS_API_BASE,
        urlencoding::encode(sheet_id),
        urlencoding::encode(range)
    )
}

/// Values are entered as if typed, so numbers and dates keep their types in
/// the sheet.
pub fn build_append_url(sheet_id: &str, range: &str) -> String {
    format!(
        "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
        build_get_url(sheet_id, range)
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn column(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::Parse(format!("event log header has no '{}' column", name)))
}

/// Converts a `values.get` payload into header-keyed event log rows.
///
/// An empty sheet has no rows. Trailing empty cells are omitted by the API,
/// so short rows are padded with empty strings.
pub fn parse_value_range(body: &str) -> Result<Vec<ExistingEventRow>> {
    let range: ValueRange = serde_json::from_str(body)?;
    let mut rows = range.values.into_iter();

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|c| cell_text(Some(c))).collect();

    let place = column(&header, "place")?;
    let sensor = column(&header, "sensor_ID")?;
    let event = column(&header, "flood_event")?;
    let date = column(&header, "date")?;

    Ok(rows
        .filter(|row| row.iter().any(|c| !cell_text(Some(c)).is_empty()))
        .map(|row| ExistingEventRow {
            place: cell_text(row.get(place)),
            sensor_id: cell_text(row.get(sensor)),
            flood_event: cell_text(row.get(event)),
            date: cell_text(row.get(date)),
        })
        .collect())
}

/// Request body for `values.append`.
pub fn append_body(rows: Vec<EventRow>) -> Value {
    let values: Vec<Vec<String>> = rows.into_iter().map(EventRow::into_cells).collect();
    json!({ "values": values })
}

fn parse_append_response(body: &str, requested: usize) -> Result<usize> {
    let response: AppendResponse = serde_json::from_str(body)?;
    Ok(response
        .updates
        .and_then(|u| u.updated_rows)
        .unwrap_or(requested))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct SheetEventLog {
    client: reqwest::blocking::Client,
    settings: SheetSettings,
}

impl SheetEventLog {
    pub fn new(client: reqwest::blocking::Client, settings: SheetSettings) -> Self {
        Self { client, settings }
    }

    fn check(response: reqwest::blocking::Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(Error::Api {
                service: "Sheets",
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl EventStore for SheetEventLog {
    fn existing_rows(&mut self) -> Result<Vec<ExistingEventRow>> {
        let url = build_get_url(&self.settings.sheet_id, &self.settings.range);
        tracing::debug!(%url, "Fetching event log");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .header("Accept", "application/json")
            .send()?;

        let rows = parse_value_range(&Self::check(response)?)?;
        tracing::info!(rows = rows.len(), "Loaded event log");
        Ok(rows)
    }
}

impl RecordWriter for SheetEventLog {
    fn append_rows(&mut self, rows: Vec<EventRow>) -> Result<usize> {
        let requested = rows.len();
        let url = build_append_url(&self.settings.sheet_id, &self.settings.range);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .json(&append_body(rows))
            .send()?;

        parse_append_response(&Self::check(response)?, requested)
    }
}
