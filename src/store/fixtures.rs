/// Test fixtures: representative JSON payloads from the event log and photo
/// archive APIs.
///
/// These are trimmed to the fields the parsers read.
///
/// Sheets `values.get` shape:
///   { "range": "...", "majorDimension": "ROWS", "values": [[header...], [row...], ...] }
///   Cells are formatted strings unless the sheet holds raw numbers. Rows
///   drop trailing empty cells.
///
/// Drive `files.list` shape:
///   { "nextPageToken": "...", "files": [{ "id": "...", "name": "..." }, ...] }

/// Event log with two events at BF_01 and one at BF_02, plus a blank row.
pub(crate) fn fixture_event_log_json() -> &'static str {
    r#"{
      "range": "Sheet1!A1:J6",
      "majorDimension": "ROWS",
      "values": [
        ["place", "sensor_ID", "flood_event", "date", "road_water_level_adj", "road_water_level", "drift", "voltage", "pic_links", "date_added"],
        ["Beaufort", "BF_01", "1", "2023-10-05 10:00:00+00:00", "0.12", "0.2", "0.08", "4012", "", "2023-10-06 02:00:00"],
        ["Beaufort", "BF_01", "1", "2023-10-05 11:00:00+00:00", "0.31", "0.4", "0.09", "4010", "https://drive.google.com/open?id=1AbC", "2023-10-06 02:00:00"],
        [],
        ["Beaufort", "BF_02", 2, "2023-10-07 03:00:00+00:00", "0.05", "0.1", "0.05", "3998"]
      ]
    }"#
}

/// A row whose date and later cells were left blank.
pub(crate) fn fixture_event_log_short_row_json() -> &'static str {
    r#"{
      "range": "Sheet1!A1:J2",
      "majorDimension": "ROWS",
      "values": [
        ["place", "sensor_ID", "flood_event", "date"],
        ["Beaufort", "BF_01", "3"]
      ]
    }"#
}

/// A sheet with nothing in it; the API omits `values` entirely.
pub(crate) fn fixture_event_log_empty_json() -> &'static str {
    r#"{ "range": "Sheet1!A1:Z1000", "majorDimension": "ROWS" }"#
}

/// Successful `values.append` response.
pub(crate) fn fixture_append_response_json() -> &'static str {
    r#"{
      "spreadsheetId": "abc123",
      "tableRange": "Sheet1!A1:J3",
      "updates": {
        "spreadsheetId": "abc123",
        "updatedRange": "Sheet1!A4:J6",
        "updatedRows": 3,
        "updatedColumns": 10,
        "updatedCells": 30
      }
    }"#
}

/// First page of a day folder listing.
pub(crate) fn fixture_drive_photos_json() -> &'static str {
    r#"{
      "nextPageToken": "page-2",
      "files": [
        { "id": "1AbC", "name": "CAM_BF_01_20231005120300.jpg" },
        { "id": "1DeF", "name": "CAM_BF_01_20231005121800.jpg" }
      ]
    }"#
}

/// A folder lookup that found nothing.
pub(crate) fn fixture_drive_empty_json() -> &'static str {
    r#"{ "files": [] }"#
}
