/// Shared-drive photo archive client.
///
/// Photos live on a shared drive under a single images folder:
///
/// ```text
/// <images folder>/
///   CAM_<sensor_id>/
///     2023-10-05/
///       CAM_<sensor_id>_20231005123000.jpg
/// ```
///
/// Folders are resolved by name with the Drive v3 `files.list` endpoint:
///   https://developers.google.com/drive/api/reference/rest/v3/files/list
///
/// Token acquisition is out of scope; a bearer token is supplied by the
/// caller through `ArchiveSettings`.

use chrono::NaiveDate;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::ArchiveSettings;
use crate::error::{Error, Result};
use crate::model::SiteId;
use crate::pictures::{DayListing, PhotoArchive, PhotoItem};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const OPEN_LINK_BASE: &str = "https://drive.google.com/open?id=";

// ---------------------------------------------------------------------------
// Serde structures for files.list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

/// Name of the folder holding a site's photos.
pub fn camera_folder_name(site: &SiteId) -> String {
    format!("CAM_{}", site.sensor_id)
}

/// Name of the folder holding one day's photos.
pub fn day_folder_name(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query for a child folder called `name` under `parent_id`.
pub fn folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "name='{}' and mimeType='{}' and '{}' in parents and trashed = false",
        escape_query_value(name),
        FOLDER_MIME_TYPE,
        escape_query_value(parent_id)
    )
}

/// Query for every file directly under `parent_id`.
pub fn children_query(parent_id: &str) -> String {
    format!("'{}' in parents and trashed = false", escape_query_value(parent_id))
}

/// Builds a `files.list` URL scoped to one shared drive.
pub fn build_list_url(drive_id: &str, query: &str, page_token: Option<&str>) -> String {
    let mut url = format!(
        "{}?corpora=drive&driveId={}&includeItemsFromAllDrives=true&supportsAllDrives=true\
         &pageSize=1000&fields={}&q={}",
        DRIVE_FILES_URL,
        urlencoding::encode(drive_id),
        urlencoding::encode("nextPageToken,files(id,name)"),
        urlencoding::encode(query)
    );
    if let Some(token) = page_token {
        url.push_str("&pageToken=");
        url.push_str(&urlencoding::encode(token));
    }
    url
}

fn parse_file_list(body: &str) -> Result<FileList> {
    Ok(serde_json::from_str(body)?)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Photo archive backed by a shared drive.
///
/// Camera folder ids are resolved once per folder name and remembered for
/// the archive's lifetime, including folders found to be missing.
pub struct DriveArchive {
    client: reqwest::blocking::Client,
    settings: ArchiveSettings,
    camera_folders: RefCell<HashMap<String, Option<String>>>,
}

impl DriveArchive {
    pub fn new(client: reqwest::blocking::Client, settings: ArchiveSettings) -> Self {
        Self {
            client,
            settings,
            camera_folders: RefCell::new(HashMap::new()),
        }
    }

    /// Runs a `files.list` query, following pagination.
    fn list(&self, query: &str) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = build_list_url(&self.settings.drive_id, query, page_token.as_deref());
            tracing::debug!(%query, "Listing photo archive");

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.settings.access_token)
                .header("Accept", "application/json")
                .send()?;

            let status = response.status();
            let body = response.text()?;
            if !status.is_success() {
                return Err(Error::Api {
                    service: "Drive",
                    status: status.as_u16(),
                    body,
                });
            }

            let page = parse_file_list(&body)?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<String>> {
        let folders = self.list(&folder_query(parent_id, name))?;
        Ok(folders.into_iter().next().map(|f| f.id))
    }

    /// Cached camera folder id for `site`; `lookup` runs on a cache miss.
    fn camera_folder_with<F>(&self, site: &SiteId, lookup: F) -> Result<Option<String>>
    where
        F: FnOnce(&str) -> Result<Option<String>>,
    {
        let name = camera_folder_name(site);
        let cached = self.camera_folders.borrow().get(&name).cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = lookup(&name)?;
        self.camera_folders.borrow_mut().insert(name, id.clone());
        Ok(id)
    }

    fn camera_folder(&self, site: &SiteId) -> Result<Option<String>> {
        self.camera_folder_with(site, |name| self.find_folder(&self.settings.images_folder_id, name))
    }
}

impl PhotoArchive for DriveArchive {
    fn list_day(&self, site: &SiteId, day: NaiveDate) -> Result<DayListing> {
        let Some(camera_id) = self.camera_folder(site)? else {
            return Ok(DayListing::MissingSiteFolder);
        };

        let Some(day_id) = self.find_folder(&camera_id, &day_folder_name(day))? else {
            return Ok(DayListing::MissingDayFolder);
        };

        let photos = self
            .list(&children_query(&day_id))?
            .into_iter()
            .map(|f| PhotoItem { id: f.id, name: f.name })
            .collect();

        Ok(DayListing::Photos(photos))
    }

    fn link_for(&self, item: &PhotoItem) -> String {
        format!("{}{}", OPEN_LINK_BASE, item.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{fixture_drive_empty_json, fixture_drive_photos_json};

    #[test]
    fn test_folder_names() {
        let site = SiteId::new("Beaufort", "BF_01");
        assert_eq!(camera_folder_name(&site), "CAM_BF_01");
        assert_eq!(
            day_folder_name(NaiveDate::from_ymd_opt(2023, 10, 5).unwrap()),
            "2023-10-05"
        );
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        let q = folder_query("root123", "CAM_O'Neil");
        assert!(q.contains("name='CAM_O\\'Neil'"), "got: {}", q);
        assert!(q.contains("'root123' in parents"));
        assert!(q.contains(FOLDER_MIME_TYPE));
    }

    #[test]
    fn test_list_url_is_scoped_to_drive_and_encoded() {
        let url = build_list_url("drive-1", "'abc' in parents", None);
        assert!(url.starts_with(DRIVE_FILES_URL));
        assert!(url.contains("driveId=drive-1"));
        assert!(url.contains("supportsAllDrives=true"));
        assert!(url.contains("q=%27abc%27%20in%20parents"));
        assert!(!url.contains("pageToken"));

        let url = build_list_url("drive-1", "x", Some("tok/2"));
        assert!(url.ends_with("&pageToken=tok%2F2"));
    }

    #[test]
    fn test_parse_file_list_with_next_page() {
        let page = parse_file_list(fixture_drive_photos_json()).expect("fixture should parse");
        assert_eq!(page.files.len(), 2);
        assert_eq!(page.files[0].name, "CAM_BF_01_20231005120300.jpg");
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_parse_empty_file_list() {
        let page = parse_file_list(fixture_drive_empty_json()).expect("fixture should parse");
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }

    fn offline_archive() -> DriveArchive {
        DriveArchive::new(
            reqwest::blocking::Client::new(),
            ArchiveSettings {
                drive_id: "d".into(),
                images_folder_id: "i".into(),
                access_token: "t".into(),
            },
        )
    }

    #[test]
    fn test_camera_folder_resolved_once_per_sensor() {
        let archive = offline_archive();
        let lookups = RefCell::new(Vec::new());
        let lookup = |name: &str| {
            lookups.borrow_mut().push(name.to_string());
            Ok(Some(format!("id-{}", name)))
        };

        let site = SiteId::new("Beaufort", "BF_01");
        let first = archive.camera_folder_with(&site, lookup).expect("lookup should succeed");
        let second = archive.camera_folder_with(&site, lookup).expect("cache hit");
        assert_eq!(first.as_deref(), Some("id-CAM_BF_01"));
        assert_eq!(second, first);

        let other = SiteId::new("Beaufort", "BF_02");
        archive.camera_folder_with(&other, lookup).expect("lookup should succeed");
        assert_eq!(*lookups.borrow(), vec!["CAM_BF_01", "CAM_BF_02"]);
    }

    #[test]
    fn test_missing_camera_folder_is_remembered() {
        let archive = offline_archive();
        let site = SiteId::new("Beaufort", "BF_09");
        let missing = archive
            .camera_folder_with(&site, |_| Ok(None))
            .expect("lookup should succeed");
        assert!(missing.is_none());

        // Served from cache, so no request is made for either day.
        for d in [5, 6] {
            let listing = archive
                .list_day(&site, NaiveDate::from_ymd_opt(2023, 10, d).unwrap())
                .expect("cached miss needs no request");
            assert!(matches!(listing, DayListing::MissingSiteFolder));
        }
    }

    #[test]
    fn test_failed_lookup_is_not_cached() {
        let archive = offline_archive();
        let site = SiteId::new("Beaufort", "BF_01");
        let failed = archive.camera_folder_with(&site, |_| Err(Error::Parse("boom".into())));
        assert!(failed.is_err());

        let retried = archive
            .camera_folder_with(&site, |_| Ok(Some("cam-1".into())))
            .expect("retry should succeed");
        assert_eq!(retried.as_deref(), Some("cam-1"));
    }

    #[test]
    fn test_link_uses_open_url() {
        let archive = offline_archive();
        let item = PhotoItem { id: "1AbC".into(), name: "x.jpg".into() };
        assert_eq!(archive.link_for(&item), "https://drive.google.com/open?id=1AbC");
    }
}
