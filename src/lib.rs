/// flood_tracker: flood event detection for roadway water level sensors.
///
/// # Module structure
///
/// ```text
/// flood_tracker
/// ├── model       — shared data types (Reading, SiteId, CandidateEvent, EventRow, …)
/// ├── error       — crate error type
/// ├── config      — tracker.toml loader and collaborator settings from the environment
/// ├── db          — PostgreSQL connection with setup diagnostics
/// ├── analysis
/// │   ├── groupings — flooding filter, per-site grouping, event log aggregation
/// │   ├── segment   — gap-based event segmentation
/// │   ├── reconcile — overlap and in-progress filtering against the event log
/// │   └── numbering — per-site event numbering after the last logged event
/// ├── pictures    — photo correlation
/// │   └── drive   — shared-drive photo archive client
/// ├── store       — collaborator traits
/// │   ├── readings — PostgreSQL reading source
/// │   ├── sheet    — spreadsheet event log (reader and writer)
/// │   └── fixtures (test only) — representative API payloads
/// ├── pipeline    — one run: filter → segment → reconcile → number → pictures → write
/// └── daemon      — collaborator wiring, single runs and watch mode
/// ```

pub mod analysis;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod model;
pub mod pictures;
pub mod pipeline;
pub mod store;
