//! Flood Event Tracker
//!
//! Finds new flood events in recent sensor readings and appends them to the
//! event log:
//! 1. Pulls the last few weeks of drift-corrected readings from PostgreSQL
//! 2. Splits flooding readings into events per sensor
//! 3. Drops events already in the log or still in progress
//! 4. Numbers new events after each sensor's last logged event
//! 5. Optionally links each reading to a nearby camera photo
//!
//! Usage:
//!   cargo run --release                        # One run, then exit
//!   cargo run --release -- --watch 60          # Run every 60 minutes
//!   cargo run --release -- --config my.toml    # Alternate configuration
//!   cargo run --release -- --pictures          # Attach photo links
//!   cargo run --release -- --dry-run           # Find events, write nothing
//!
//! Environment:
//!   DATABASE_URL            - PostgreSQL connection string
//!   GOOGLE_ACCESS_TOKEN     - Bearer token for the event log and photo archive
//!   GOOGLE_SHEET_ID         - Event log spreadsheet
//!   GOOGLE_SHEET_RANGE      - Event log range (default: Sheet1)
//!   GOOGLE_DRIVE_ID         - Shared drive holding camera photos (--pictures)
//!   GOOGLE_IMAGES_FOLDER_ID - Images folder on that drive (--pictures)
//!   RUST_LOG                - Log filter (default: info,flood_tracker=debug)

use chrono::Utc;
use flood_tracker::config;
use flood_tracker::daemon::Tracker;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    config_path: Option<PathBuf>,
    watch: Option<Option<u64>>,
    pictures: bool,
    dry_run: bool,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config PATH] [--watch [MINUTES]] [--pictures] [--dry-run]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let program = args.first().map(String::as_str).unwrap_or("flood_tracker");
    let mut parsed = Args {
        config_path: None,
        watch: None,
        pictures: false,
        dry_run: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| format!("--config requires a path\n{}", usage(program)))?;
                parsed.config_path = Some(PathBuf::from(path));
                i += 2;
            }
            "--watch" => {
                match args.get(i + 1).and_then(|v| v.parse::<u64>().ok()) {
                    Some(minutes) => {
                        parsed.watch = Some(Some(minutes));
                        i += 2;
                    }
                    None => {
                        parsed.watch = Some(None);
                        i += 1;
                    }
                }
            }
            "--pictures" => {
                parsed.pictures = true;
                i += 1;
            }
            "--dry-run" => {
                parsed.dry_run = true;
                i += 1;
            }
            other => {
                return Err(format!("Unknown argument: {}\n{}", other, usage(program)));
            }
        }
    }

    Ok(parsed)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flood_tracker=debug")),
        )
        .init();

    println!("🌊 Flood Event Tracker");
    println!("======================\n");

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(1);
        }
    };

    let mut config = match config::load_config(args.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if args.pictures {
        config.attach_pictures = true;
    }

    println!("📊 Connecting collaborators...");
    let tracker = match Tracker::connect(config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("\n❌ Initialization failed: {}\n", e);
            std::process::exit(1);
        }
    };
    let mut tracker = tracker.with_dry_run(args.dry_run);
    println!("✓ Connected\n");

    match args.watch {
        Some(minutes) => {
            let minutes = minutes.unwrap_or(tracker.config().poll_interval_minutes);
            println!("🔄 Running every {} minutes (Ctrl+C to stop)\n", minutes);
            tracker.run(minutes);
        }
        None => match tracker.run_once(Utc::now()) {
            Ok(outcome) => println!("✓ {}", outcome),
            Err(e) => {
                eprintln!("\n❌ Run failed: {}\n", e);
                std::process::exit(1);
            }
        },
    }
}
