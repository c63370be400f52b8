use crate::export::ExportOptions;
use crate::track::{DEFAULT_MERGE_WINDOW_MS, DEFAULT_NEAREST_WINDOW_MS};
use crate::types::Sport;
use chrono::Duration;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nrc2tcx",
    about = "Export one Nike Run Club activity from its SQLite store to a TCX file"
)]
pub struct Cli {
    /// Path to the app's SQLite database (e.g. activityStore.sqlite).
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// `uniqueID` of the activity to export.
    #[arg(value_name = "ACTIVITY_ID", value_parser = clap::value_parser!(i64).range(1..))]
    pub activity_id: i64,

    /// Where to write the TCX file. Overwritten if it exists.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Samples within this many milliseconds of a trackpoint are merged into it.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_MERGE_WINDOW_MS,
          value_parser = clap::value_parser!(i64).range(0..=60_000))]
    pub merge_window_ms: i64,

    /// GPS trackpoints without heart rate or cadence take the nearest reading
    /// within this many milliseconds. 0 disables.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_NEAREST_WINDOW_MS,
          value_parser = clap::value_parser!(i64).range(0..=60_000))]
    pub nearest_window_ms: i64,

    /// TCX sport of the exported activity.
    #[arg(long, value_enum, default_value_t = Sport::Running)]
    pub sport: Sport,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

impl Cli {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            merge_window: Duration::milliseconds(self.merge_window_ms),
            nearest_window: Duration::milliseconds(self.nearest_window_ms),
            sport: self.sport,
        }
    }
}
