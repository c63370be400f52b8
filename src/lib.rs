pub mod cli;
pub mod database;
pub mod error;
pub mod export;
pub mod reader;
pub mod samples;
pub mod tcx;
pub mod track;
pub mod types;
pub mod utils;

pub use error::{ExportError, Result};
pub use export::{ExportOptions, ExportSummary, export_activity};
