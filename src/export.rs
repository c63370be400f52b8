use crate::database::{open_readonly, read_activity, read_metric_rows};
use crate::error::{ExportError, Result};
use crate::samples;
use crate::tcx::{render, write_tcx_file};
use crate::track::{DEFAULT_MERGE_WINDOW_MS, DEFAULT_NEAREST_WINDOW_MS, TrackBuilder};
use crate::types::Sport;
use crate::utils::format_duration;
use chrono::Duration;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Samples closer than this to a trackpoint's opening time join it.
    pub merge_window: Duration,
    /// How far a position trackpoint looks for heart rate and cadence.
    pub nearest_window: Duration,
    pub sport: Sport,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            merge_window: Duration::milliseconds(DEFAULT_MERGE_WINDOW_MS),
            nearest_window: Duration::milliseconds(DEFAULT_NEAREST_WINDOW_MS),
            sport: Sport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub samples: usize,
    pub skipped_rows: usize,
    pub trackpoints: usize,
}

/// Export one activity from the app database at `db_path` to a TCX file.
///
/// Nothing is written unless every stage succeeds.
pub fn export_activity(
    db_path: &Path,
    activity_id: i64,
    output: &Path,
    opts: &ExportOptions,
) -> Result<ExportSummary> {
    if activity_id <= 0 {
        return Err(ExportError::InvalidInput(format!(
            "activity id must be a positive integer, got {activity_id}"
        )));
    }

    let conn = open_readonly(db_path)?;
    let activity = read_activity(&conn, activity_id, db_path)?;
    tracing::info!(
        activity_id,
        start = %activity.start.to_rfc3339(),
        duration = %format_duration(activity.end - activity.start),
        distance_m = ?activity.distance_m,
        "found activity"
    );
    if activity.server_id.is_none() {
        tracing::info!(activity_id, "activity was never synced to the app's server");
    }

    let rows = read_metric_rows(&conn, activity_id)?;
    drop(conn);

    let classified = samples::classify(&activity, &rows);
    samples::report(activity_id, &classified);

    let track = TrackBuilder::new(&activity, &classified.samples, opts.merge_window)
        .with_nearest_window(opts.nearest_window);
    let trackpoints = track.iter().count();
    if trackpoints == 0 {
        tracing::warn!(activity_id, "no usable samples; writing header-only TCX");
    }

    let bytes = render(&activity, &track, opts.sport)?;
    write_tcx_file(output, &bytes)?;

    Ok(ExportSummary {
        samples: classified.samples.len(),
        skipped_rows: classified.rejected.len(),
        trackpoints,
    })
}
