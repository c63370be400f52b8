//! Turning raw `metrics` rows into typed samples.
//!
//! Rows that cannot be trusted are dropped here, not deeper in the pipeline:
//! [`classify`] returns the rejected rows next to the accepted samples so the
//! caller decides how loudly to report them. Nothing in this module fails the
//! export.
//!
//! Source to metric mapping:
//!
//! | source                               | column                          | metric    | unit                 |
//! |--------------------------------------|---------------------------------|-----------|----------------------|
//! | `com.nike.running.ios.corelocation`  | `coordinateValue` = `"lat,lon"` | position  | degrees              |
//! | `com.nike.running.ios.corelocation`  | `doubleValue`, no coordinate    | altitude  | meters               |
//! | `com.nike.running.ios.healthkit`     | `intValue`                      | heart rate| bpm                  |
//! | `com.nike.running.ios.coremotion`    | `doubleValue` > 100             | cadence   | steps/min, halved    |
//! | `com.nike.running.ios.coremotion`    | `doubleValue` <= 100            | speed     | m/s                  |

use crate::types::{Activity, Metric, MetricRow, Sample};
use crate::utils::parse_timestamp;
use std::fmt;

pub const SOURCE_LOCATION: &str = "com.nike.running.ios.corelocation";
pub const SOURCE_HEALTHKIT: &str = "com.nike.running.ios.healthkit";
pub const SOURCE_MOTION: &str = "com.nike.running.ios.coremotion";

/// Motion readings above this are step rates; at or below, speeds.
const CADENCE_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    NullTimestamp,
    BadTimestamp(String),
    OutsideActivity,
    Unrecognized,
    BadCoordinate(String),
    OutOfRange(&'static str),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullTimestamp => write!(f, "null timestamp"),
            Self::BadTimestamp(s) => write!(f, "unparseable timestamp {s:?}"),
            Self::OutsideActivity => write!(f, "timestamp outside the activity"),
            Self::Unrecognized => write!(f, "unrecognized metric row"),
            Self::BadCoordinate(s) => write!(f, "unparseable coordinate {s:?}"),
            Self::OutOfRange(what) => write!(f, "{what} out of range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub rowid: i64,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct Classified {
    /// Sorted by time; equal times keep source order.
    pub samples: Vec<Sample>,
    pub rejected: Vec<Rejected>,
}

/// Validate and type every row, then order the survivors chronologically.
pub fn classify(activity: &Activity, rows: &[MetricRow]) -> Classified {
    let mut out = Classified::default();

    for row in rows {
        match classify_row(activity, row) {
            Ok(sample) => out.samples.push(sample),
            Err(reason) => out.rejected.push(Rejected {
                rowid: row.rowid,
                reason,
            }),
        }
    }

    // Text order of startDate is not chronological across formats.
    out.samples.sort_by_key(|s| s.time);
    out
}

/// Log every rejected row and a one-line summary.
pub fn report(activity_id: i64, classified: &Classified) {
    for r in &classified.rejected {
        tracing::warn!(activity_id, rowid = r.rowid, reason = %r.reason, "skipping metric row");
    }
    if classified.rejected.is_empty() {
        tracing::info!(
            activity_id,
            samples = classified.samples.len(),
            "all metric rows usable"
        );
    } else {
        tracing::warn!(
            activity_id,
            samples = classified.samples.len(),
            skipped = classified.rejected.len(),
            "some metric rows were skipped"
        );
    }
}

fn classify_row(activity: &Activity, row: &MetricRow) -> Result<Sample, RejectReason> {
    let raw_time = row
        .start_date
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(RejectReason::NullTimestamp)?;
    let time =
        parse_timestamp(raw_time).ok_or_else(|| RejectReason::BadTimestamp(raw_time.to_string()))?;
    if !activity.contains(time) {
        return Err(RejectReason::OutsideActivity);
    }

    let metric = match row.source.as_deref() {
        Some(SOURCE_LOCATION) => location_metric(row)?,
        Some(SOURCE_HEALTHKIT) => heart_rate_metric(row)?,
        Some(SOURCE_MOTION) => motion_metric(row)?,
        _ => return Err(RejectReason::Unrecognized),
    };

    Ok(Sample { time, metric })
}

fn location_metric(row: &MetricRow) -> Result<Metric, RejectReason> {
    if let Some(coords) = row.coordinate_value.as_deref() {
        let (lat, lon) =
            parse_coordinate(coords).ok_or_else(|| RejectReason::BadCoordinate(coords.into()))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RejectReason::OutOfRange("latitude"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(RejectReason::OutOfRange("longitude"));
        }
        return Ok(Metric::Position { lat, lon });
    }

    match row.double_value {
        Some(alt) if alt.is_finite() => Ok(Metric::Altitude(alt)),
        Some(_) => Err(RejectReason::OutOfRange("altitude")),
        None => Err(RejectReason::Unrecognized),
    }
}

fn heart_rate_metric(row: &MetricRow) -> Result<Metric, RejectReason> {
    let bpm = row.int_value.ok_or(RejectReason::Unrecognized)?;
    u8::try_from(bpm)
        .ok()
        .filter(|b| *b > 0)
        .map(Metric::HeartRate)
        .ok_or(RejectReason::OutOfRange("heart rate"))
}

fn motion_metric(row: &MetricRow) -> Result<Metric, RejectReason> {
    if row.int_value.is_some() {
        return Err(RejectReason::Unrecognized);
    }
    let v = row.double_value.ok_or(RejectReason::Unrecognized)?;
    if !v.is_finite() || v < 0.0 {
        return Err(RejectReason::OutOfRange("motion value"));
    }

    if v > CADENCE_THRESHOLD {
        // TCX cadence is RPM: one revolution per two running steps.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rpm = (v / 2.0) as u64;
        u8::try_from(rpm)
            .map(Metric::Cadence)
            .map_err(|_| RejectReason::OutOfRange("cadence"))
    } else {
        Ok(Metric::Speed(v))
    }
}

fn parse_coordinate(s: &str) -> Option<(f64, f64)> {
    let (lat, lon) = s.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}
