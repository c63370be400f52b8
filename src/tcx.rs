use crate::error::{ExportError, Result};
use crate::track::{LapSummary, TrackBuilder};
use crate::types::{Activity, Sport, Trackpoint};
use crate::utils::format_tcx_time;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const TCX_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const ACTIVITY_EXT_NS: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 \
     http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";

/// Render the whole TCX document.
///
/// Lap totals come from the activity row; the track is walked twice, once
/// for heart-rate and speed aggregates and once to emit the points.
pub fn render(activity: &Activity, track: &TrackBuilder<'_>, sport: Sport) -> Result<Vec<u8>> {
    let summary = LapSummary::from_trackpoints(track);
    let start = format_tcx_time(activity.start);

    let mut w = TcxWriter::new();
    w.decl()?;
    w.open(
        "TrainingCenterDatabase",
        &[
            ("xmlns", TCX_NS),
            ("xmlns:xsi", XSI_NS),
            ("xmlns:ns3", ACTIVITY_EXT_NS),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
        ],
    )?;
    w.open("Activities", &[])?;
    w.open("Activity", &[("Sport", sport.as_tcx())])?;
    w.leaf("Id", &start)?;

    w.open("Lap", &[("StartTime", start.as_str())])?;
    w.leaf("TotalTimeSeconds", activity.total_time_seconds())?;
    w.leaf("DistanceMeters", activity.distance_m.unwrap_or(0.0))?;
    if let Some(v) = summary.max_speed_mps {
        w.leaf("MaximumSpeed", v)?;
    }
    w.leaf("Calories", 0)?;
    if let Some(v) = summary.avg_heart_rate_bpm {
        w.open("AverageHeartRateBpm", &[])?;
        w.leaf("Value", v)?;
        w.close("AverageHeartRateBpm")?;
    }
    if let Some(v) = summary.max_heart_rate_bpm {
        w.open("MaximumHeartRateBpm", &[])?;
        w.leaf("Value", v)?;
        w.close("MaximumHeartRateBpm")?;
    }
    w.leaf("Intensity", "Active")?;
    w.leaf("TriggerMethod", "Manual")?;

    let mut points = track.iter().peekable();
    if points.peek().is_none() {
        w.empty("Track")?;
    } else {
        w.open("Track", &[])?;
        for tp in points {
            write_trackpoint(&mut w, &tp)?;
        }
        w.close("Track")?;
    }

    w.close("Lap")?;
    w.close("Activity")?;
    w.close("Activities")?;
    w.close("TrainingCenterDatabase")?;

    let mut out = w.into_inner();
    out.push(b'\n');
    Ok(out)
}

fn write_trackpoint(w: &mut TcxWriter, tp: &Trackpoint) -> Result<()> {
    w.open("Trackpoint", &[])?;
    w.leaf("Time", format_tcx_time(tp.time))?;
    if let Some(p) = tp.position {
        w.open("Position", &[])?;
        w.leaf("LatitudeDegrees", p.lat)?;
        w.leaf("LongitudeDegrees", p.lon)?;
        w.close("Position")?;
    }
    if let Some(v) = tp.altitude_m {
        w.leaf("AltitudeMeters", v)?;
    }
    if let Some(v) = tp.distance_m {
        w.leaf("DistanceMeters", v)?;
    }
    if let Some(v) = tp.heart_rate_bpm {
        w.open("HeartRateBpm", &[])?;
        w.leaf("Value", v)?;
        w.close("HeartRateBpm")?;
    }
    if let Some(v) = tp.cadence_rpm {
        w.leaf("Cadence", v)?;
    }
    if let Some(v) = tp.speed_mps {
        w.open("Extensions", &[])?;
        w.open("ns3:TPX", &[])?;
        w.leaf("ns3:Speed", v)?;
        w.close("ns3:TPX")?;
        w.close("Extensions")?;
    }
    w.close("Trackpoint")
}

/// Write `bytes` to `path` atomically: a temp file next to the target is
/// renamed over it, so a failed export never leaves a partial file behind.
pub fn write_tcx_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ExportError::io(path, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.flush())
        .map_err(|e| ExportError::io(path, e))?;
    tmp.persist(path).map_err(|e| ExportError::io(path, e.error))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote TCX file");
    Ok(())
}

struct TcxWriter {
    inner: Writer<Vec<u8>>,
}

impl TcxWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner.write_event(event).map_err(xml_err)
    }

    fn decl(&mut self) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str) -> Result<()> {
        self.event(Event::Empty(BytesStart::new(name)))
    }

    fn leaf(&mut self, name: &str, value: impl Display) -> Result<()> {
        let text = value.to_string();
        self.open(name, &[])?;
        self.event(Event::Text(BytesText::new(&text)))?;
        self.close(name)
    }
}

fn xml_err(e: impl Display) -> ExportError {
    ExportError::Xml(e.to_string())
}
