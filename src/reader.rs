//! Minimal TCX reader, enough to check what [`crate::tcx`] wrote.

use crate::error::{ExportError, Result};
use crate::types::{Position, Trackpoint};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTcx {
    pub sport: Option<String>,
    pub lap_count: usize,
    pub lap_start: Option<DateTime<Utc>>,
    pub total_time_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub trackpoints: Vec<Trackpoint>,
}

pub fn read_tcx_file(path: &Path) -> Result<ParsedTcx> {
    let bytes = fs::read(path).map_err(|e| ExportError::io(path, e))?;
    parse_tcx(&bytes)
}

pub fn parse_tcx(bytes: &[u8]) -> Result<ParsedTcx> {
    let mut xml = Reader::from_reader(bytes);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut st = TcxState::default();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => handle_start(&mut st, &e),
            Event::Empty(e) => {
                handle_start(&mut st, &e);
                handle_end(&mut st, e.local_name().as_ref());
            }
            Event::End(e) => handle_end_event(&mut st, &e),
            Event::Text(e) => handle_text(&mut st, &e),
            _ => {}
        }
        buf.clear();
    }

    Ok(st.out)
}

#[derive(Default)]
struct TcxState {
    /// Open elements from the root, by local name.
    path: Vec<String>,
    cur: Option<Trackpoint>,
    cur_lat: Option<f64>,
    cur_lon: Option<f64>,
    out: ParsedTcx,
}

/// True when the innermost open elements are `tail`.
fn ends_with(path: &[String], tail: &[&str]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

fn handle_start(st: &mut TcxState, e: &BytesStart<'_>) {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    match name.as_bytes() {
        b"Activity" => {
            st.out.sport = attribute(e, b"Sport");
        }
        b"Lap" => {
            st.out.lap_count += 1;
            st.out.lap_start = attribute(e, b"StartTime").and_then(|s| parse_time(&s));
        }
        b"Trackpoint" => {
            st.cur = Some(Trackpoint::new(DateTime::<Utc>::MIN_UTC));
            st.cur_lat = None;
            st.cur_lon = None;
        }
        _ => {}
    }
    st.path.push(name);
}

fn handle_end_event(st: &mut TcxState, e: &BytesEnd<'_>) {
    handle_end(st, e.local_name().as_ref());
}

fn handle_end(st: &mut TcxState, name: &[u8]) {
    match name {
        b"Position" => {
            if let (Some(tp), Some(lat), Some(lon)) = (st.cur.as_mut(), st.cur_lat, st.cur_lon) {
                tp.position = Some(Position { lat, lon });
            }
        }
        b"Trackpoint" => {
            if let Some(tp) = st.cur.take() {
                st.out.trackpoints.push(tp);
            }
        }
        _ => {}
    }
    st.path.pop();
}

fn handle_text(st: &mut TcxState, e: &BytesText<'_>) {
    let Ok(text) = e.decode() else {
        return;
    };
    let text = text.as_ref();

    if let Some(tp) = st.cur.as_mut() {
        if ends_with(&st.path, &["Trackpoint", "Time"]) {
            if let Some(t) = parse_time(text) {
                tp.time = t;
            }
        } else if ends_with(&st.path, &["Position", "LatitudeDegrees"]) {
            st.cur_lat = text.parse().ok();
        } else if ends_with(&st.path, &["Position", "LongitudeDegrees"]) {
            st.cur_lon = text.parse().ok();
        } else if ends_with(&st.path, &["Trackpoint", "AltitudeMeters"]) {
            tp.altitude_m = text.parse().ok();
        } else if ends_with(&st.path, &["Trackpoint", "DistanceMeters"]) {
            tp.distance_m = text.parse().ok();
        } else if ends_with(&st.path, &["HeartRateBpm", "Value"]) {
            tp.heart_rate_bpm = text.parse().ok();
        } else if ends_with(&st.path, &["Trackpoint", "Cadence"]) {
            tp.cadence_rpm = text.parse().ok();
        } else if ends_with(&st.path, &["TPX", "Speed"]) {
            tp.speed_mps = text.parse().ok();
        }
    } else if ends_with(&st.path, &["Lap", "TotalTimeSeconds"]) {
        st.out.total_time_seconds = text.parse().ok();
    } else if ends_with(&st.path, &["Lap", "DistanceMeters"]) {
        st.out.distance_meters = text.parse().ok();
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
