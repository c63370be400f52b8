//! End-to-end runs of the `nrc2tcx` binary against fixture databases.

mod common;

use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};
use common::*;
use nrc2tcx::reader::read_tcx_file;
use std::ffi::OsStr;
use tempfile::TempDir;

const START: &str = "2024-05-01 07:30:00";
const END: &str = "2024-05-01 07:40:00";

/// Five GPS + heart-rate samples spread over the ten-minute run.
fn seed_run(conn: &rusqlite::Connection) {
    add_activity(conn, 563, START, END, 1.5, 600_000.0);
    for i in 0..5_u32 {
        let t = format!("2024-05-01 07:{:02}:00", 30 + i * 2);
        add_position(conn, 563, Some(&t), 48.11 + f64::from(i) * 0.001, -1.68);
        add_heart_rate(conn, 563, Some(&t), 140 + i64::from(i));
    }
}

#[test]
fn test_export_writes_one_lap_with_five_trackpoints() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    seed_run(&conn);
    drop(conn);
    let out = tmp.path().join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let xml = std::fs::read_to_string(&out).unwrap();
    assert_eq!(xml.matches("<Lap ").count(), 1);
    assert_eq!(xml.matches("<Trackpoint>").count(), 5);
    assert_eq!(xml.matches("<HeartRateBpm>").count(), 5);
    assert_eq!(xml.matches("<Position>").count(), 5);

    let parsed = read_tcx_file(&out).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap();
    assert_eq!(parsed.lap_start, Some(start));
    assert_abs_diff_eq!(parsed.total_time_seconds.unwrap(), 600.0, epsilon = 1e-9);
    assert_abs_diff_eq!(parsed.distance_meters.unwrap(), 1500.0, epsilon = 1e-9);

    for (i, tp) in parsed.trackpoints.iter().enumerate() {
        let i = u32::try_from(i).unwrap();
        assert_eq!(tp.time, start + Duration::minutes(2 * i64::from(i)));
        let p = tp.position.unwrap();
        assert_abs_diff_eq!(p.lat, 48.11 + f64::from(i) * 0.001, epsilon = 1e-9);
        assert_abs_diff_eq!(p.lon, -1.68, epsilon = 1e-9);
        assert_eq!(tp.heart_rate_bpm, Some(140 + u8::try_from(i).unwrap()));
    }
    assert_abs_diff_eq!(
        parsed.trackpoints.last().unwrap().distance_m.unwrap(),
        1500.0,
        epsilon = 1e-6
    );
}

#[test]
fn test_missing_activity_exits_non_zero_without_output() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    add_activity(&conn, 1, START, END, 1.0, 1.0);
    drop(conn);
    let out = tmp.path().join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("563"), "stderr: {stderr}");
    assert!(stderr.contains("not found"), "stderr: {stderr}");
    assert!(!out.exists());
}

#[test]
fn test_null_timestamp_row_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    seed_run(&conn);
    add_heart_rate(&conn, 563, None, 170);
    add_position(&conn, 563, None, 48.2, -1.7);
    drop(conn);
    let out = tmp.path().join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(output.status.success());

    let parsed = read_tcx_file(&out).unwrap();
    assert_eq!(parsed.trackpoints.len(), 5);
    assert!(parsed.trackpoints.iter().all(|tp| tp.heart_rate_bpm != Some(170)));
}

#[test]
fn test_zero_samples_gives_header_only_tcx() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    add_activity(&conn, 563, START, END, 0.0, 600_000.0);
    drop(conn);
    let out = tmp.path().join("empty.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(output.status.success());

    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.contains("<Track/>"));
    let parsed = read_tcx_file(&out).unwrap();
    assert_eq!(parsed.lap_count, 1);
    assert_eq!(parsed.total_time_seconds, Some(600.0));
    assert!(parsed.trackpoints.is_empty());
}

#[test]
fn test_two_runs_are_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    seed_run(&conn);
    drop(conn);
    let a = tmp.path().join("a.tcx");
    let b = tmp.path().join("b.tcx");

    assert!(run(&[db.as_os_str(), OsStr::new("563"), a.as_os_str()]).status.success());
    assert!(run(&[db.as_os_str(), OsStr::new("563"), b.as_os_str()]).status.success());
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn test_malformed_id_fails_before_opening_database() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("does-not-exist.sqlite");
    let out = tmp.path().join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("five"), out.as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ACTIVITY_ID"), "stderr: {stderr}");
    assert!(!db.exists());
    assert!(!out.exists());
}

#[test]
fn test_missing_database_names_path() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("gone.sqlite");
    let out = tmp.path().join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gone.sqlite"), "stderr: {stderr}");
    assert!(!db.exists());
    assert!(!out.exists());
}

#[test]
fn test_unwritable_output_directory() {
    let tmp = TempDir::new().unwrap();
    let (db, conn) = new_store(tmp.path());
    seed_run(&conn);
    drop(conn);
    let out = tmp.path().join("missing-dir").join("run.tcx");

    let output = run(&[db.as_os_str(), OsStr::new("563"), out.as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("run.tcx"), "stderr: {stderr}");
    assert!(!out.exists());
}
