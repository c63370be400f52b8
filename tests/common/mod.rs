use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const LOCATION: &str = "com.nike.running.ios.corelocation";
pub const HEALTHKIT: &str = "com.nike.running.ios.healthkit";

/// Fresh app-like database with empty `activities` and `metrics` tables.
pub fn new_store(dir: &Path) -> (PathBuf, Connection) {
    let path = dir.join("activityStore.sqlite");
    let conn = Connection::open(&path).expect("failed to create fixture db");
    conn.execute_batch(
        r"
        CREATE TABLE activities (
          uniqueID  INTEGER PRIMARY KEY,
          startDate TEXT,
          endDate   TEXT,
          distance  REAL,
          duration  REAL,
          serverID  TEXT
        );
        CREATE TABLE metrics (
          activityID      INTEGER NOT NULL,
          source          TEXT,
          startDate       TEXT,
          coordinateValue TEXT,
          doubleValue     REAL,
          intValue        INTEGER
        );
        ",
    )
    .expect("failed to create fixture schema");
    (path, conn)
}

pub fn add_activity(conn: &Connection, id: i64, start: &str, end: &str, km: f64, ms: f64) {
    conn.execute(
        "INSERT INTO activities VALUES (?1, ?2, ?3, ?4, ?5, 'srv-1')",
        params![id, start, end, km, ms],
    )
    .expect("failed to insert activity");
}

pub fn add_position(conn: &Connection, id: i64, start: Option<&str>, lat: f64, lon: f64) {
    conn.execute(
        "INSERT INTO metrics (activityID, source, startDate, coordinateValue) VALUES (?1, ?2, ?3, ?4)",
        params![id, LOCATION, start, format!("{lat},{lon}")],
    )
    .expect("failed to insert position");
}

pub fn add_heart_rate(conn: &Connection, id: i64, start: Option<&str>, bpm: i64) {
    conn.execute(
        "INSERT INTO metrics (activityID, source, startDate, intValue) VALUES (?1, ?2, ?3, ?4)",
        params![id, HEALTHKIT, start, bpm],
    )
    .expect("failed to insert heart rate");
}

pub fn run(args: &[&std::ffi::OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nrc2tcx"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run nrc2tcx")
}
