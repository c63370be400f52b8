use crate::dlog;
use crate::error::{ExportError, Result};
use crate::types::{Activity, MetricRow};
use crate::utils::parse_timestamp;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::io;
use std::path::Path;

pub const ACTIVITIES_TABLE: &str = "activities";
pub const METRICS_TABLE: &str = "metrics";

/// Open the app database without ever creating or modifying it.
pub fn open_readonly(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(ExportError::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, "database file not found"),
        ));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    dlog!(path = %path.display(), "opened database read-only");

    for table in [ACTIVITIES_TABLE, METRICS_TABLE] {
        if !table_exists(&conn, table)? {
            return Err(ExportError::MalformedData(format!(
                "{} does not contain a {table} table",
                path.display()
            )));
        }
    }

    Ok(conn)
}

/// Look up one activity by its `uniqueID`.
///
/// `db_path` is only used to name the database in the not-found error.
pub fn read_activity(conn: &Connection, id: i64, db_path: &Path) -> Result<Activity> {
    let sql = r"
        SELECT
            uniqueID,
            startDate,
            endDate,
            distance,
            duration,
            serverID
        FROM activities
        WHERE uniqueID = ?1
        LIMIT 1
    ";

    let row = conn
        .query_row(sql, [id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                text_column(row, 1)?,
                text_column(row, 2)?,
                real_column(row, 3)?,
                real_column(row, 4)?,
                text_column(row, 5)?,
            ))
        })
        .optional()?;

    let Some((id, start_raw, end_raw, distance_km, duration_ms, server_id)) = row else {
        return Err(ExportError::NotFound {
            id,
            path: db_path.to_path_buf(),
        });
    };

    let start = start_raw
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| {
            ExportError::MalformedData(format!(
                "activity {id} has an unusable startDate: {start_raw:?}"
            ))
        })?;
    let end = end_raw.as_deref().and_then(parse_timestamp).ok_or_else(|| {
        ExportError::MalformedData(format!("activity {id} has an unusable endDate: {end_raw:?}"))
    })?;
    if end < start {
        return Err(ExportError::MalformedData(format!(
            "activity {id} ends before it starts ({start} > {end})"
        )));
    }

    // Stored as kilometers and milliseconds.
    let distance_m = distance_km
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|km| km * 1000.0);
    let duration_s = duration_ms
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|ms| ms / 1000.0);

    Ok(Activity {
        id,
        start,
        end,
        distance_m,
        duration_s,
        server_id,
    })
}

/// All `metrics` rows of an activity, untouched, in `startDate` order.
pub fn read_metric_rows(conn: &Connection, activity_id: i64) -> Result<Vec<MetricRow>> {
    let sql = r"
        SELECT
            rowid,
            source,
            startDate,
            coordinateValue,
            doubleValue,
            intValue
        FROM metrics
        WHERE activityID = ?1
        ORDER BY startDate, rowid
    ";

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([activity_id])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(MetricRow {
            rowid: row.get(0)?,
            source: text_column(row, 1)?,
            start_date: text_column(row, 2)?,
            coordinate_value: text_column(row, 3)?,
            double_value: real_column(row, 4)?,
            int_value: int_column(row, 5)?,
        });
    }

    dlog!(activity_id, rows = out.len(), "read metric rows");
    Ok(out)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

// SQLite columns are dynamically typed; read leniently and leave validation
// to the caller.

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(b) => Some(String::from_utf8_lossy(b).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn real_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Real(f) => Some(f),
        #[allow(clippy::cast_precision_loss)]
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Text(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn int_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i),
        #[allow(clippy::cast_possible_truncation)]
        ValueRef::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(f as i64),
        ValueRef::Text(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok()),
        _ => None,
    })
}
