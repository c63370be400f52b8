use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Recorded total distance in meters.
    pub distance_m: Option<f64>,
    /// Recorded total duration in seconds.
    pub duration_s: Option<f64>,
    /// `None` when the activity never synced to the app's server.
    pub server_id: Option<String>,
}

impl Activity {
    /// Recorded duration if present, otherwise the wall-clock span.
    #[allow(clippy::cast_precision_loss)]
    pub fn total_time_seconds(&self) -> f64 {
        self.duration_s
            .unwrap_or_else(|| (self.end - self.start).num_milliseconds().max(0) as f64 / 1000.0)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// One raw row of the `metrics` table, before any validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRow {
    pub rowid: i64,
    pub source: Option<String>,
    pub start_date: Option<String>,
    pub coordinate_value: Option<String>,
    pub double_value: Option<f64>,
    pub int_value: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Position { lat: f64, lon: f64 },
    Altitude(f64),
    HeartRate(u8),
    /// Revolutions per minute, i.e. half the step rate.
    Cadence(u8),
    /// Meters per second.
    Speed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub metric: Metric,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trackpoint {
    pub time: DateTime<Utc>,
    pub position: Option<Position>,
    pub altitude_m: Option<f64>,
    /// Cumulative from the activity start.
    pub distance_m: Option<f64>,
    pub heart_rate_bpm: Option<u8>,
    pub cadence_rpm: Option<u8>,
    pub speed_mps: Option<f64>,
}

impl Trackpoint {
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            position: None,
            altitude_m: None,
            distance_m: None,
            heart_rate_bpm: None,
            cadence_rpm: None,
            speed_mps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Sport {
    #[default]
    Running,
    Biking,
    Other,
}

impl Sport {
    pub const fn as_tcx(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Biking => "Biking",
            Self::Other => "Other",
        }
    }
}
