//! Merging samples into trackpoints.
//!
//! Samples are swept in time order. A group opens at a sample's time and
//! takes every following sample no later than `open + window`, unless that
//! sample's metric is already filled in the group: a repeated reading closes
//! the group and opens the next one, so no reading is ever dropped. Each
//! group becomes one [`Trackpoint`] stamped with the opening time.
//!
//! Trackpoints with a position but no heart rate or cadence borrow the
//! nearest reading of that metric within the nearest-reading window.
//!
//! Cumulative distance is integrated over every position fix and then scaled
//! so the last trackpoint lands on the activity's recorded total.

use crate::types::{Activity, Metric, Position, Sample, Trackpoint};
use crate::utils::haversine_m;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_MERGE_WINDOW_MS: i64 = 1000;
pub const DEFAULT_NEAREST_WINDOW_MS: i64 = 5000;

/// Restartable trackpoint sequence over a time-sorted sample slice.
#[derive(Debug, Clone)]
pub struct TrackBuilder<'a> {
    samples: &'a [Sample],
    window: Duration,
    nearest: Duration,
    distance_scale: f64,
}

impl<'a> TrackBuilder<'a> {
    /// `samples` must already be sorted by time.
    pub fn new(activity: &Activity, samples: &'a [Sample], window: Duration) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[0].time <= w[1].time));

        let integrated = path_length_m(samples);
        let distance_scale = match activity.distance_m {
            Some(total) if integrated > 0.0 => total / integrated,
            _ => 1.0,
        };
        crate::dlog!(
            activity_id = activity.id,
            integrated_m = integrated,
            recorded_m = ?activity.distance_m,
            distance_scale,
            "track distance calibration"
        );

        Self {
            samples,
            window: window.max(Duration::zero()),
            nearest: Duration::milliseconds(DEFAULT_NEAREST_WINDOW_MS),
            distance_scale,
        }
    }

    /// How far from a fix to look for a heart-rate or cadence reading.
    /// Zero disables the lookup.
    #[must_use]
    pub fn with_nearest_window(mut self, nearest: Duration) -> Self {
        self.nearest = nearest.max(Duration::zero());
        self
    }

    /// A fresh pass over the samples.
    pub fn iter(&self) -> TrackIter<'a> {
        TrackIter {
            samples: self.samples,
            pos: 0,
            window: self.window,
            nearest: self.nearest,
            distance_scale: self.distance_scale,
            last_fix: None,
            integrated_m: 0.0,
        }
    }
}

impl<'a> IntoIterator for &TrackBuilder<'a> {
    type Item = Trackpoint;
    type IntoIter = TrackIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct TrackIter<'a> {
    samples: &'a [Sample],
    pos: usize,
    window: Duration,
    nearest: Duration,
    distance_scale: f64,
    last_fix: Option<Position>,
    integrated_m: f64,
}

impl Iterator for TrackIter<'_> {
    type Item = Trackpoint;

    fn next(&mut self) -> Option<Trackpoint> {
        let first = self.samples.get(self.pos)?;
        let close = first.time + self.window;

        let mut tp = Trackpoint::new(first.time);
        while let Some(s) = self.samples.get(self.pos) {
            if s.time > close || !merge_into(&mut tp, s.metric) {
                break;
            }
            self.pos += 1;
        }

        if let Some(p) = tp.position {
            if tp.heart_rate_bpm.is_none() {
                tp.heart_rate_bpm = nearest(self.samples, tp.time, self.nearest, |m| match m {
                    Metric::HeartRate(v) => Some(v),
                    _ => None,
                });
            }
            if tp.cadence_rpm.is_none() {
                tp.cadence_rpm = nearest(self.samples, tp.time, self.nearest, |m| match m {
                    Metric::Cadence(v) => Some(v),
                    _ => None,
                });
            }

            if let Some(prev) = self.last_fix {
                self.integrated_m += haversine_m(prev.lat, prev.lon, p.lat, p.lon);
            }
            self.last_fix = Some(p);
        }
        if self.last_fix.is_some() {
            tp.distance_m = Some(self.integrated_m * self.distance_scale);
        }

        Some(tp)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.samples.len() - self.pos;
        (usize::from(left > 0), Some(left))
    }
}

impl std::iter::FusedIterator for TrackIter<'_> {}

/// Fill the metric's slot; `false` if it was already taken.
fn merge_into(tp: &mut Trackpoint, metric: Metric) -> bool {
    fn fill<T>(slot: &mut Option<T>, v: T) -> bool {
        if slot.is_some() {
            return false;
        }
        *slot = Some(v);
        true
    }

    match metric {
        Metric::Position { lat, lon } => fill(&mut tp.position, Position { lat, lon }),
        Metric::Altitude(v) => fill(&mut tp.altitude_m, v),
        Metric::HeartRate(v) => fill(&mut tp.heart_rate_bpm, v),
        Metric::Cadence(v) => fill(&mut tp.cadence_rpm, v),
        Metric::Speed(v) => fill(&mut tp.speed_mps, v),
    }
}

/// Closest reading picked by `pick` within `max` of `t`; ties go to the
/// earlier one.
fn nearest<T>(
    samples: &[Sample],
    t: DateTime<Utc>,
    max: Duration,
    pick: impl Fn(Metric) -> Option<T>,
) -> Option<T> {
    let split = samples.partition_point(|s| s.time < t);

    let before = samples[..split]
        .iter()
        .rev()
        .take_while(|s| t - s.time <= max)
        .find_map(|s| pick(s.metric).map(|v| (t - s.time, v)));
    let after = samples[split..]
        .iter()
        .take_while(|s| s.time - t <= max)
        .find_map(|s| pick(s.metric).map(|v| (s.time - t, v)));

    match (before, after) {
        (Some((db, b)), Some((da, a))) => Some(if da < db { a } else { b }),
        (Some((_, b)), None) => Some(b),
        (None, Some((_, a))) => Some(a),
        (None, None) => None,
    }
}

/// Raw haversine length over all position samples, in order. Every position
/// sample becomes its own trackpoint, so this is the length the iterator
/// integrates.
fn path_length_m(samples: &[Sample]) -> f64 {
    let mut total = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    for s in samples {
        if let Metric::Position { lat, lon } = s.metric {
            if let Some((lat0, lon0)) = prev {
                total += haversine_m(lat0, lon0, lat, lon);
            }
            prev = Some((lat, lon));
        }
    }
    total
}

/// Lap-level aggregates that come from the track rather than the activity row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LapSummary {
    pub avg_heart_rate_bpm: Option<u8>,
    pub max_heart_rate_bpm: Option<u8>,
    pub max_speed_mps: Option<f64>,
}

impl LapSummary {
    pub fn from_trackpoints<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Trackpoint>,
    {
        let mut hr_sum = 0u64;
        let mut hr_count = 0u64;
        let mut out = Self::default();

        for tp in points {
            if let Some(hr) = tp.heart_rate_bpm {
                hr_sum += u64::from(hr);
                hr_count += 1;
                out.max_heart_rate_bpm = out.max_heart_rate_bpm.max(Some(hr));
            }
            if let Some(v) = tp.speed_mps {
                out.max_speed_mps = Some(out.max_speed_mps.map_or(v, |m| m.max(v)));
            }
        }

        if hr_count > 0 {
            let avg = (hr_sum + hr_count / 2) / hr_count;
            out.avg_heart_rate_bpm = u8::try_from(avg).ok();
        }
        out
    }
}
