// src/motion/trajectory.rs - Planned output and the views consumers read from it
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::segment::LineSegment;
use super::vector::Vector3;

/// Upper bound on the length of a resampled signal.
pub const MAX_VELOCITY_SAMPLES: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("Sample interval must be > 0, got {0}")]
    InvalidInterval(f64),
    #[error("Sampling {duration}s every {dt}s exceeds {limit} samples", limit = MAX_VELOCITY_SAMPLES)]
    TooManySamples { duration: f64, dt: f64 },
}

/// Final, ordered list of planned segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    segments: Vec<LineSegment>,
}

/// Kinematic sample at a segment boundary, for time-domain charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Cumulative time since the start of the trajectory (s)
    pub time: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub parent_id: usize,
}

/// Where the tool is at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub time: f64,
    pub position: Vector3,
    pub velocity: f64,
    pub acceleration: f64,
    pub parent_id: usize,
}

impl Trajectory {
    pub fn new(segments: Vec<LineSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<LineSegment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total time (s).
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.profile.t).sum()
    }

    /// Total path length (mm).
    pub fn length(&self) -> f64 {
        self.segments.iter().map(|s| s.profile.x).sum()
    }

    pub fn peak_velocity(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.profile.peak_speed())
            .fold(0.0, f64::max)
    }

    /// Start and end sample of every segment on a cumulative time axis.
    ///
    /// Velocity is piecewise linear between consecutive points; acceleration
    /// is constant within a segment, so each boundary appears twice.
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        let mut points = Vec::with_capacity(self.segments.len() * 2);
        let mut time = 0.0;
        for segment in &self.segments {
            let profile = &segment.profile;
            points.push(TimelinePoint {
                time,
                velocity: profile.v0,
                acceleration: profile.a,
                parent_id: segment.parent_id,
            });
            time += profile.t;
            points.push(TimelinePoint {
                time,
                velocity: profile.v,
                acceleration: profile.a,
                parent_id: segment.parent_id,
            });
        }
        points
    }

    /// Ordered points of the planned path: the first start, then every end.
    pub fn path(&self) -> Vec<Vector3> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start);
        }
        points.extend(self.segments.iter().map(|s| s.end));
        points
    }

    /// Segments grouped by the move command that produced them.
    pub fn by_parent(&self) -> BTreeMap<usize, Vec<&LineSegment>> {
        let mut groups: BTreeMap<usize, Vec<&LineSegment>> = BTreeMap::new();
        for segment in &self.segments {
            groups.entry(segment.parent_id).or_default().push(segment);
        }
        groups
    }

    /// Position, speed and acceleration at `time`, or `None` outside the
    /// trajectory.
    pub fn state_at(&self, time: f64) -> Option<MotionState> {
        if !(time >= 0.0) || time > self.duration() {
            return None;
        }
        let mut elapsed = 0.0;
        for (index, segment) in self.segments.iter().enumerate() {
            let is_last = index + 1 == self.segments.len();
            if time <= elapsed + segment.profile.t || is_last {
                let local = time - elapsed;
                let profile = &segment.profile;
                return Some(MotionState {
                    time,
                    position: segment.point_at(profile.displacement_at(local)),
                    velocity: profile.velocity_at(local),
                    acceleration: profile.a,
                    parent_id: segment.parent_id,
                });
            }
            elapsed += segment.profile.t;
        }
        None
    }

    /// Speed resampled every `dt` seconds from `t = 0` through the end.
    ///
    /// A uniform grid is what frequency-domain analysis expects. An empty
    /// trajectory yields an empty signal.
    pub fn sample_velocity(&self, dt: f64) -> Result<Vec<f64>, SamplingError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SamplingError::InvalidInterval(dt));
        }
        if self.segments.is_empty() {
            return Ok(Vec::new());
        }
        let duration = self.duration();
        let steps = (duration / dt).floor();
        if !(steps < MAX_VELOCITY_SAMPLES as f64) {
            return Err(SamplingError::TooManySamples { duration, dt });
        }
        let count = steps as usize + 1;
        let mut samples = Vec::with_capacity(count);
        let mut index = 0;
        let mut segment_start = 0.0;
        for step in 0..count {
            let time = step as f64 * dt;
            while index + 1 < self.segments.len() && time > segment_start + self.segments[index].profile.t {
                segment_start += self.segments[index].profile.t;
                index += 1;
            }
            samples.push(self.segments[index].profile.velocity_at(time - segment_start));
        }
        Ok(samples)
    }
}

impl From<Vec<LineSegment>> for Trajectory {
    fn from(segments: Vec<LineSegment>) -> Self {
        Self::new(segments)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a LineSegment;
    type IntoIter = std::slice::Iter<'a, LineSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
