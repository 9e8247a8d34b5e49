// src/motion/segment.rs - Directed line segments between waypoints
use serde::{Deserialize, Serialize};

use super::kinematics::{self, KinematicsError, MotionProfile};
use super::limits::KinematicLimits;
use super::planner::PlannerError;
use super::vector::Vector3;
use crate::toolpath::Waypoint;

/// Waypoint pairs closer than this are never materialized as segments.
pub const DEGENERATE_DISTANCE: f64 = 1e-18;

/// A straight move with a single constant-acceleration profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    /// Source text of the move command this segment came from
    pub instruction: String,
    /// Index of the move command this segment came from; shared by split pieces
    pub parent_id: usize,
    pub start: Vector3,
    pub end: Vector3,
    /// Normalized `end - start`
    pub unit: Vector3,
    pub profile: MotionProfile,
    /// Maximum acceleration along `unit` within the per-axis limits (mm/s²)
    pub a_max: f64,
}

impl LineSegment {
    /// Build a segment from `start` to `end` cruising from `start_speed` to
    /// `end_speed`. Returns `Ok(None)` when the points coincide.
    pub fn from_geometry(
        parent_id: usize,
        instruction: impl Into<String>,
        start: Vector3,
        end: Vector3,
        start_speed: f64,
        end_speed: f64,
        limits: &KinematicLimits,
    ) -> Result<Option<Self>, KinematicsError> {
        let delta = end - start;
        let length = delta.norm();
        if length < DEGENERATE_DISTANCE {
            return Ok(None);
        }
        let Some(unit) = delta.normalize() else {
            return Ok(None);
        };
        let profile = kinematics::solve(
            Some(start_speed.abs()),
            Some(end_speed.abs()),
            None,
            None,
            Some(length),
        )?;
        Ok(Some(Self {
            instruction: instruction.into(),
            parent_id,
            start,
            end,
            unit,
            profile,
            a_max: limits.acceleration_along(&unit),
        }))
    }

    /// Same geometry, new profile.
    pub fn with_profile(&self, profile: MotionProfile) -> Self {
        Self {
            profile,
            ..self.clone()
        }
    }

    /// Piece of this segment between two points on it, sharing its identity.
    pub(crate) fn piece(&self, start: Vector3, end: Vector3, profile: MotionProfile) -> Self {
        Self {
            instruction: self.instruction.clone(),
            parent_id: self.parent_id,
            start,
            end,
            unit: self.unit,
            profile,
            a_max: self.a_max,
        }
    }

    pub fn length(&self) -> f64 {
        self.profile.x
    }

    pub fn duration(&self) -> f64 {
        self.profile.t
    }

    pub fn entry_speed(&self) -> f64 {
        self.profile.v0
    }

    pub fn exit_speed(&self) -> f64 {
        self.profile.v
    }

    /// Point `distance` along the segment from its start.
    pub fn point_at(&self, distance: f64) -> Vector3 {
        self.start + self.unit * distance
    }
}

/// Turn consecutive waypoints into raw segments.
///
/// Each segment cruises at the feedrate of the command that produced its end
/// waypoint, or at `nominal_speed` when the command carried none. Coincident
/// pairs are skipped without advancing the start point, so every emitted
/// segment starts exactly where the previous one ended.
pub fn build_segments(
    waypoints: &[Waypoint],
    limits: &KinematicLimits,
    nominal_speed: f64,
) -> Result<Vec<LineSegment>, PlannerError> {
    let Some(first) = waypoints.first() else {
        return Ok(Vec::new());
    };
    let mut segments = Vec::with_capacity(waypoints.len().saturating_sub(1));
    let mut previous_end = first.position;
    for waypoint in &waypoints[1..] {
        let speed = waypoint.feedrate.unwrap_or(nominal_speed);
        let segment = LineSegment::from_geometry(
            waypoint.parent_id,
            waypoint.instruction.as_str(),
            previous_end,
            waypoint.position,
            speed,
            speed,
            limits,
        )
        .map_err(|source| PlannerError::Kinematics {
            parent_id: waypoint.parent_id,
            source,
        })?;
        match segment {
            Some(segment) => {
                previous_end = segment.end;
                segments.push(segment);
            }
            None => {
                tracing::trace!(
                    "Skipping degenerate move {} ({:?})",
                    waypoint.parent_id,
                    waypoint.instruction
                );
            }
        }
    }
    tracing::debug!(
        "Built {} segments from {} waypoints",
        segments.len(),
        waypoints.len()
    );
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoints(points: &[(f64, f64, f64)]) -> Vec<Waypoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| Waypoint::new(Vector3::new(x, y, z), i.saturating_sub(1), format!("move {}", i)))
            .collect()
    }

    #[test]
    fn test_segment_geometry() {
        let limits = KinematicLimits::default();
        let segment = LineSegment::from_geometry(
            3,
            "G1 X3 Y4",
            Vector3::ZERO,
            Vector3::new(3.0, 4.0, 0.0),
            100.0,
            100.0,
            &limits,
        )
        .unwrap()
        .unwrap();
        assert_eq!(segment.parent_id, 3);
        assert!((segment.length() - 5.0).abs() < 1e-12);
        assert!((segment.unit.norm() - 1.0).abs() < 1e-12);
        assert_eq!(segment.profile.a, 0.0);
        assert!((segment.duration() - 0.05).abs() < 1e-12);
        // y dominates: 50 / 0.8
        assert!((segment.a_max - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_points_are_skipped() {
        let limits = KinematicLimits::default();
        let p = Vector3::new(5.0, 5.0, 0.0);
        let segment = LineSegment::from_geometry(0, "", p, p, 10.0, 10.0, &limits).unwrap();
        assert!(segment.is_none());
    }

    #[test]
    fn test_build_skips_duplicates_and_keeps_continuity() {
        let limits = KinematicLimits::default();
        let points = waypoints(&[
            (0.0, 0.0, 0.0),
            (5.0, 5.0, 0.0),
            (5.0, 5.0, 0.0),
            (10.0, 5.0, 0.0),
        ]);
        let segments = build_segments(&points, &limits, 300.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end, segments[1].start);
        assert_eq!(segments[1].parent_id, 2);
    }

    #[test]
    fn test_pure_z_move_is_kept() {
        let limits = KinematicLimits::default();
        let points = waypoints(&[(0.0, 0.0, 0.0), (0.0, 0.0, 2.0)]);
        let segments = build_segments(&points, &limits, 300.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].a_max, 25.0);
        assert!((segments[0].length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_feedrate_overrides_nominal() {
        let limits = KinematicLimits::default();
        let mut points = waypoints(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)]);
        points[1].feedrate = Some(20.0);
        let segments = build_segments(&points, &limits, 300.0).unwrap();
        assert_eq!(segments[0].profile.v0, 20.0);
        assert_eq!(segments[0].profile.v, 20.0);
    }

    #[test]
    fn test_point_at() {
        let limits = KinematicLimits::default();
        let segment = LineSegment::from_geometry(
            0,
            "",
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(1.0, 11.0, 0.0),
            10.0,
            10.0,
            &limits,
        )
        .unwrap()
        .unwrap();
        assert_eq!(segment.point_at(4.0), Vector3::new(1.0, 5.0, 0.0));
    }
}
