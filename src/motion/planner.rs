// src/motion/planner.rs - Look-ahead velocity planning over line segments
//! Two-pass trapezoidal planner.
//!
//! The forward pass limits every segment by its velocity cap, the cornering
//! speed at its junction and how fast it can accelerate from the previous
//! segment's exit speed. The backward pass then walks the result from the end
//! and makes sure every segment can still decelerate in time for the one that
//! follows. Both passes are built on [`plan_segment`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::junction::{
    direction_change_cos, junction_velocity, CollinearJunction, ReversalJunction, REVERSAL_COS,
};
use super::kinematics::{self, KinematicsError};
use super::limits::KinematicLimits;
use super::segment::{build_segments, LineSegment};
use super::trajectory::Trajectory;
use super::vector::Vector3;
use crate::toolpath::{resolve_waypoints, MoveCommand, Waypoint};

/// Split points closer than this to the far end of a segment (relative to its
/// length, or in mm for segments shorter than 1mm) are not worth a separate
/// piece.
const SPLIT_EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Kinematics error in move {parent_id}: {source}")]
    Kinematics {
        parent_id: usize,
        #[source]
        source: KinematicsError,
    },
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),
    #[error("Invalid planner options: {0}")]
    InvalidOptions(String),
    #[error("Move {parent_id} ({instruction:?}) has a non-finite coordinate")]
    InvalidCoordinate { parent_id: usize, instruction: String },
    #[error("Move {parent_id} has an invalid feedrate: {feedrate}")]
    InvalidFeedrate { parent_id: usize, feedrate: f64 },
}

impl PlannerError {
    fn kinematics(segment: &LineSegment, source: KinematicsError) -> Self {
        PlannerError::Kinematics {
            parent_id: segment.parent_id,
            source,
        }
    }
}

/// Per-plan settings that are not machine limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerOptions {
    /// Speed the tool already has at the first waypoint (mm/s)
    #[serde(default)]
    pub entry_velocity: f64,
    /// Highest speed allowed at the last waypoint (mm/s)
    #[serde(default)]
    pub exit_velocity: f64,
    /// Cruise speed for moves without a feedrate; defaults to the faster of
    /// the X/Y velocity limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_speed: Option<f64>,
    /// Position before the first move command
    #[serde(default)]
    pub origin: Vector3,
    #[serde(default)]
    pub collinear_junction: CollinearJunction,
    #[serde(default)]
    pub reversal_junction: ReversalJunction,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            entry_velocity: 0.0,
            exit_velocity: 0.0,
            nominal_speed: None,
            origin: Vector3::ZERO,
            collinear_junction: CollinearJunction::default(),
            reversal_junction: ReversalJunction::default(),
        }
    }
}

impl PlannerOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.entry_velocity >= 0.0 && self.entry_velocity.is_finite()) {
            return Err(format!("entry_velocity must be >= 0, got {}", self.entry_velocity));
        }
        if !(self.exit_velocity >= 0.0 && self.exit_velocity.is_finite()) {
            return Err(format!("exit_velocity must be >= 0, got {}", self.exit_velocity));
        }
        if let Some(nominal) = self.nominal_speed {
            if !(nominal > 0.0 && nominal.is_finite()) {
                return Err(format!("nominal_speed must be > 0, got {}", nominal));
            }
        }
        let origin = self.origin;
        if !(origin.x.is_finite() && origin.y.is_finite() && origin.z.is_finite()) {
            return Err("origin must be finite".to_string());
        }
        Ok(())
    }
}

/// Which way in time [`plan_segment`] looks at a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassDirection {
    /// Bound applies to the segment's entry speed
    Forward,
    /// Bound applies to the segment's exit speed
    Reverse,
}

/// Outcome of resolving one segment against a speed bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The segment already respected the bound
    Unchanged(LineSegment),
    /// Same geometry, new profile at full acceleration over the whole length
    Reprofiled(LineSegment),
    /// Two contiguous pieces in forward spatial order
    Split(LineSegment, LineSegment),
}

impl Resolution {
    /// Speed at the start of the first piece.
    pub fn entry_speed(&self) -> f64 {
        match self {
            Resolution::Unchanged(s) | Resolution::Reprofiled(s) => s.entry_speed(),
            Resolution::Split(first, _) => first.entry_speed(),
        }
    }

    /// Speed at the end of the last piece.
    pub fn exit_speed(&self) -> f64 {
        match self {
            Resolution::Unchanged(s) | Resolution::Reprofiled(s) => s.exit_speed(),
            Resolution::Split(_, second) => second.exit_speed(),
        }
    }
}

impl IntoIterator for Resolution {
    type Item = LineSegment;
    type IntoIter = std::iter::Chain<std::option::IntoIter<LineSegment>, std::option::IntoIter<LineSegment>>;

    fn into_iter(self) -> Self::IntoIter {
        let (first, second) = match self {
            Resolution::Unchanged(s) | Resolution::Reprofiled(s) => (s, None),
            Resolution::Split(first, second) => (first, Some(second)),
        };
        Some(first).into_iter().chain(second)
    }
}

/// Make `segment` respect `bound` at its entry (forward) or exit (reverse).
///
/// The profile is viewed in the pass direction. If its starting speed is
/// above the bound, a replacement starts at the bound and accelerates at
/// `a_max` until it meets the original speed curve, then follows the
/// original acceleration for the rest of the length. When the curves never
/// meet inside the segment, the whole segment is re-profiled at `a_max`.
///
/// In reverse mode the pieces are reversed back into forward time and
/// returned in forward spatial order, so a "slow down, then continue" in
/// reversed time becomes "continue, then slow down".
pub fn plan_segment(
    segment: &LineSegment,
    bound: f64,
    direction: PassDirection,
) -> Result<Resolution, KinematicsError> {
    let profile = match direction {
        PassDirection::Forward => segment.profile,
        PassDirection::Reverse => segment.profile.reversed(),
    };
    if profile.v0 <= bound {
        return Ok(Resolution::Unchanged(segment.clone()));
    }

    let bound = bound.max(0.0);
    let a_max = segment.a_max;
    let da = a_max - profile.a;
    let dv2 = profile.v0 * profile.v0 - bound * bound;

    // Distance at which v² = bound² + 2·a_max·s catches up with v0² + 2·a·s
    let crossing_distance = if da > 0.0 { dv2 / (2.0 * da) } else { f64::INFINITY };
    if profile.x - crossing_distance <= SPLIT_EPSILON * profile.x.max(1.0) {
        let braked = kinematics::solve(Some(bound), None, Some(a_max), None, Some(profile.x))?;
        let braked = match direction {
            PassDirection::Forward => braked,
            PassDirection::Reverse => braked.reversed(),
        };
        return Ok(Resolution::Reprofiled(segment.with_profile(braked)));
    }

    let first = kinematics::solve(Some(bound), None, Some(a_max), None, Some(crossing_distance))?;
    let rest = kinematics::solve(
        Some(first.v),
        Some(profile.v),
        None,
        None,
        Some(profile.x - crossing_distance),
    )?;

    tracing::trace!(
        "Splitting move {} at {:.6}mm of {:.6}mm ({:?})",
        segment.parent_id,
        crossing_distance,
        profile.x,
        direction
    );

    Ok(match direction {
        PassDirection::Forward => {
            let crossing = segment.point_at(crossing_distance);
            Resolution::Split(
                segment.piece(segment.start, crossing, first),
                segment.piece(crossing, segment.end, rest),
            )
        }
        PassDirection::Reverse => {
            let crossing = segment.end - segment.unit * crossing_distance;
            Resolution::Split(
                segment.piece(segment.start, crossing, rest.reversed()),
                segment.piece(crossing, segment.end, first.reversed()),
            )
        }
    })
}

/// Clamp a segment's endpoint speeds to `v_cap` and its acceleration to
/// `±a_max`, re-solving the profile when anything changed.
pub fn conform_to_limits(segment: &LineSegment, v_cap: f64) -> Result<LineSegment, KinematicsError> {
    let original = segment.profile;
    let v0 = original.v0.min(v_cap);
    let v = original.v.min(v_cap);
    let mut profile = if v0 < original.v0 || v < original.v {
        kinematics::solve(Some(v0), Some(v), None, None, Some(original.x))?
    } else {
        original
    };

    if profile.a > segment.a_max {
        profile = kinematics::solve(Some(profile.v0), None, Some(segment.a_max), None, Some(profile.x))?;
    } else if profile.a < -segment.a_max {
        profile = kinematics::solve(None, Some(profile.v), Some(-segment.a_max), None, Some(profile.x))?;
    }

    if profile == original {
        Ok(segment.clone())
    } else {
        Ok(segment.with_profile(profile))
    }
}

/// Lazy forward sweep over raw segments.
///
/// Yields planned segments in order, one or two per input segment, and
/// threads the running entry velocity from each output to the next input.
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct ForwardPass<'a, I> {
    segments: I,
    limits: &'a KinematicLimits,
    options: &'a PlannerOptions,
    entry_velocity: f64,
    previous: Option<LineSegment>,
    pending: Option<LineSegment>,
    failed: bool,
}

impl<'a, I> ForwardPass<'a, I>
where
    I: Iterator<Item = LineSegment>,
{
    pub fn new(segments: I, limits: &'a KinematicLimits, options: &'a PlannerOptions) -> Self {
        Self {
            segments,
            limits,
            options,
            entry_velocity: options.entry_velocity,
            previous: None,
            pending: None,
            failed: false,
        }
    }

    /// Exit speed of the last yielded segment.
    pub fn entry_velocity(&self) -> f64 {
        self.entry_velocity
    }

    fn step(&mut self, segment: LineSegment) -> Result<LineSegment, PlannerError> {
        let v_cap = self.limits.velocity_along(&segment.unit);

        if let Some(previous) = &self.previous {
            match junction_velocity(previous, &segment, self.limits, self.options.collinear_junction) {
                Some(limit) => self.entry_velocity = self.entry_velocity.min(limit),
                None if direction_change_cos(previous, &segment) < REVERSAL_COS => {
                    match self.options.reversal_junction {
                        ReversalJunction::Unconstrained => {
                            tracing::debug!(
                                "Move {} reverses direction; junction left unconstrained",
                                segment.parent_id
                            );
                        }
                        ReversalJunction::FullStop => self.entry_velocity = 0.0,
                    }
                }
                None => {}
            }
        }

        let segment = conform_to_limits(&segment, v_cap)
            .map_err(|e| PlannerError::kinematics(&segment, e))?;
        let resolution = plan_segment(&segment, self.entry_velocity, PassDirection::Forward)
            .map_err(|e| PlannerError::kinematics(&segment, e))?;
        self.previous = Some(segment);

        self.entry_velocity = resolution.exit_speed();
        Ok(match resolution {
            Resolution::Unchanged(s) | Resolution::Reprofiled(s) => s,
            Resolution::Split(first, second) => {
                self.pending = Some(second);
                first
            }
        })
    }
}

impl<I> Iterator for ForwardPass<'_, I>
where
    I: Iterator<Item = LineSegment>,
{
    type Item = Result<LineSegment, PlannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(Ok(segment));
        }
        if self.failed {
            return None;
        }
        let segment = self.segments.next()?;
        match self.step(segment) {
            Ok(planned) => Some(Ok(planned)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.segments.size_hint();
        let pending = usize::from(self.pending.is_some());
        (lower + pending, upper.and_then(|u| u.checked_mul(2)).map(|u| u + pending))
    }
}

/// Backward sweep: make every segment able to slow down for its successor.
///
/// Walks `segments` from the end with a running bound that starts at
/// `exit_velocity`, and returns the resolved pieces in forward order.
pub fn backward_pass(segments: &[LineSegment], exit_velocity: f64) -> Result<Vec<LineSegment>, PlannerError> {
    let (mut planned, _) = segments.iter().rev().try_fold(
        (Vec::with_capacity(segments.len()), exit_velocity),
        |(mut planned, bound), segment| {
            let resolution = plan_segment(segment, bound, PassDirection::Reverse)
                .map_err(|e| PlannerError::kinematics(segment, e))?;
            let bound = resolution.entry_speed();
            match resolution {
                Resolution::Unchanged(s) | Resolution::Reprofiled(s) => planned.push(s),
                Resolution::Split(first, second) => {
                    planned.push(second);
                    planned.push(first);
                }
            }
            Ok::<_, PlannerError>((planned, bound))
        },
    )?;
    planned.reverse();
    Ok(planned)
}

/// Stateless planner: machine limits plus per-plan options.
#[derive(Debug, Clone)]
pub struct MotionPlanner {
    limits: KinematicLimits,
    options: PlannerOptions,
}

impl MotionPlanner {
    pub fn new(limits: KinematicLimits, options: PlannerOptions) -> Result<Self, PlannerError> {
        limits.validate().map_err(PlannerError::InvalidLimits)?;
        options.validate().map_err(PlannerError::InvalidOptions)?;
        Ok(Self { limits, options })
    }

    pub fn new_from_config(config: &crate::config::PlannerConfig) -> Result<Self, PlannerError> {
        Self::new(config.limits.clone(), config.planner.clone())
    }

    pub fn limits(&self) -> &KinematicLimits {
        &self.limits
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    pub fn nominal_speed(&self) -> f64 {
        self.options
            .nominal_speed
            .unwrap_or_else(|| self.limits.nominal_speed())
    }

    pub fn build_segments(&self, waypoints: &[Waypoint]) -> Result<Vec<LineSegment>, PlannerError> {
        build_segments(waypoints, &self.limits, self.nominal_speed())
    }

    pub fn forward_pass<I>(&self, segments: I) -> ForwardPass<'_, I::IntoIter>
    where
        I: IntoIterator<Item = LineSegment>,
    {
        ForwardPass::new(segments.into_iter(), &self.limits, &self.options)
    }

    pub fn backward_pass(&self, segments: &[LineSegment]) -> Result<Vec<LineSegment>, PlannerError> {
        backward_pass(segments, self.options.exit_velocity)
    }

    /// Plan through already resolved waypoints; the first one is the start.
    pub fn plan_waypoints(&self, waypoints: &[Waypoint]) -> Result<Trajectory, PlannerError> {
        let raw = self.build_segments(waypoints)?;
        let raw_count = raw.len();
        let forward = self.forward_pass(raw).collect::<Result<Vec<_>, _>>()?;
        let planned = self.backward_pass(&forward)?;
        tracing::debug!(
            "Planned {} segments ({} raw, {} after forward pass)",
            planned.len(),
            raw_count,
            forward.len()
        );
        Ok(Trajectory::new(planned))
    }

    /// Plan a lowered command stream starting from `options.origin`.
    pub fn plan(&self, commands: &[MoveCommand]) -> Result<Trajectory, PlannerError> {
        let waypoints = resolve_waypoints(commands, self.options.origin)?;
        self.plan_waypoints(&waypoints)
    }
}
