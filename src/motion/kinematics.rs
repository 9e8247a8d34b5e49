// src/motion/kinematics.rs - Closed-form constant-acceleration kinematics
//! Solver for single-interval, constant-acceleration motion.
//!
//! A [`MotionProfile`] is described by five scalars: initial speed `v0`,
//! final speed `v`, signed acceleration `a`, duration `t` and displacement `x`.
//! Any three of them determine the other two; [`solve`] covers all ten
//! combinations of two unknowns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Divisors with a smaller magnitude are treated as zero.
const DIVISOR_EPSILON: f64 = 1e-12;

/// Rounding slack below zero that is clamped instead of rejected.
const NEGATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("Expected exactly 2 unknown profile values, found {0}")]
    UnknownCount(usize),
    #[error("Division by zero: {0} is zero")]
    DivisionByZero(&'static str),
    #[error("Negative radicand ({value:.6e}) while solving for {slot}")]
    NegativeRadicand { slot: &'static str, value: f64 },
    #[error("{slot} resolved to a negative value ({value:.6e})")]
    NegativeResult { slot: &'static str, value: f64 },
    #[error("{0} resolved to a non-finite value")]
    NonFinite(&'static str),
}

/// One constant-acceleration interval along a segment's direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Initial speed (mm/s)
    pub v0: f64,
    /// Final speed (mm/s)
    pub v: f64,
    /// Signed acceleration (mm/s²)
    pub a: f64,
    /// Duration (s)
    pub t: f64,
    /// Displacement (mm)
    pub x: f64,
}

impl MotionProfile {
    /// The same motion viewed backwards in time.
    pub fn reversed(&self) -> Self {
        Self {
            v0: self.v,
            v: self.v0,
            a: -self.a,
            t: self.t,
            x: self.x,
        }
    }

    pub fn velocity_at(&self, time: f64) -> f64 {
        let time = time.clamp(0.0, self.t);
        self.v0 + self.a * time
    }

    pub fn displacement_at(&self, time: f64) -> f64 {
        let time = time.clamp(0.0, self.t);
        self.v0 * time + 0.5 * self.a * time * time
    }

    pub fn peak_speed(&self) -> f64 {
        self.v0.max(self.v)
    }

    /// Checks `v = v0 + a·t` and `x = v0·t + a·t²/2` within a relative tolerance.
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let scale_v = 1.0_f64.max(self.v.abs()).max(self.v0.abs());
        let scale_x = 1.0_f64.max(self.x.abs());
        let dv = (self.v - (self.v0 + self.a * self.t)).abs();
        let dx = (self.x - (self.v0 * self.t + 0.5 * self.a * self.t * self.t)).abs();
        dv <= tolerance * scale_v && dx <= tolerance * scale_x
    }

    fn checked(self) -> Result<Self, KinematicsError> {
        if !self.a.is_finite() {
            return Err(KinematicsError::NonFinite("a"));
        }
        Ok(Self {
            v0: non_negative(self.v0, "v0")?,
            v: non_negative(self.v, "v")?,
            a: self.a,
            t: non_negative(self.t, "t")?,
            x: non_negative(self.x, "x")?,
        })
    }
}

/// Resolve the two missing values of a constant-acceleration profile.
///
/// Exactly three of the arguments must be `Some` and not NaN. Results that
/// would divide by zero, take the root of a negative number, or produce a
/// negative speed, duration or displacement are reported as errors rather
/// than returned as NaN or infinity.
pub fn solve(
    v0: Option<f64>,
    v: Option<f64>,
    a: Option<f64>,
    t: Option<f64>,
    x: Option<f64>,
) -> Result<MotionProfile, KinematicsError> {
    let known = |slot: Option<f64>| slot.filter(|value| !value.is_nan());
    let (v0, v, a, t, x) = (known(v0), known(v), known(a), known(t), known(x));
    let unknowns = [v0, v, a, t, x].iter().filter(|slot| slot.is_none()).count();
    if unknowns != 2 {
        return Err(KinematicsError::UnknownCount(unknowns));
    }

    let profile = match (v0, v, a, t, x) {
        (None, None, Some(a), Some(t), Some(x)) => {
            let t = divisor(t, "t")?;
            let v0 = x / t - a * t / 2.0;
            MotionProfile { v0, v: v0 + a * t, a, t, x }
        }
        (None, Some(v), None, Some(t), Some(x)) => {
            let t = divisor(t, "t")?;
            let v0 = 2.0 * x / t - v;
            MotionProfile { v0, v, a: (v - v0) / t, t, x }
        }
        (None, Some(v), Some(a), None, Some(x)) => {
            let accel = divisor(a, "a")?;
            let v0 = root(v * v - 2.0 * a * x, "v0")?;
            MotionProfile { v0, v, a, t: (v - v0) / accel, x }
        }
        (None, Some(v), Some(a), Some(t), None) => {
            let v0 = v - a * t;
            MotionProfile { v0, v, a, t, x: t * (v0 + v) / 2.0 }
        }
        (Some(v0), None, None, Some(t), Some(x)) => {
            let t = divisor(t, "t")?;
            let v = 2.0 * x / t - v0;
            MotionProfile { v0, v, a: (v - v0) / t, t, x }
        }
        (Some(v0), None, Some(a), None, Some(x)) => {
            let accel = divisor(a, "a")?;
            let v = root(v0 * v0 + 2.0 * a * x, "v")?;
            MotionProfile { v0, v, a, t: (v - v0) / accel, x }
        }
        (Some(v0), None, Some(a), Some(t), None) => MotionProfile {
            v0,
            v: v0 + a * t,
            a,
            t,
            x: v0 * t + a * t * t / 2.0,
        },
        (Some(v0), Some(v), None, None, Some(x)) => {
            let t = 2.0 * x / divisor(v0 + v, "v0 + v")?;
            let a = if v == v0 { 0.0 } else { (v - v0) / divisor(t, "t")? };
            MotionProfile { v0, v, a, t, x }
        }
        (Some(v0), Some(v), None, Some(t), None) => {
            let t = divisor(t, "t")?;
            MotionProfile { v0, v, a: (v - v0) / t, t, x: t * (v0 + v) / 2.0 }
        }
        (Some(v0), Some(v), Some(a), None, None) => {
            let t = (v - v0) / divisor(a, "a")?;
            MotionProfile { v0, v, a, t, x: t * (v0 + v) / 2.0 }
        }
        _ => return Err(KinematicsError::UnknownCount(unknowns)),
    };

    profile.checked()
}

fn divisor(value: f64, slot: &'static str) -> Result<f64, KinematicsError> {
    if value.abs() < DIVISOR_EPSILON {
        Err(KinematicsError::DivisionByZero(slot))
    } else {
        Ok(value)
    }
}

fn root(radicand: f64, slot: &'static str) -> Result<f64, KinematicsError> {
    if radicand >= 0.0 {
        Ok(radicand.sqrt())
    } else if radicand > -NEGATIVE_TOLERANCE {
        Ok(0.0)
    } else {
        Err(KinematicsError::NegativeRadicand { slot, value: radicand })
    }
}

fn non_negative(value: f64, slot: &'static str) -> Result<f64, KinematicsError> {
    if !value.is_finite() {
        Err(KinematicsError::NonFinite(slot))
    } else if value < -NEGATIVE_TOLERANCE {
        Err(KinematicsError::NegativeResult { slot, value })
    } else {
        Ok(value.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_profile(actual: &MotionProfile, expected: &MotionProfile) {
        assert!((actual.v0 - expected.v0).abs() < EPS, "v0: {:?} vs {:?}", actual, expected);
        assert!((actual.v - expected.v).abs() < EPS, "v: {:?} vs {:?}", actual, expected);
        assert!((actual.a - expected.a).abs() < EPS, "a: {:?} vs {:?}", actual, expected);
        assert!((actual.t - expected.t).abs() < EPS, "t: {:?} vs {:?}", actual, expected);
        assert!((actual.x - expected.x).abs() < EPS, "x: {:?} vs {:?}", actual, expected);
    }

    fn drop_two(p: &MotionProfile, mask: [bool; 5]) -> MotionProfile {
        let pick = |keep: bool, value: f64| if keep { Some(value) } else { None };
        solve(
            pick(mask[0], p.v0),
            pick(mask[1], p.v),
            pick(mask[2], p.a),
            pick(mask[3], p.t),
            pick(mask[4], p.x),
        )
        .unwrap()
    }

    fn all_masks() -> Vec<[bool; 5]> {
        let mut masks = Vec::new();
        for i in 0..5 {
            for j in (i + 1)..5 {
                let mut mask = [true; 5];
                mask[i] = false;
                mask[j] = false;
                masks.push(mask);
            }
        }
        masks
    }

    #[test]
    fn test_every_pair_of_unknowns_accelerating() {
        let full = MotionProfile { v0: 2.0, v: 14.0, a: 3.0, t: 4.0, x: 32.0 };
        let masks = all_masks();
        assert_eq!(masks.len(), 10);
        for mask in masks {
            assert_profile(&drop_two(&full, mask), &full);
        }
    }

    #[test]
    fn test_every_pair_of_unknowns_decelerating() {
        let full = MotionProfile { v0: 14.0, v: 2.0, a: -3.0, t: 4.0, x: 32.0 };
        for mask in all_masks() {
            assert_profile(&drop_two(&full, mask), &full);
        }
    }

    #[test]
    fn test_cruise_from_speeds_and_length() {
        let profile = solve(Some(50.0), Some(50.0), None, None, Some(10.0)).unwrap();
        assert_eq!(profile.a, 0.0);
        assert!((profile.t - 0.2).abs() < EPS);
        assert!(profile.is_consistent(1e-9));
    }

    #[test]
    fn test_wrong_unknown_count() {
        assert_eq!(
            solve(Some(1.0), Some(1.0), Some(0.0), Some(1.0), None),
            Err(KinematicsError::UnknownCount(1))
        );
        assert_eq!(
            solve(Some(1.0), None, None, None, Some(1.0)),
            Err(KinematicsError::UnknownCount(3))
        );
    }

    #[test]
    fn test_nan_counts_as_unknown() {
        let result = solve(Some(f64::NAN), Some(1.0), Some(0.0), Some(1.0), Some(1.0));
        assert_eq!(result, Err(KinematicsError::UnknownCount(1)));
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        assert_eq!(
            solve(None, None, Some(1.0), Some(0.0), Some(1.0)),
            Err(KinematicsError::DivisionByZero("t"))
        );
        assert_eq!(
            solve(Some(1.0), Some(2.0), Some(0.0), None, None),
            Err(KinematicsError::DivisionByZero("a"))
        );
        assert_eq!(
            solve(Some(0.0), Some(0.0), None, None, Some(1.0)),
            Err(KinematicsError::DivisionByZero("v0 + v"))
        );
    }

    #[test]
    fn test_negative_radicand_is_reported() {
        let result = solve(Some(1.0), None, Some(-10.0), None, Some(10.0));
        assert!(matches!(result, Err(KinematicsError::NegativeRadicand { slot: "v", .. })));
    }

    #[test]
    fn test_negative_speed_is_reported() {
        let result = solve(None, None, Some(10.0), Some(1.0), Some(1.0));
        assert!(matches!(result, Err(KinematicsError::NegativeResult { slot: "v0", .. })));
    }

    #[test]
    fn test_reversed_swaps_speeds_and_negates_acceleration() {
        let profile = MotionProfile { v0: 2.0, v: 14.0, a: 3.0, t: 4.0, x: 32.0 };
        let reversed = profile.reversed();
        assert_eq!(reversed.v0, 14.0);
        assert_eq!(reversed.v, 2.0);
        assert_eq!(reversed.a, -3.0);
        assert!(reversed.is_consistent(1e-12));
        assert_eq!(reversed.reversed(), profile);
    }

    #[test]
    fn test_state_at_time() {
        let profile = MotionProfile { v0: 2.0, v: 14.0, a: 3.0, t: 4.0, x: 32.0 };
        assert_eq!(profile.velocity_at(2.0), 8.0);
        assert_eq!(profile.displacement_at(2.0), 10.0);
        assert_eq!(profile.velocity_at(10.0), 14.0);
        assert_eq!(profile.displacement_at(-1.0), 0.0);
    }
}
