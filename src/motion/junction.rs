// src/motion/junction.rs - Cornering speed between consecutive segments
use serde::{Deserialize, Serialize};

use super::limits::{limit_by_axis, KinematicLimits};
use super::segment::LineSegment;

/// Direction-change cosine above which two segments count as collinear.
pub const COLLINEAR_COS: f64 = 0.9999;

/// Direction-change cosine below which two segments count as reversed.
pub const REVERSAL_COS: f64 = -0.9999;

/// Speed allowed through a junction whose segments are (nearly) collinear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollinearJunction {
    /// Cap at `junction_speed`
    #[default]
    Floor,
    /// No cap
    Unlimited,
}

/// How the planner treats a junction where the direction fully reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalJunction {
    /// Leave the running entry velocity untouched
    #[default]
    Unconstrained,
    /// Come to a full stop at the junction
    FullStop,
}

/// Cosine of the direction change from `incoming` to `outgoing`:
/// `1` when they continue straight, `-1` when the path doubles back.
pub fn direction_change_cos(incoming: &LineSegment, outgoing: &LineSegment) -> f64 {
    incoming.unit.dot(&outgoing.unit).clamp(-1.0, 1.0)
}

/// Maximum speed while transiting the corner from `incoming` to `outgoing`.
///
/// `None` means the junction imposes no velocity of its own, which is what a
/// full reversal reports; the caller decides what that means via
/// [`ReversalJunction`].
pub fn junction_velocity(
    incoming: &LineSegment,
    outgoing: &LineSegment,
    limits: &KinematicLimits,
    collinear: CollinearJunction,
) -> Option<f64> {
    let cos_theta = direction_change_cos(incoming, outgoing);

    if cos_theta > COLLINEAR_COS {
        return match collinear {
            CollinearJunction::Floor => Some(limits.junction_speed),
            CollinearJunction::Unlimited => None,
        };
    }
    if cos_theta < REVERSAL_COS {
        return None;
    }

    let junction_vec = (outgoing.unit - incoming.unit).normalize()?;
    let junction_acceleration = limit_by_axis(&junction_vec, &limits.a_max);
    // Half of the interior angle between the two moves: shrinks toward zero
    // as the path doubles back, so sharper corners get a tighter cap
    let sin_half = (0.5 * (1.0 + cos_theta)).max(0.0).sqrt();
    let junction_velocity =
        (junction_acceleration * limits.junction_deviation * sin_half) / (1.0 - sin_half);

    Some(limits.junction_speed.max(junction_velocity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::vector::Vector3;

    fn segment(start: (f64, f64), end: (f64, f64)) -> LineSegment {
        LineSegment::from_geometry(
            0,
            "",
            Vector3::new(start.0, start.1, 0.0),
            Vector3::new(end.0, end.1, 0.0),
            100.0,
            100.0,
            &KinematicLimits::default(),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_right_angle_corner() {
        let limits = KinematicLimits::default();
        let p = segment((0.0, 0.0), (10.0, 0.0));
        let s = segment((10.0, 0.0), (10.0, 5.0));
        assert!(direction_change_cos(&p, &s).abs() < 1e-12);

        let v = junction_velocity(&p, &s, &limits, CollinearJunction::Floor).unwrap();
        let sin_half = 0.5f64.sqrt();
        let accel = 50.0 / sin_half;
        let expected = accel * 1e-3 * sin_half / (1.0 - sin_half);
        assert!((v - expected).abs() < 1e-9, "{} vs {}", v, expected);
        assert!(v > limits.junction_speed);
    }

    #[test]
    fn test_collinear_returns_floor() {
        let limits = KinematicLimits::default();
        let p = segment((0.0, 0.0), (5.0, 0.0));
        let s = segment((5.0, 0.0), (10.0, 0.0));
        assert_eq!(
            junction_velocity(&p, &s, &limits, CollinearJunction::Floor),
            Some(limits.junction_speed)
        );
        assert_eq!(junction_velocity(&p, &s, &limits, CollinearJunction::Unlimited), None);
    }

    #[test]
    fn test_reversal_has_no_junction_velocity() {
        let limits = KinematicLimits::default();
        let p = segment((0.0, 0.0), (5.0, 0.0));
        let s = segment((5.0, 0.0), (0.0, 0.0));
        assert_eq!(junction_velocity(&p, &s, &limits, CollinearJunction::Floor), None);
    }

    #[test]
    fn test_small_junction_clamps_to_floor() {
        let mut limits = KinematicLimits::default();
        limits.junction_deviation = 1e-9;
        let p = segment((0.0, 0.0), (10.0, 0.0));
        let s = segment((10.0, 0.0), (10.0, 5.0));
        assert_eq!(
            junction_velocity(&p, &s, &limits, CollinearJunction::Floor),
            Some(limits.junction_speed)
        );
    }

    #[test]
    fn test_sharper_turn_gets_tighter_cap() {
        let limits = KinematicLimits { junction_speed: 1e-6, ..KinematicLimits::default() };
        let p = segment((0.0, 0.0), (10.0, 0.0));
        let gentle = segment((10.0, 0.0), (20.0, 2.0));
        let sharp = segment((10.0, 0.0), (2.0, 2.0));
        let v_gentle = junction_velocity(&p, &gentle, &limits, CollinearJunction::Floor).unwrap();
        let v_sharp = junction_velocity(&p, &sharp, &limits, CollinearJunction::Floor).unwrap();
        assert!(v_gentle.is_finite() && v_sharp.is_finite());
        assert!(v_gentle > v_sharp, "gentle {} vs sharp {}", v_gentle, v_sharp);
    }

    #[test]
    fn test_ten_degree_turn_is_well_above_floor() {
        let limits = KinematicLimits::default();
        let p = segment((0.0, 0.0), (10.0, 0.0));
        let angle = 10f64.to_radians();
        let s = segment((10.0, 0.0), (10.0 + 10.0 * angle.cos(), 10.0 * angle.sin()));
        let hairpin_angle = 170f64.to_radians();
        let h = segment((10.0, 0.0), (10.0 + 10.0 * hairpin_angle.cos(), 10.0 * hairpin_angle.sin()));

        let v_turn = junction_velocity(&p, &s, &limits, CollinearJunction::Floor).unwrap();
        let v_hairpin = junction_velocity(&p, &h, &limits, CollinearJunction::Floor).unwrap();
        // sin(85°) / (1 - sin(85°)) ≈ 261.5 against an acceleration of at least 50
        assert!(v_turn > 12.0, "{}", v_turn);
        assert!(v_hairpin < 0.1, "{}", v_hairpin);
    }
}
