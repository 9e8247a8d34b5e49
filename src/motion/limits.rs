// src/motion/limits.rs - Machine limits used by every planning stage
use serde::{Deserialize, Serialize};

use super::vector::Vector3;

/// Per-axis velocity and acceleration ceilings plus cornering parameters.
///
/// Constant for the duration of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicLimits {
    /// Maximum velocity per axis (mm/s)
    #[serde(default = "default_v_max")]
    pub v_max: Vector3,
    /// Maximum acceleration per axis (mm/s²)
    #[serde(default = "default_a_max")]
    pub a_max: Vector3,
    /// Minimum guaranteed cornering speed (mm/s)
    #[serde(default = "default_junction_speed")]
    pub junction_speed: f64,
    /// Tolerated deviation from the ideal corner (mm)
    #[serde(default = "default_junction_deviation")]
    pub junction_deviation: f64,
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            v_max: default_v_max(),
            a_max: default_a_max(),
            junction_speed: default_junction_speed(),
            junction_deviation: default_junction_deviation(),
        }
    }
}

impl KinematicLimits {
    pub fn validate(&self) -> Result<(), String> {
        for (name, limits) in [("v_max", &self.v_max), ("a_max", &self.a_max)] {
            for (axis, value) in ["x", "y", "z"].iter().zip(limits.components()) {
                if !(value > 0.0 && value.is_finite()) {
                    return Err(format!("{}.{} must be > 0, got {}", name, axis, value));
                }
            }
        }
        if !(self.junction_speed > 0.0 && self.junction_speed.is_finite()) {
            return Err(format!("junction_speed must be > 0, got {}", self.junction_speed));
        }
        if !(self.junction_deviation > 0.0 && self.junction_deviation.is_finite()) {
            return Err(format!(
                "junction_deviation must be > 0, got {}",
                self.junction_deviation
            ));
        }
        Ok(())
    }

    /// Fastest speed along `direction` that keeps every axis within `v_max`.
    pub fn velocity_along(&self, direction: &Vector3) -> f64 {
        limit_by_axis(direction, &self.v_max)
    }

    /// Largest acceleration along `direction` that keeps every axis within `a_max`.
    pub fn acceleration_along(&self, direction: &Vector3) -> f64 {
        limit_by_axis(direction, &self.a_max)
    }

    /// Nominal cruise speed before any limiting pass runs.
    pub fn nominal_speed(&self) -> f64 {
        self.v_max.x.max(self.v_max.y)
    }
}

/// Largest uniform magnitude along `direction` such that no axis component
/// exceeds its limit, i.e. `min(limit[i] / |direction[i]|)` over the axes
/// the direction actually moves. Equivalent to
/// `1 / max(|direction[i]| / limit[i])` for unit directions.
pub fn limit_by_axis(direction: &Vector3, limits: &Vector3) -> f64 {
    let mut limit = f64::INFINITY;
    for (component, axis_limit) in direction.components().iter().zip(limits.components()) {
        let component = component.abs();
        if component > 0.0 {
            limit = limit.min(axis_limit / component);
        }
    }
    limit
}

fn default_v_max() -> Vector3 { Vector3::new(300.0, 300.0, 150.0) }
fn default_a_max() -> Vector3 { Vector3::new(50.0, 50.0, 25.0) }
fn default_junction_speed() -> f64 { 1e-2 }
fn default_junction_deviation() -> f64 { 1e-3 }
