// src/toolpath.rs - Lowered move commands and waypoint resolution
use serde::{Deserialize, Serialize};

use crate::motion::{PlannerError, Vector3};

/// One row of the lowered instruction stream.
///
/// A `None` axis means "unchanged from the previous position".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveCommand {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    /// Requested speed along the move (mm/s), if the source carried one
    #[serde(default)]
    pub feedrate: Option<f64>,
    /// Source text the command was lowered from
    #[serde(default)]
    pub instruction: String,
}

impl MoveCommand {
    pub fn new(x: Option<f64>, y: Option<f64>, z: Option<f64>, instruction: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            feedrate: None,
            instruction: instruction.into(),
        }
    }

    /// Planar move that leaves Z untouched.
    pub fn xy(x: f64, y: f64, instruction: impl Into<String>) -> Self {
        Self::new(Some(x), Some(y), None, instruction)
    }

    pub fn with_feedrate(mut self, feedrate: f64) -> Self {
        self.feedrate = Some(feedrate);
        self
    }
}

/// A fully resolved position the tool must pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vector3,
    /// Index of the move command that produced this waypoint
    pub parent_id: usize,
    pub instruction: String,
    pub feedrate: Option<f64>,
}

impl Waypoint {
    pub fn new(position: Vector3, parent_id: usize, instruction: impl Into<String>) -> Self {
        Self {
            position,
            parent_id,
            instruction: instruction.into(),
            feedrate: None,
        }
    }
}

/// Carry unspecified axes forward from `origin` through `commands`.
///
/// The returned list starts with the origin itself (`parent_id` 0, empty
/// instruction) followed by one waypoint per command, so command `i`
/// becomes waypoint `i + 1` with `parent_id == i`.
pub fn resolve_waypoints(commands: &[MoveCommand], origin: Vector3) -> Result<Vec<Waypoint>, PlannerError> {
    let mut waypoints = Vec::with_capacity(commands.len() + 1);
    waypoints.push(Waypoint::new(origin, 0, ""));
    let mut current = origin;
    for (index, command) in commands.iter().enumerate() {
        let next = Vector3::new(
            command.x.unwrap_or(current.x),
            command.y.unwrap_or(current.y),
            command.z.unwrap_or(current.z),
        );
        if !(next.x.is_finite() && next.y.is_finite() && next.z.is_finite()) {
            return Err(PlannerError::InvalidCoordinate {
                parent_id: index,
                instruction: command.instruction.clone(),
            });
        }
        if let Some(feedrate) = command.feedrate {
            if !(feedrate > 0.0 && feedrate.is_finite()) {
                return Err(PlannerError::InvalidFeedrate { parent_id: index, feedrate });
            }
        }
        waypoints.push(Waypoint {
            position: next,
            parent_id: index,
            instruction: command.instruction.clone(),
            feedrate: command.feedrate,
        });
        current = next;
    }
    Ok(waypoints)
}
