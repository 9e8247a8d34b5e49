// toolpath_planner: look-ahead trapezoidal motion planning for lowered toolpaths

pub mod config;
pub mod motion;
pub mod toolpath;

pub use config::{load_config, ConfigError, PlannerConfig};
pub use motion::{
    KinematicLimits, LineSegment, MotionPlanner, MotionProfile, PlannerError, PlannerOptions,
    Trajectory, Vector3,
};
pub use toolpath::{resolve_waypoints, MoveCommand, Waypoint};
