// src/motion/mod.rs - Trapezoidal motion planning

pub mod junction;
pub mod kinematics;
pub mod limits;
pub mod planner;
pub mod segment;
pub mod trajectory;
pub mod vector;

pub use junction::{junction_velocity, CollinearJunction, ReversalJunction};
pub use kinematics::{solve, KinematicsError, MotionProfile};
pub use limits::{limit_by_axis, KinematicLimits};
pub use planner::{
    backward_pass, plan_segment, ForwardPass, MotionPlanner, PassDirection, PlannerError,
    PlannerOptions, Resolution,
};
pub use segment::{build_segments, LineSegment, DEGENERATE_DISTANCE};
pub use trajectory::{MotionState, SamplingError, TimelinePoint, Trajectory, MAX_VELOCITY_SAMPLES};
pub use vector::Vector3;
