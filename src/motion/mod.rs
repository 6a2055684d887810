// Motion core for the biped
//
// Provides:
// - Joint indexing and ranges
// - Planar leg inverse kinematics with left/right mirroring
// - Tilt-based hip balance correction
// - Position commands (absolute, relative, percent of range, random) with clamping
// - The handoff that carries commanded positions to the actuator driver
// - A coordinator tying the above together

pub mod balance;
pub mod command;
mod coordinator;
pub mod handoff;
pub mod joints;
pub mod kinematics;

pub use balance::{BalanceConfig, BalanceCorrector, HipCorrection};
pub use command::{CommandMode, PositionCommander};
pub use coordinator::{JointTarget, MotionCoordinator, decode_pose};
pub use handoff::{CommandFeed, CommandHandoff, MotionFrame, MotionSink, handoff};
pub use joints::{JOINT_COUNT, JointIndex, JointRange};
pub use kinematics::{FootTarget, KinematicsError, LegGeometry, LegSolution, LegSolver};
