// Message types exchanged with teleop, sensors and monitors

use serde::{Deserialize, Serialize};

use crate::motion::{CommandMode, JOINT_COUNT, JointIndex, JointTarget};

// Command from teleop/gait scripts -> runtime: move both feet to (x, y)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LegCommand {
    pub x: f64,
    pub y: f64,
}

/// Full pose, one entry per joint in index order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PoseCommand {
    /// `{"joints": ["keep", "randomize", {"set_to": 90}, ...]}`
    Tagged { joints: [JointTarget; JOINT_COUNT] },
    /// Pose-table row: `[90, null, -1, ...]` (null keeps, -1 randomizes)
    Encoded([Option<i32>; JOINT_COUNT]),
}

impl PoseCommand {
    pub fn targets(&self) -> [JointTarget; JOINT_COUNT] {
        match self {
            PoseCommand::Tagged { joints } => *joints,
            PoseCommand::Encoded(row) => crate::motion::decode_pose(row),
        }
    }
}

/// Single-joint command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServoCommand {
    Set {
        joint: JointIndex,
        value: i32,
        mode: CommandMode,
    },
    Random {
        joint: JointIndex,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeedCommand {
    pub speed: u16,
}

/// Return to the start pose and drop the balance bias; the payload is `{}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResetCommand {}

/// Body pitch from the IMU node, in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TiltReading {
    pub pitch: f64,
}

/// Commanded state published by runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JointState {
    pub positions: [i32; JOINT_COUNT],
    pub hip_adjustment: f64,
    pub foot: Option<LegCommand>,
    pub speed: u16,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    DriverFault,
}
