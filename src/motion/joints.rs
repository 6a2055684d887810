// Joint indexing and per-joint angle ranges
//
// The numeric order of JointIndex is shared with the remote controller, so a
// joint travels over the wire as its index (0..7).

use serde::{Deserialize, Serialize};

/// Number of actuators driven by the runtime
pub const JOINT_COUNT: usize = 8;

/// One of the eight actuators, in wire order
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JointIndex {
    LeftHip = 0,
    LeftKnee = 1,
    LeftAnkle = 2,
    RightHip = 3,
    RightKnee = 4,
    RightAnkle = 5,
    NeckTilt = 6,
    NeckPan = 7,
}

impl JointIndex {
    pub const ALL: [JointIndex; JOINT_COUNT] = [
        JointIndex::LeftHip,
        JointIndex::LeftKnee,
        JointIndex::LeftAnkle,
        JointIndex::RightHip,
        JointIndex::RightKnee,
        JointIndex::RightAnkle,
        JointIndex::NeckTilt,
        JointIndex::NeckPan,
    ];

    /// Left leg joints: [hip, knee, ankle]
    pub const LEFT_LEG: [JointIndex; 3] = [
        JointIndex::LeftHip,
        JointIndex::LeftKnee,
        JointIndex::LeftAnkle,
    ];

    /// Right leg joints: [hip, knee, ankle]
    pub const RIGHT_LEG: [JointIndex; 3] = [
        JointIndex::RightHip,
        JointIndex::RightKnee,
        JointIndex::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            JointIndex::LeftHip => "left_hip",
            JointIndex::LeftKnee => "left_knee",
            JointIndex::LeftAnkle => "left_ankle",
            JointIndex::RightHip => "right_hip",
            JointIndex::RightKnee => "right_knee",
            JointIndex::RightAnkle => "right_ankle",
            JointIndex::NeckTilt => "neck_tilt",
            JointIndex::NeckPan => "neck_pan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Joint index {0} out of range (expected 0..8)")]
pub struct JointIndexError(pub u8);

impl TryFrom<u8> for JointIndex {
    type Error = JointIndexError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        JointIndex::ALL
            .get(value as usize)
            .copied()
            .ok_or(JointIndexError(value))
    }
}

impl From<JointIndex> for u8 {
    fn from(joint: JointIndex) -> Self {
        joint as u8
    }
}

impl std::fmt::Display for JointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}

/// Inclusive angle range of a joint, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointRange {
    pub min: i32,
    pub max: i32,
}

impl JointRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, angle: i32) -> i32 {
        angle.clamp(self.min, self.max)
    }

    pub fn contains(&self, angle: i32) -> bool {
        (self.min..=self.max).contains(&angle)
    }

    /// Width of the range in degrees
    pub fn width(&self) -> i32 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}
