// Position commands for the eight joints
//
// Every target is clamped into its joint's range before it is stored, so the
// commanded-position array never holds an out-of-range angle.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handoff::MotionSink;
use super::joints::{JOINT_COUNT, JointIndex, JointRange};

/// How `set_target` interprets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// Angle in degrees
    Absolute,
    /// Degrees added to the current commanded position
    Relative,
    /// Signed percentage of the joint's range width, applied relative
    PercentOfRange,
}

/// Convert a signed percentage of `range` into a delta in degrees
///
/// The magnitude is scaled against the range width and the sign is put back
/// afterwards, so -p% and +p% move the same distance in opposite directions.
pub fn percent_to_delta(range: &JointRange, percent: i32) -> i32 {
    let percent = percent.clamp(-100, 100);
    let magnitude = (percent.abs() as i64 * range.width() as i64 / 100) as i32;
    if percent < 0 { -magnitude } else { magnitude }
}

/// Owns the commanded position of every joint and forwards writes to a sink
#[derive(Debug)]
pub struct PositionCommander<S> {
    ranges: [JointRange; JOINT_COUNT],
    positions: [i32; JOINT_COUNT],
    sink: S,
    rng: ChaCha8Rng,
}

impl<S: MotionSink> PositionCommander<S> {
    /// Start from `start`, clamped into `ranges`, seeding the RNG from entropy
    pub fn new(ranges: [JointRange; JOINT_COUNT], start: [i32; JOINT_COUNT], sink: S) -> Self {
        Self::with_rng(ranges, start, sink, ChaCha8Rng::from_entropy())
    }

    /// Same as `new` with a reproducible random sequence
    pub fn with_seed(
        ranges: [JointRange; JOINT_COUNT],
        start: [i32; JOINT_COUNT],
        sink: S,
        seed: u64,
    ) -> Self {
        Self::with_rng(ranges, start, sink, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(
        ranges: [JointRange; JOINT_COUNT],
        start: [i32; JOINT_COUNT],
        sink: S,
        rng: ChaCha8Rng,
    ) -> Self {
        let mut positions = start;
        for (position, range) in positions.iter_mut().zip(ranges.iter()) {
            *position = range.clamp(*position);
        }
        Self {
            ranges,
            positions,
            sink,
            rng,
        }
    }

    /// Commanded position of every joint
    pub fn positions(&self) -> &[i32; JOINT_COUNT] {
        &self.positions
    }

    pub fn position(&self, joint: JointIndex) -> i32 {
        self.positions[joint.index()]
    }

    pub fn range(&self, joint: JointIndex) -> &JointRange {
        &self.ranges[joint.index()]
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Set one joint's target and start motion; returns the stored angle
    pub fn set_target(&mut self, joint: JointIndex, value: i32, mode: CommandMode) -> i32 {
        let target = self.resolve(joint, value, mode);
        self.store(joint, target);
        self.sink.begin_motion(&self.positions);
        self.position(joint)
    }

    /// Move one joint to a random angle in `[min, max)`; returns the stored angle
    pub fn random_target(&mut self, joint: JointIndex) -> i32 {
        let target = self.random_angle(joint);
        self.set_target(joint, target, CommandMode::Absolute)
    }

    /// Write several absolute targets and start motion once for all of them
    pub fn apply_batch(&mut self, targets: &[(JointIndex, i32)]) {
        if targets.is_empty() {
            return;
        }
        for &(joint, angle) in targets {
            self.store(joint, angle);
        }
        self.sink.begin_motion(&self.positions);
    }

    /// Draw a random angle for `joint` without storing it
    pub fn random_angle(&mut self, joint: JointIndex) -> i32 {
        let range = self.ranges[joint.index()];
        if range.min >= range.max {
            return range.min;
        }
        self.rng.gen_range(range.min..range.max)
    }

    /// Forward a speed change to the sink
    pub fn set_speed(&mut self, speed: u16) {
        self.sink.set_speed(speed);
    }

    fn resolve(&self, joint: JointIndex, value: i32, mode: CommandMode) -> i32 {
        let current = self.position(joint);
        match mode {
            CommandMode::Absolute => value,
            CommandMode::Relative => current.saturating_add(value),
            CommandMode::PercentOfRange => {
                current.saturating_add(percent_to_delta(self.range(joint), value))
            }
        }
    }

    fn store(&mut self, joint: JointIndex, angle: i32) {
        let range = self.ranges[joint.index()];
        let clamped = range.clamp(angle);
        if clamped != angle {
            debug!(
                "Clamped {} target {} into [{}, {}]",
                joint, angle, range.min, range.max
            );
        }
        self.positions[joint.index()] = clamped;
    }
}
