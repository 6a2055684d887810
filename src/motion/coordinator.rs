// Whole-body motion: leg moves from a foot target, batch poses, balance and speed

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::balance::{BalanceCorrector, HipCorrection};
use super::command::{CommandMode, PositionCommander};
use super::handoff::MotionSink;
use super::joints::{JOINT_COUNT, JointIndex};
use super::kinematics::{FootTarget, KinematicsError, LegSolver};

/// What to do with one joint in a batch move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointTarget {
    /// Leave the commanded position unchanged
    Keep,
    /// Pick a random angle inside the joint's range
    Randomize,
    /// Move to this absolute angle (clamped)
    SetTo(i32),
}

impl JointTarget {
    /// Sentinel used by pose tables to request a random position
    pub const RANDOM_SENTINEL: i32 = -1;

    /// Decode the compact pose-table form: no value keeps, -1 randomizes
    pub fn from_encoded(value: Option<i32>) -> Self {
        match value {
            None => JointTarget::Keep,
            Some(Self::RANDOM_SENTINEL) => JointTarget::Randomize,
            Some(angle) => JointTarget::SetTo(angle),
        }
    }

    pub fn to_encoded(self) -> Option<i32> {
        match self {
            JointTarget::Keep => None,
            JointTarget::Randomize => Some(Self::RANDOM_SENTINEL),
            JointTarget::SetTo(angle) => Some(angle),
        }
    }
}

/// Decode a full pose-table row
pub fn decode_pose(row: &[Option<i32>; JOINT_COUNT]) -> [JointTarget; JOINT_COUNT] {
    (*row).map(JointTarget::from_encoded)
}

/// Owns the solver, balance state and position commands for the whole robot
#[derive(Debug)]
pub struct MotionCoordinator<S> {
    solver: LegSolver,
    balance: BalanceCorrector,
    commander: PositionCommander<S>,
    current_foot: Option<FootTarget>,
    speed: u16,
}

impl<S: MotionSink> MotionCoordinator<S> {
    pub fn new(
        solver: LegSolver,
        balance: BalanceCorrector,
        commander: PositionCommander<S>,
        speed: u16,
    ) -> Self {
        Self {
            solver,
            balance,
            commander,
            current_foot: None,
            speed,
        }
    }

    pub fn positions(&self) -> &[i32; JOINT_COUNT] {
        self.commander.positions()
    }

    pub fn hip_adjustment(&self) -> f64 {
        self.balance.hip_adjustment()
    }

    /// Last foot target that was applied to the legs
    pub fn current_foot(&self) -> Option<FootTarget> {
        self.current_foot
    }

    pub fn commander(&self) -> &PositionCommander<S> {
        &self.commander
    }

    /// Solve both legs for (x, y) and command all six leg joints at once
    ///
    /// An unreachable target leaves every joint untouched.
    pub fn move_leg(&mut self, x: f64, y: f64) -> Result<(), KinematicsError> {
        let target = FootTarget::new(x, y);
        let joints = self
            .solver
            .solve_both(target, self.balance.hip_adjustment())?;

        debug!("Leg move to ({}, {}): {:?}", x, y, joints);
        self.commander.apply_batch(&joints);
        self.current_foot = Some(target);
        Ok(())
    }

    /// `move_leg`, then return the full commanded pose
    pub fn move_leg_and_store(
        &mut self,
        x: f64,
        y: f64,
    ) -> Result<[i32; JOINT_COUNT], KinematicsError> {
        self.move_leg(x, y)?;
        Ok(*self.positions())
    }

    /// Apply one entry per joint, in joint order
    pub fn move_all(&mut self, targets: &[JointTarget; JOINT_COUNT]) {
        for (joint, target) in JointIndex::ALL.iter().zip(targets.iter()) {
            match *target {
                JointTarget::Keep => {}
                JointTarget::Randomize => {
                    self.commander.random_target(*joint);
                }
                JointTarget::SetTo(angle) => {
                    self.commander.set_target(*joint, angle, CommandMode::Absolute);
                }
            }
        }
    }

    /// Single joint command
    pub fn set_target(&mut self, joint: JointIndex, value: i32, mode: CommandMode) -> i32 {
        self.commander.set_target(joint, value, mode)
    }

    pub fn random_target(&mut self, joint: JointIndex) -> i32 {
        self.commander.random_target(joint)
    }

    /// Feed a pitch reading to the balance corrector and nudge the hips
    pub fn correct_tilt(&mut self, pitch: f64) -> Option<HipCorrection> {
        let correction = self.balance.correct_tilt(pitch)?;
        self.commander.set_target(
            JointIndex::LeftHip,
            correction.left as i32,
            CommandMode::Relative,
        );
        self.commander.set_target(
            JointIndex::RightHip,
            correction.right as i32,
            CommandMode::Relative,
        );
        Some(correction)
    }

    /// Return every joint to `start` in one motion and clear the balance bias
    pub fn reset(&mut self, start: &[i32; JOINT_COUNT]) {
        info!("Resetting to start pose");
        self.balance.reset();
        self.current_foot = None;
        let joints: Vec<(JointIndex, i32)> = JointIndex::ALL
            .iter()
            .map(|joint| (*joint, start[joint.index()]))
            .collect();
        self.commander.apply_batch(&joints);
    }

    pub fn set_speed(&mut self, speed: u16) {
        info!("Speed set: {}", speed);
        self.speed = speed;
        self.commander.set_speed(speed);
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }
}
