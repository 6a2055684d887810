// Loop rate, topics, servo link and robot configuration
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::motion::{
    BalanceConfig, JOINT_COUNT, JointIndex, JointRange, LegGeometry, LegSolution, LegSolver,
};
use crate::servo::Easing;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Zenoh topics
pub const TOPIC_CMD_LEG: &str = "biped/cmd/leg"; // foot target for both legs
pub const TOPIC_CMD_POSE: &str = "biped/cmd/pose"; // full 8-joint pose
pub const TOPIC_CMD_SERVO: &str = "biped/cmd/servo"; // single joint command
pub const TOPIC_CMD_SPEED: &str = "biped/cmd/speed"; // actuator speed
pub const TOPIC_CMD_RESET: &str = "biped/cmd/reset"; // back to the start pose
pub const TOPIC_SENSOR_TILT: &str = "biped/sensor/tilt"; // body pitch readings
pub const TOPIC_STATE_JOINTS: &str = "biped/state/joints"; // commanded positions
pub const TOPIC_HEALTH: &str = "biped/state/health"; // health status

// Servo board configuration
// Serial port for the servo controller board
pub const SERVO_PORT: &str = "/dev/ttyUSB0";

// Enable hardware servo control (set to false for simulation/testing)
pub const SERVO_ENABLED: bool = true;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid range for {joint}: min {min} > max {max}")]
    InvalidRange { joint: JointIndex, min: i32, max: i32 },

    #[error("Home angle {home} of {joint} outside [{min}, {max}]")]
    HomeOutOfRange {
        joint: JointIndex,
        home: i32,
        min: i32,
        max: i32,
    },

    #[error("Leg segment lengths must be finite and positive: {0:?}")]
    InvalidGeometry(LegGeometry),

    #[error("Invalid balance parameters: {0}")]
    InvalidBalance(String),
}

/// Range and neutral angle of one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub min: i32,
    pub max: i32,
    /// Start angle, and the zero of leg IK for leg joints
    pub home: i32,
}

impl JointConfig {
    pub const fn new(min: i32, max: i32, home: i32) -> Self {
        Self { min, max, home }
    }

    pub fn range(&self) -> JointRange {
        JointRange::new(self.min, self.max)
    }
}

/// Servo board link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub port: String,
    pub baudrate: u32,
    /// Degrees per second
    pub speed: u16,
    pub easing: Easing,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            port: SERVO_PORT.to_string(),
            baudrate: crate::servo::protocol::DEFAULT_BAUDRATE,
            speed: 60,
            easing: Easing::Cubic,
        }
    }
}

/// Everything loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Indexed by JointIndex
    pub joints: [JointConfig; JOINT_COUNT],
    pub leg: LegGeometry,
    pub balance: BalanceConfig,
    pub servo: ServoConfig,
    /// Fixed seed for random joint targets, entropy when absent
    pub random_seed: Option<u64>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            joints: [
                JointConfig::new(40, 140, 90),  // left hip
                JointConfig::new(10, 170, 90),  // left knee
                JointConfig::new(50, 130, 90),  // left ankle
                JointConfig::new(40, 140, 90),  // right hip
                JointConfig::new(10, 170, 90),  // right knee
                JointConfig::new(50, 130, 90),  // right ankle
                JointConfig::new(60, 120, 90),  // neck tilt
                JointConfig::new(20, 160, 90),  // neck pan
            ],
            leg: LegGeometry::new(5.0, 5.0, 2.0),
            balance: BalanceConfig::default(),
            servo: ServoConfig::default(),
            random_seed: None,
        }
    }
}

impl RobotConfig {
    /// Read a JSON config file; missing fields fall back to the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: RobotConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for joint in JointIndex::ALL {
            let cfg = &self.joints[joint.index()];
            if !cfg.range().is_valid() {
                return Err(ConfigError::InvalidRange {
                    joint,
                    min: cfg.min,
                    max: cfg.max,
                });
            }
            if !cfg.range().contains(cfg.home) {
                return Err(ConfigError::HomeOutOfRange {
                    joint,
                    home: cfg.home,
                    min: cfg.min,
                    max: cfg.max,
                });
            }
        }

        if !self.leg.is_valid() {
            return Err(ConfigError::InvalidGeometry(self.leg));
        }

        let b = &self.balance;
        if !(b.threshold.is_finite() && b.threshold >= 0.0) {
            return Err(ConfigError::InvalidBalance(format!(
                "threshold {} must be >= 0",
                b.threshold
            )));
        }
        if !(b.damping.is_finite() && b.damping > 0.0 && b.damping <= 1.0) {
            return Err(ConfigError::InvalidBalance(format!(
                "damping {} must be in (0, 1]",
                b.damping
            )));
        }
        if !b.starting_offset.is_finite() {
            return Err(ConfigError::InvalidBalance(
                "starting_offset must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ranges(&self) -> [JointRange; JOINT_COUNT] {
        self.joints.map(|j| j.range())
    }

    pub fn home_pose(&self) -> [i32; JOINT_COUNT] {
        self.joints.map(|j| j.home)
    }

    fn leg_home(&self, leg: [JointIndex; 3]) -> LegSolution {
        let [hip, knee, ankle] = leg.map(|j| self.joints[j.index()].home as f64);
        LegSolution::new(hip, knee, ankle)
    }

    /// Solver with the left leg as primary and the right leg mirrored
    pub fn leg_solver(&self) -> LegSolver {
        LegSolver::new(
            self.leg,
            self.leg_home(JointIndex::LEFT_LEG),
            self.leg_home(JointIndex::RIGHT_LEG),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RobotConfig::default();
        config.validate().unwrap();
        assert_eq!(config.home_pose(), [90; JOINT_COUNT]);
        assert_eq!(config.ranges()[JointIndex::NeckTilt.index()], JointRange::new(60, 120));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "leg": { "thigh": 6.0, "shin": 4.0, "foot": 1.5 }, "random_seed": 9 }"#;
        let config: RobotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.leg, LegGeometry::new(6.0, 4.0, 1.5));
        assert_eq!(config.random_seed, Some(9));
        assert_eq!(config.servo, ServoConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = RobotConfig::default();
        config.joints[JointIndex::LeftKnee.index()] = JointConfig::new(120, 60, 90);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { joint: JointIndex::LeftKnee, .. })
        ));
    }

    #[test]
    fn test_home_outside_range_rejected() {
        let mut config = RobotConfig::default();
        config.joints[JointIndex::NeckPan.index()].home = 10;
        assert!(matches!(config.validate(), Err(ConfigError::HomeOutOfRange { .. })));
    }

    #[test]
    fn test_bad_geometry_and_balance_rejected() {
        let mut config = RobotConfig::default();
        config.leg.shin = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGeometry(_))));

        let mut config = RobotConfig::default();
        config.balance.damping = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBalance(_))));
    }

    #[test]
    fn test_leg_solver_uses_leg_homes() {
        let mut config = RobotConfig::default();
        config.joints[JointIndex::RightKnee.index()].home = 100;
        let solver = config.leg_solver();
        let left = solver.solve_leg(crate::motion::FootTarget::new(0.0, -10.0), 0.0).unwrap();
        let right = solver.calculate_other_leg(&left);
        assert_eq!(left.to_command(), [90, 90, 90]);
        assert_eq!(right.to_command(), [90, 100, 90]);
    }
}
