// Planar leg inverse kinematics for the biped
// Converts a foot target (x, y) in the sagittal plane into hip/knee/ankle angles
// for the left leg, and mirrors that solution onto the right leg.
//
// Frame: origin at the hip joint, x forward, y up (a standing foot has y < 0).
// Raw angles are measured from the straight-down leg: hip positive = thigh swung
// forward, knee positive = shin folded back, ankle chosen so the foot stays level.

use serde::{Deserialize, Serialize};

use super::joints::JointIndex;

/// Tolerance on the reach check, absorbs sqrt rounding at the exact boundaries
const REACH_EPSILON: f64 = 1e-9;

/// Segment lengths shared by both legs (any consistent unit)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegGeometry {
    pub thigh: f64,
    pub shin: f64,
    pub foot: f64,
}

impl LegGeometry {
    pub const fn new(thigh: f64, shin: f64, foot: f64) -> Self {
        Self { thigh, shin, foot }
    }

    /// Hip-to-ankle distance with the knee straight
    pub fn max_reach(&self) -> f64 {
        self.thigh + self.shin
    }

    /// Hip-to-ankle distance with the knee fully folded
    pub fn min_reach(&self) -> f64 {
        (self.thigh - self.shin).abs()
    }

    pub fn is_valid(&self) -> bool {
        [self.thigh, self.shin, self.foot]
            .iter()
            .all(|l| l.is_finite() && *l > 0.0)
    }
}

/// Desired ankle position relative to the hip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootTarget {
    pub x: f64,
    pub y: f64,
}

impl FootTarget {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Hip, knee and ankle angles for one leg, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegSolution {
    pub hip: f64,
    pub knee: f64,
    pub ankle: f64,
}

impl LegSolution {
    pub const fn new(hip: f64, knee: f64, ankle: f64) -> Self {
        Self { hip, knee, ankle }
    }

    /// Integer joint commands [hip, knee, ankle], truncated toward zero
    pub fn to_command(&self) -> [i32; 3] {
        [self.hip as i32, self.knee as i32, self.ankle as i32]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum KinematicsError {
    #[error(
        "Foot target ({x}, {y}) unreachable: distance {distance:.3} outside [{min_reach:.3}, {max_reach:.3}]"
    )]
    Unreachable {
        x: f64,
        y: f64,
        distance: f64,
        min_reach: f64,
        max_reach: f64,
    },
}

/// Raw (home-relative) angles for an ankle target
///
/// Returns `Unreachable` when the target lies outside the annulus
/// `[|thigh - shin|, thigh + shin]` or is not finite; both boundaries are
/// reachable.
pub fn raw_leg_angles(
    geometry: &LegGeometry,
    target: FootTarget,
) -> Result<LegSolution, KinematicsError> {
    let l1 = geometry.thigh;
    let l2 = geometry.shin;
    let d = target.distance();

    // NaN fails every comparison, so non-finite targets are rejected up front
    if !d.is_finite()
        || d > geometry.max_reach() + REACH_EPSILON
        || d < geometry.min_reach() - REACH_EPSILON
    {
        return Err(KinematicsError::Unreachable {
            x: target.x,
            y: target.y,
            distance: d,
            min_reach: geometry.min_reach(),
            max_reach: geometry.max_reach(),
        });
    }

    // Law of cosines, interior angle at the knee
    let cos_knee = ((l1 * l1 + l2 * l2 - d * d) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
    let knee = 180.0 - cos_knee.acos().to_degrees();

    // Folded leg with equal segments puts the ankle on the hip, direction is free
    let hip = if d <= REACH_EPSILON {
        0.0
    } else {
        let direction = target.x.atan2(-target.y);
        let cos_thigh = ((l1 * l1 + d * d - l2 * l2) / (2.0 * l1 * d)).clamp(-1.0, 1.0);
        (direction + cos_thigh.acos()).to_degrees()
    };

    // Foot level: undo the shin's tilt from vertical
    let ankle = knee - hip;

    Ok(LegSolution::new(hip, knee, ankle))
}

/// Ankle and toe positions reached by raw angles (foot kept level)
pub fn forward_leg(geometry: &LegGeometry, raw: &LegSolution) -> (FootTarget, FootTarget) {
    let thigh = raw.hip.to_radians();
    let shin = (raw.hip - raw.knee).to_radians();

    let ankle = FootTarget::new(
        geometry.thigh * thigh.sin() + geometry.shin * shin.sin(),
        -geometry.thigh * thigh.cos() - geometry.shin * shin.cos(),
    );
    let toe = FootTarget::new(ankle.x + geometry.foot, ankle.y);
    (ankle, toe)
}

/// IK solver for the left leg plus the mirror transform onto the right leg
#[derive(Debug, Clone)]
pub struct LegSolver {
    geometry: LegGeometry,
    primary_home: LegSolution,
    other_home: LegSolution,
}

impl LegSolver {
    /// `primary_home` / `other_home` are the command-space angles of the neutral
    /// (straight-down) pose for the left and right leg respectively
    pub fn new(geometry: LegGeometry, primary_home: LegSolution, other_home: LegSolution) -> Self {
        Self {
            geometry,
            primary_home,
            other_home,
        }
    }

    pub fn geometry(&self) -> &LegGeometry {
        &self.geometry
    }

    /// Solve the primary leg in command space
    ///
    /// `hip_adjustment` is the accumulated balance bias; it is subtracted from
    /// the hip so a positive tilt correction leans the primary hip forward.
    pub fn solve_leg(
        &self,
        target: FootTarget,
        hip_adjustment: f64,
    ) -> Result<LegSolution, KinematicsError> {
        let raw = raw_leg_angles(&self.geometry, target)?;
        Ok(LegSolution::new(
            self.primary_home.hip + raw.hip - hip_adjustment,
            self.primary_home.knee + raw.knee,
            self.primary_home.ankle + raw.ankle,
        ))
    }

    /// Mirror a primary-leg solution onto the other leg
    ///
    /// The servos of the two legs are mounted facing each other, so each joint's
    /// offset from home is reflected: `other = other_home - (primary - primary_home)`.
    pub fn calculate_other_leg(&self, primary: &LegSolution) -> LegSolution {
        LegSolution::new(
            self.other_home.hip - (primary.hip - self.primary_home.hip),
            self.other_home.knee - (primary.knee - self.primary_home.knee),
            self.other_home.ankle - (primary.ankle - self.primary_home.ankle),
        )
    }

    /// Solve both legs and pair each angle with its joint
    pub fn solve_both(
        &self,
        target: FootTarget,
        hip_adjustment: f64,
    ) -> Result<[(JointIndex, i32); 6], KinematicsError> {
        let left = self.solve_leg(target, hip_adjustment)?;
        let right = self.calculate_other_leg(&left);

        let [lh, lk, la] = left.to_command();
        let [rh, rk, ra] = right.to_command();
        Ok([
            (JointIndex::LeftHip, lh),
            (JointIndex::LeftKnee, lk),
            (JointIndex::LeftAnkle, la),
            (JointIndex::RightHip, rh),
            (JointIndex::RightKnee, rk),
            (JointIndex::RightAnkle, ra),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn geometry() -> LegGeometry {
        LegGeometry::new(5.0, 5.0, 2.0)
    }

    fn solver() -> LegSolver {
        LegSolver::new(
            geometry(),
            LegSolution::new(90.0, 90.0, 90.0),
            LegSolution::new(90.0, 90.0, 90.0),
        )
    }

    #[test]
    fn test_fully_extended_leg() {
        let raw = raw_leg_angles(&geometry(), FootTarget::new(0.0, -10.0)).unwrap();
        assert!(raw.hip.abs() < EPS);
        assert!(raw.knee.abs() < EPS);
        assert!(raw.ankle.abs() < EPS);

        // Command space is the home pose
        let solution = solver().solve_leg(FootTarget::new(0.0, -10.0), 0.0).unwrap();
        assert_eq!(solution.to_command(), [90, 90, 90]);
    }

    #[test]
    fn test_beyond_reach_is_rejected() {
        let err = raw_leg_angles(&geometry(), FootTarget::new(0.0, -11.0)).unwrap_err();
        match err {
            KinematicsError::Unreachable { distance, max_reach, .. } => {
                assert!((distance - 11.0).abs() < EPS);
                assert!((max_reach - 10.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_non_finite_target_is_rejected() {
        for (x, y) in [
            (f64::NAN, -8.0),
            (0.0, f64::NAN),
            (f64::INFINITY, -8.0),
            (0.0, f64::NEG_INFINITY),
        ] {
            assert!(
                raw_leg_angles(&geometry(), FootTarget::new(x, y)).is_err(),
                "({}, {}) accepted",
                x,
                y
            );
        }
    }

    #[test]
    fn test_fully_folded_leg() {
        // Equal segments fold onto the hip
        let raw = raw_leg_angles(&geometry(), FootTarget::new(0.0, 0.0)).unwrap();
        assert!((raw.knee - 180.0).abs() < EPS);
        assert!(raw.hip.abs() < EPS);

        // Unequal segments fold to |thigh - shin|
        let uneven = LegGeometry::new(6.0, 4.0, 2.0);
        let raw = raw_leg_angles(&uneven, FootTarget::new(0.0, -2.0)).unwrap();
        assert!((raw.knee - 180.0).abs() < EPS);
        assert!(raw.hip.abs() < EPS);

        // Inside the inner radius there is no solution
        assert!(raw_leg_angles(&uneven, FootTarget::new(0.0, -1.5)).is_err());
    }

    #[test]
    fn test_boundary_on_diagonal() {
        let d = 10.0 / 2f64.sqrt();
        assert!(raw_leg_angles(&geometry(), FootTarget::new(d, -d)).is_ok());
        assert!(raw_leg_angles(&geometry(), FootTarget::new(d + 0.01, -d)).is_err());
    }

    #[test]
    fn test_right_angle_knee() {
        // Ankle at thigh*sqrt(2) straight below: knee bends 90, hip swings 45
        let y = -(50f64.sqrt());
        let raw = raw_leg_angles(&geometry(), FootTarget::new(0.0, y)).unwrap();
        assert!((raw.knee - 90.0).abs() < EPS);
        assert!((raw.hip - 45.0).abs() < EPS);
        assert!((raw.ankle - 45.0).abs() < EPS);
    }

    #[test]
    fn test_forward_kinematics_reaches_target() {
        let geometry = geometry();
        for &(x, y) in &[(1.0, -8.0), (-2.5, -7.0), (3.0, -4.0), (0.5, -9.9)] {
            let raw = raw_leg_angles(&geometry, FootTarget::new(x, y)).unwrap();
            let (ankle, toe) = forward_leg(&geometry, &raw);
            assert!((ankle.x - x).abs() < 1e-6, "x mismatch for ({}, {})", x, y);
            assert!((ankle.y - y).abs() < 1e-6, "y mismatch for ({}, {})", x, y);
            // Level foot: toe is straight ahead of the ankle
            assert!((toe.y - ankle.y).abs() < 1e-9);
            assert!((toe.x - ankle.x - geometry.foot).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mirror_reflects_about_home() {
        let solver = LegSolver::new(
            geometry(),
            LegSolution::new(90.0, 40.0, 100.0),
            LegSolution::new(85.0, 140.0, 80.0),
        );
        let samples = [
            LegSolution::new(90.0, 40.0, 100.0),
            LegSolution::new(120.5, 75.0, 85.0),
            LegSolution::new(60.0, 10.0, 130.25),
        ];
        for sample in &samples {
            let other = solver.calculate_other_leg(sample);
            assert_eq!(other, solver.calculate_other_leg(sample));
            assert!(((other.hip - 85.0) + (sample.hip - 90.0)).abs() < EPS);
            assert!(((other.knee - 140.0) + (sample.knee - 40.0)).abs() < EPS);
            assert!(((other.ankle - 80.0) + (sample.ankle - 100.0)).abs() < EPS);
        }
    }

    #[test]
    fn test_hip_adjustment_biases_both_hips() {
        let solver = solver();
        let target = FootTarget::new(1.0, -9.0);
        let plain = solver.solve_leg(target, 0.0).unwrap();
        let biased = solver.solve_leg(target, -5.0).unwrap();
        assert!((biased.hip - plain.hip - 5.0).abs() < EPS);
        assert_eq!(biased.knee, plain.knee);

        let plain_other = solver.calculate_other_leg(&plain);
        let biased_other = solver.calculate_other_leg(&biased);
        assert!((biased_other.hip - plain_other.hip + 5.0).abs() < EPS);
    }

    #[test]
    fn test_command_truncates() {
        let solution = LegSolution::new(89.9, -12.7, 45.5);
        assert_eq!(solution.to_command(), [89, -12, 45]);
    }

    #[test]
    fn test_solve_both_orders_joints() {
        let joints = solver().solve_both(FootTarget::new(0.0, -10.0), 0.0).unwrap();
        let order: Vec<JointIndex> = joints.iter().map(|(j, _)| *j).collect();
        assert_eq!(order, JointIndex::LEFT_LEG.iter().chain(&JointIndex::RIGHT_LEG).copied().collect::<Vec<_>>());
        assert!(joints.iter().all(|(_, angle)| *angle == 90));
    }

    #[test]
    fn test_geometry_validation() {
        assert!(geometry().is_valid());
        assert!(!LegGeometry::new(0.0, 5.0, 2.0).is_valid());
        assert!(!LegGeometry::new(5.0, f64::NAN, 2.0).is_valid());
    }
}
