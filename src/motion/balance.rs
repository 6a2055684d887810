// Hip balance correction from body pitch
//
// A pitch reading outside the dead-band around the neutral offset becomes a
// symmetric hip correction. The correction is also accumulated into the hip
// adjustment that biases every later leg solve.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Balance tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Pitch (degrees) the sensor reports when the body is upright
    pub starting_offset: f64,
    /// Half-width of the dead-band around `starting_offset`
    pub threshold: f64,
    /// Scale applied to readings whose magnitude exceeds `threshold`
    pub damping: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            starting_offset: 3.5,
            threshold: 5.0,
            damping: 0.5,
        }
    }
}

/// Opposite-signed relative moves for the two hips, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HipCorrection {
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone)]
pub struct BalanceCorrector {
    config: BalanceConfig,
    hip_adjustment: f64,
}

impl BalanceCorrector {
    pub fn new(config: BalanceConfig) -> Self {
        Self {
            config,
            hip_adjustment: 0.0,
        }
    }

    /// Accumulated hip bias, in degrees
    pub fn hip_adjustment(&self) -> f64 {
        self.hip_adjustment
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// True when `pitch` sits inside the dead-band (boundaries included)
    pub fn in_dead_band(&self, pitch: f64) -> bool {
        let low = self.config.starting_offset - self.config.threshold;
        let high = self.config.starting_offset + self.config.threshold;
        (low..=high).contains(&pitch)
    }

    /// Process a pitch reading
    ///
    /// Returns `None` inside the dead-band (no state change). Otherwise the
    /// correction is subtracted from the hip adjustment and returned as a
    /// `+correction` / `-correction` pair for the left and right hip.
    pub fn correct_tilt(&mut self, pitch: f64) -> Option<HipCorrection> {
        if !pitch.is_finite() || self.in_dead_band(pitch) {
            return None;
        }

        let mut correction = pitch;
        if pitch.abs() > self.config.threshold {
            correction *= self.config.damping;
        }

        self.hip_adjustment -= correction;
        debug!(
            "Tilt {:.2} -> hip correction {:.2} (adjustment now {:.2})",
            pitch, correction, self.hip_adjustment
        );

        Some(HipCorrection {
            left: correction,
            right: -correction,
        })
    }

    /// Forget the accumulated hip bias
    pub fn reset(&mut self) {
        self.hip_adjustment = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> BalanceCorrector {
        BalanceCorrector::new(BalanceConfig::default())
    }

    #[test]
    fn test_dead_band_is_idempotent() {
        let mut balance = corrector();
        for _ in 0..100 {
            for pitch in [-1.5, 0.0, 3.5, 7.9, 8.5] {
                assert_eq!(balance.correct_tilt(pitch), None);
            }
        }
        assert_eq!(balance.hip_adjustment(), 0.0);
    }

    #[test]
    fn test_boundaries_do_not_trigger() {
        let mut balance = corrector();
        assert_eq!(balance.correct_tilt(8.5), None);
        assert_eq!(balance.correct_tilt(-1.5), None);
        assert!(balance.correct_tilt(8.5 + 1e-9).is_some());
    }

    #[test]
    fn test_large_tilt_is_damped() {
        let mut balance = corrector();
        let correction = balance.correct_tilt(10.0).unwrap();
        assert_eq!(correction.left, 5.0);
        assert_eq!(correction.right, -5.0);
        assert_eq!(balance.hip_adjustment(), -5.0);
    }

    #[test]
    fn test_small_magnitude_outside_band_is_raw() {
        // Offset pushes the band to [-1.5, 8.5]; -3 is outside but |-3| < threshold
        let mut balance = corrector();
        let correction = balance.correct_tilt(-3.0).unwrap();
        assert_eq!(correction.left, -3.0);
        assert_eq!(correction.right, 3.0);
        assert_eq!(balance.hip_adjustment(), 3.0);
    }

    #[test]
    fn test_adjustment_accumulates_and_resets() {
        let mut balance = corrector();
        balance.correct_tilt(10.0);
        balance.correct_tilt(12.0);
        assert_eq!(balance.hip_adjustment(), -11.0);
        balance.reset();
        assert_eq!(balance.hip_adjustment(), 0.0);
    }

    #[test]
    fn test_non_finite_pitch_ignored() {
        let mut balance = corrector();
        assert_eq!(balance.correct_tilt(f64::NAN), None);
        assert_eq!(balance.correct_tilt(f64::INFINITY), None);
        assert_eq!(balance.hip_adjustment(), 0.0);
    }
}
