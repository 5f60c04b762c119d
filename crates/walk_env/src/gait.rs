//! Periodic gait-phase clock.
//!
//! One scalar phase per environment advances at the stride frequency. Each
//! foot reads it with its own offset, remapped so that stance occupies
//! `[0, 0.5)` and swing `[0.5, 1)` regardless of the stance duration.

use std::f32::consts::TAU;

use crate::config::GaitConfig;
use crate::math::normal_cdf;
use crate::NUM_LEGS;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FootPhases {
    /// Remapped per-foot phase in `[0, 1)`.
    pub foot_indices: [f32; NUM_LEGS],
    /// `sin(2 pi phase)` per foot.
    pub clock_inputs: [f32; NUM_LEGS],
    /// Smoothed desired contact in `[0, 1]`, 1 during stance.
    pub desired_contact: [f32; NUM_LEGS],
}

#[derive(Clone, Debug)]
pub struct GaitClock {
    frequency: f32,
    offsets: [f32; NUM_LEGS],
    duration: f32,
    kappa: f32,
}

impl GaitClock {
    #[must_use]
    pub fn new(config: &GaitConfig) -> Self {
        Self {
            frequency: config.frequency,
            offsets: config.offsets,
            duration: config.duration,
            kappa: config.kappa,
        }
    }

    /// Advances a gait index by one control step.
    #[must_use]
    pub fn advance(&self, gait_index: f32, dt: f32) -> f32 {
        (gait_index + dt * self.frequency).rem_euclid(1.0)
    }

    #[must_use]
    pub fn phases(&self, gait_index: f32) -> FootPhases {
        let mut out = FootPhases::default();
        for foot in 0..NUM_LEGS {
            let raw = (gait_index + self.offsets[foot]).rem_euclid(1.0);
            let idx = if raw < self.duration {
                raw * (0.5 / self.duration)
            } else {
                0.5 + (raw - self.duration) * (0.5 / (1.0 - self.duration))
            };
            out.foot_indices[foot] = idx;
            out.clock_inputs[foot] = (TAU * idx).sin();
            out.desired_contact[foot] = self.smoothed_contact(idx);
        }
        out
    }

    fn smoothed_contact(&self, idx: f32) -> f32 {
        let cdf = |x: f32| normal_cdf(x / self.kappa);
        let x = idx.rem_euclid(1.0);
        cdf(x) * (1.0 - cdf(x - 0.5)) + cdf(x - 1.0) * (1.0 - cdf(x - 1.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> GaitClock {
        GaitClock::new(&GaitConfig::default())
    }

    #[test]
    fn advance_wraps() {
        let g = clock().advance(0.99, 0.02);
        assert!((g - 0.03).abs() < 1e-5, "g={g}");
    }

    #[test]
    fn offsets_put_diagonal_feet_in_antiphase() {
        let p = clock().phases(0.25);
        assert!((p.foot_indices[0] - 0.25).abs() < 1e-6);
        assert!((p.foot_indices[1] - 0.75).abs() < 1e-6);
        assert!(p.desired_contact[0] > 0.99);
        assert!(p.desired_contact[1] < 0.01);
        assert!((p.clock_inputs[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stance_duration_remap() {
        let c = GaitClock::new(&GaitConfig { duration: 0.25, ..GaitConfig::default() });
        // end of stance maps to 0.5
        let p = c.phases(0.25 - 1e-6);
        assert!((p.foot_indices[0] - 0.5).abs() < 1e-4);
        let p = c.phases(0.625);
        assert!((p.foot_indices[0] - 0.75).abs() < 1e-5);
    }
}
