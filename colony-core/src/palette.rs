//! Step-to-color mapping used when a cell reaches a lifetime step.
//!
//! Noise and color science are outside the engine; it only needs
//! "given a step index, return a display value". [`LogisticPalette`] is the
//! default, shaping the step through a logistic population curve.

use crate::types::Rgba;

/// Maps a lifetime step to a display color.
pub trait StepPalette: Send {
    fn color(&self, step: usize, lifetime: usize) -> Rgba;
}

/// Logistic growth curve `N(t) = 1 / ((1/N0 - 1/K) * e^(-r t) + 1/K)`,
/// normalized by `K` and used to blend from `dim` to `bright`.
///
/// The step is rescaled so that the last lifetime step lands at `t = K`,
/// which makes the curve independent of the configured lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogisticPalette {
    pub rate: f32,
    pub initial: f32,
    pub capacity: f32,
    pub dim: Rgba,
    pub bright: Rgba,
}

impl Default for LogisticPalette {
    fn default() -> Self {
        Self {
            rate: 0.1,
            initial: 1.0,
            capacity: 255.0,
            dim: [32, 64, 48, 255],
            bright: [196, 240, 140, 255],
        }
    }
}

impl LogisticPalette {
    /// Population fraction `N(t) / K` in `(0, 1]`.
    pub fn level(&self, step: usize, lifetime: usize) -> f32 {
        let span = lifetime.saturating_sub(1).max(1) as f32;
        let t = step as f32 / span * self.capacity;
        let k_inv = 1.0 / self.capacity;
        let n = 1.0 / ((1.0 / self.initial - k_inv) * (-self.rate * t).exp() + k_inv);
        (n / self.capacity).clamp(0.0, 1.0)
    }
}

impl StepPalette for LogisticPalette {
    fn color(&self, step: usize, lifetime: usize) -> Rgba {
        let s = self.level(step, lifetime);
        let mut out = [0u8; 4];
        for (i, c) in out.iter_mut().enumerate() {
            let a = self.dim[i] as f32;
            let b = self.bright[i] as f32;
            *c = (a + (b - a) * s).round() as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_rises_monotonically_to_capacity() {
        let p = LogisticPalette::default();
        let lifetime = 24;
        let mut prev = 0.0;
        for step in 0..lifetime {
            let l = p.level(step, lifetime);
            assert!(l >= prev, "step {step}: {l} < {prev}");
            prev = l;
        }
        assert!((p.level(0, lifetime) - 1.0 / 255.0).abs() < 1e-4);
        assert!(p.level(lifetime - 1, lifetime) > 0.99);
    }

    fn close(a: Rgba, b: Rgba) -> bool {
        a.iter().zip(b).all(|(&x, y)| x.abs_diff(y) <= 1)
    }

    #[test]
    fn color_blends_between_endpoints() {
        let p = LogisticPalette::default();
        assert!(close(p.color(0, 16), p.dim));
        assert_eq!(p.color(15, 16), p.bright);
    }

    #[test]
    fn single_step_lifetime_does_not_divide_by_zero() {
        let p = LogisticPalette::default();
        assert!(close(p.color(0, 1), p.dim));
    }
}
