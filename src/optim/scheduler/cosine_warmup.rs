//! Inverse-square-root warmup followed by periodic cosine restarts

use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::layers::parameter::Parameter;
use crate::optim::optimizer::Optimizer;

/// Per-optimizer-step learning-rate policy.
///
/// For step `s` (1-based), warmup length `w`, and model width `d`:
///
/// - `s <= w`: `d^-0.5 * min(s^-0.5, s * w^-1.5)`, the Transformer warmup.
/// - `s > w`: `d^-0.5 * w^-0.5 * (1 + cos(pi * ((s - w) mod w) / w)) / 2`,
///   a cosine decay from the warmup peak that restarts every `w` steps.
///
/// The learning rate written into the optimizer is `lr_mul * scale`. The step
/// counter advances exactly once per `step_and_update_lr`.
#[derive(Debug, Clone, PartialEq)]
pub struct CosineWarmupScheduler {
    lr_mul: f64,
    d_model: usize,
    n_warmup_steps: usize,
    n_periodic_steps: usize,
    n_steps: usize,
}

impl CosineWarmupScheduler {
    pub fn new(d_model: usize, n_warmup_steps: usize, lr_mul: f64) -> Result<CosineWarmupScheduler> {
        if d_model == 0 {
            return Err(Error::Config("cosine warmup needs d_model > 0".into()));
        }
        if n_warmup_steps == 0 {
            return Err(Error::Config("cosine warmup needs n_warmup_steps > 0".into()));
        }
        Ok(CosineWarmupScheduler {
            lr_mul,
            d_model,
            n_warmup_steps,
            n_periodic_steps: n_warmup_steps,
            n_steps: 0,
        })
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Advances the step counter, writes the new learning rate into every
    /// param group, then applies the optimizer update.
    pub fn step_and_update_lr(&mut self, optimizer: &mut dyn Optimizer, params: &mut [&mut Parameter]) {
        self.update_lr(optimizer);
        optimizer.step(params);
    }

    pub fn zero_grad(&self, optimizer: &dyn Optimizer, params: &mut [&mut Parameter]) {
        optimizer.zero_grad(params);
    }

    /// Scale multiplier at step `s`; `s` must be at least 1.
    pub fn lr_scale(&self, s: usize) -> f64 {
        let d = (self.d_model as f64).powf(-0.5);
        let w = self.n_warmup_steps as f64;
        if s <= self.n_warmup_steps {
            let s = s as f64;
            d * s.powf(-0.5).min(s * w.powf(-1.5))
        } else {
            let phase = ((s - self.n_warmup_steps) % self.n_periodic_steps) as f64
                / self.n_periodic_steps as f64;
            d * w.powf(-0.5) * (1.0 + (PI * phase).cos()) / 2.0
        }
    }

    /// Learning rate the optimizer holds after the most recent update.
    pub fn current_lr(&self) -> f64 {
        if self.n_steps == 0 {
            0.0
        } else {
            self.lr_mul * self.lr_scale(self.n_steps)
        }
    }

    fn update_lr(&mut self, optimizer: &mut dyn Optimizer) {
        self.n_steps += 1;
        let lr = self.lr_mul * self.lr_scale(self.n_steps);
        optimizer.set_all_learning_rates(lr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use crate::optim::sgd::Sgd;
    use approx::assert_relative_eq;

    #[test]
    fn warmup_follows_inverse_square_root_formula() {
        let sched = CosineWarmupScheduler::new(64, 100, 1.0).unwrap();
        for s in 1..=100usize {
            let expected = 64f64.powf(-0.5) * (s as f64).powf(-0.5).min(s as f64 * 100f64.powf(-1.5));
            let got = sched.lr_scale(s);
            assert!(got >= 0.0);
            assert_relative_eq!(got, expected, max_relative = 1e-12);
        }
        // Ramp is increasing during warmup.
        assert!(sched.lr_scale(10) < sched.lr_scale(50));
    }

    #[test]
    fn branches_agree_at_the_warmup_boundary() {
        let sched = CosineWarmupScheduler::new(32, 40, 1.0).unwrap();
        let warmup_end = sched.lr_scale(40);
        let cosine_start = 32f64.powf(-0.5) * 40f64.powf(-0.5) * (1.0 + 0.0f64.cos()) / 2.0;
        assert_relative_eq!(warmup_end, cosine_start, max_relative = 1e-12);
        // One step past the boundary the cosine branch sits just below the peak.
        assert!(sched.lr_scale(41) < warmup_end);
        assert_relative_eq!(sched.lr_scale(41), warmup_end, max_relative = 1e-2);
    }

    #[test]
    fn schedule_is_periodic_after_warmup() {
        let sched = CosineWarmupScheduler::new(16, 25, 2.0).unwrap();
        for s in 26..200usize {
            assert_relative_eq!(sched.lr_scale(s), sched.lr_scale(s + 25), max_relative = 1e-12);
        }
    }

    #[test]
    fn each_update_advances_once_and_writes_every_group() {
        use crate::optim::optimizer::ParamGroup;
        let mut sched = CosineWarmupScheduler::new(4, 10, 0.5).unwrap();
        let mut opt = Sgd::with_groups(
            vec![ParamGroup { lr: 1.0, weight_decay: 0.0 }, ParamGroup { lr: 1.0, weight_decay: 0.0 }],
            0.0,
        );
        let mut p = Parameter::new("w", Matrix::row_vector(vec![0.0]));

        assert_eq!(sched.n_steps(), 0);
        sched.step_and_update_lr(&mut opt, &mut [&mut p]);
        assert_eq!(sched.n_steps(), 1);

        let expected = 0.5 * 4f64.powf(-0.5) * 10f64.powf(-1.5);
        for lr in opt.learning_rates() {
            assert_relative_eq!(lr, expected, max_relative = 1e-12);
        }
        assert_relative_eq!(sched.current_lr(), expected, max_relative = 1e-12);
    }

    #[test]
    fn zero_warmup_is_rejected() {
        assert!(matches!(CosineWarmupScheduler::new(8, 0, 1.0), Err(Error::Config(_))));
    }
}
