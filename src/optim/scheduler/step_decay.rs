//! Epoch-indexed multiplicative decay schedules

use crate::optim::optimizer::Optimizer;

/// Shared bookkeeping for schedules that are a closed-form function of the
/// epoch index and each group's initial learning rate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EpochCounter {
    pub(crate) base_lrs: Vec<f64>,
    pub(crate) last_epoch: usize,
}

impl EpochCounter {
    pub(crate) fn new(optimizer: &dyn Optimizer) -> EpochCounter {
        EpochCounter {
            base_lrs: optimizer.learning_rates(),
            last_epoch: 0,
        }
    }

    /// Moves to the next epoch and writes `f(base_lr, epoch)` into each group.
    pub(crate) fn advance<F>(&mut self, optimizer: &mut dyn Optimizer, f: F)
    where
        F: Fn(f64, usize) -> f64,
    {
        self.last_epoch += 1;
        for (group, &base) in self.base_lrs.iter().enumerate() {
            optimizer.set_learning_rate(group, f(base, self.last_epoch));
        }
    }
}

/// Decays by `gamma` every `step_size` epochs.
#[derive(Debug, Clone, PartialEq)]
pub struct StepLR {
    step_size: usize,
    gamma: f64,
    counter: EpochCounter,
}

impl StepLR {
    pub(crate) fn new(optimizer: &dyn Optimizer, step_size: usize, gamma: f64) -> StepLR {
        StepLR { step_size, gamma, counter: EpochCounter::new(optimizer) }
    }

    pub fn advance(&mut self, optimizer: &mut dyn Optimizer) {
        let (step_size, gamma) = (self.step_size, self.gamma);
        self.counter
            .advance(optimizer, |base, epoch| base * gamma.powi((epoch / step_size) as i32));
    }
}

/// Decays by `gamma` once each listed milestone epoch is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStepLR {
    milestones: Vec<usize>,
    gamma: f64,
    counter: EpochCounter,
}

impl MultiStepLR {
    pub(crate) fn new(optimizer: &dyn Optimizer, mut milestones: Vec<usize>, gamma: f64) -> MultiStepLR {
        milestones.sort_unstable();
        MultiStepLR { milestones, gamma, counter: EpochCounter::new(optimizer) }
    }

    pub fn advance(&mut self, optimizer: &mut dyn Optimizer) {
        let gamma = self.gamma;
        let milestones = &self.milestones;
        self.counter.advance(optimizer, |base, epoch| {
            let passed = milestones.partition_point(|&m| m <= epoch);
            base * gamma.powi(passed as i32)
        });
    }
}

/// Decays by `gamma` every epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialLR {
    gamma: f64,
    counter: EpochCounter,
}

impl ExponentialLR {
    pub(crate) fn new(optimizer: &dyn Optimizer, gamma: f64) -> ExponentialLR {
        ExponentialLR { gamma, counter: EpochCounter::new(optimizer) }
    }

    pub fn advance(&mut self, optimizer: &mut dyn Optimizer) {
        let gamma = self.gamma;
        self.counter
            .advance(optimizer, |base, epoch| base * gamma.powi(epoch as i32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;
    use approx::assert_relative_eq;

    #[test]
    fn step_lr_decays_on_step_boundaries() {
        let mut opt = Sgd::new(1.0);
        let mut sched = StepLR::new(&opt, 2, 0.5);
        let mut lrs = Vec::new();
        for _ in 0..5 {
            sched.advance(&mut opt);
            lrs.push(opt.learning_rate());
        }
        assert_eq!(lrs, vec![1.0, 0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn multi_step_counts_passed_milestones() {
        let mut opt = Sgd::new(1.0);
        let mut sched = MultiStepLR::new(&opt, vec![3, 1], 0.1);
        let mut lrs = Vec::new();
        for _ in 0..4 {
            sched.advance(&mut opt);
            lrs.push(opt.learning_rate());
        }
        assert_relative_eq!(lrs[0], 0.1, max_relative = 1e-12);
        assert_relative_eq!(lrs[1], 0.1, max_relative = 1e-12);
        assert_relative_eq!(lrs[2], 0.01, max_relative = 1e-12);
        assert_relative_eq!(lrs[3], 0.01, max_relative = 1e-12);
    }

    #[test]
    fn exponential_decays_every_epoch() {
        let mut opt = Sgd::new(2.0);
        let mut sched = ExponentialLR::new(&opt, 0.5);
        sched.advance(&mut opt);
        sched.advance(&mut opt);
        assert_relative_eq!(opt.learning_rate(), 0.5, max_relative = 1e-12);
    }
}
