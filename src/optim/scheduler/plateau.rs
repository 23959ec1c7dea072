use log::info;

use crate::optim::optimizer::Optimizer;

/// Multiplies every group's learning rate by `factor` once the monitored
/// loss has failed to improve for more than `patience` consecutive epochs.
///
/// Improvement is relative: `loss < best * (1 - threshold)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceLROnPlateau {
    factor: f64,
    patience: usize,
    threshold: f64,
    min_lr: f64,
    best: f64,
    num_bad_epochs: usize,
}

impl ReduceLROnPlateau {
    pub(crate) fn new(factor: f64, patience: usize, threshold: f64, min_lr: f64) -> ReduceLROnPlateau {
        ReduceLROnPlateau {
            factor,
            patience,
            threshold,
            min_lr,
            best: f64::INFINITY,
            num_bad_epochs: 0,
        }
    }

    pub fn num_bad_epochs(&self) -> usize {
        self.num_bad_epochs
    }

    pub fn advance(&mut self, optimizer: &mut dyn Optimizer, loss: f64) {
        if loss < self.best * (1.0 - self.threshold) {
            self.best = loss;
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
        }

        if self.num_bad_epochs > self.patience {
            for (group, old) in optimizer.learning_rates().into_iter().enumerate() {
                let new = (old * self.factor).max(self.min_lr);
                if old - new > 1e-8 {
                    optimizer.set_learning_rate(group, new);
                    info!("reducing learning rate of group {group} to {new:.4e}");
                }
            }
            self.num_bad_epochs = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;
    use approx::assert_relative_eq;

    #[test]
    fn reduces_after_patience_plus_one_bad_epochs() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLROnPlateau::new(0.5, 2, 1e-4, 0.0);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 1.0);
        assert_eq!(opt.learning_rate(), 1.0);
        sched.advance(&mut opt, 1.0);
        assert_relative_eq!(opt.learning_rate(), 0.5);
        assert_eq!(sched.num_bad_epochs(), 0);
    }

    #[test]
    fn improvement_resets_the_counter() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLROnPlateau::new(0.5, 1, 1e-4, 0.0);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 0.5);
        sched.advance(&mut opt, 0.5);
        assert_eq!(opt.learning_rate(), 1.0);
    }

    #[test]
    fn never_goes_below_min_lr() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLROnPlateau::new(0.1, 0, 0.0, 0.5);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 1.0);
        sched.advance(&mut opt, 1.0);
        assert_relative_eq!(opt.learning_rate(), 0.5);
    }
}
