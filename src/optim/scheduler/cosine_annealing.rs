use std::f64::consts::PI;

use crate::optim::optimizer::Optimizer;
use crate::optim::scheduler::step_decay::EpochCounter;

/// Cosine annealing from each group's initial rate down to `eta_min` over
/// `t_max` epochs, rising again symmetrically afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CosineAnnealingLR {
    t_max: usize,
    eta_min: f64,
    counter: EpochCounter,
}

impl CosineAnnealingLR {
    pub(crate) fn new(optimizer: &dyn Optimizer, t_max: usize, eta_min: f64) -> CosineAnnealingLR {
        CosineAnnealingLR { t_max, eta_min, counter: EpochCounter::new(optimizer) }
    }

    pub fn advance(&mut self, optimizer: &mut dyn Optimizer) {
        let (t_max, eta_min) = (self.t_max as f64, self.eta_min);
        self.counter.advance(optimizer, |base, epoch| {
            eta_min + (base - eta_min) * (1.0 + (PI * epoch as f64 / t_max).cos()) / 2.0
        });
    }
}
