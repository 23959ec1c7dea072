use std::collections::HashMap;

use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;
use crate::optim::optimizer::{Optimizer, ParamGroup};

/// Stochastic gradient descent with optional momentum and L2 weight decay.
pub struct Sgd {
    groups: Vec<ParamGroup>,
    momentum: f64,
    velocity: HashMap<String, Matrix>,
}

impl Sgd {
    /// Single group, no momentum, no weight decay.
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_groups(vec![ParamGroup { lr: learning_rate, weight_decay: 0.0 }], 0.0)
    }

    pub fn with_groups(groups: Vec<ParamGroup>, momentum: f64) -> Sgd {
        Sgd {
            groups,
            momentum,
            velocity: HashMap::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        for p in params.iter_mut() {
            let group = self.groups[p.group];
            let mut update = p.grad.clone();
            if group.weight_decay != 0.0 {
                update += &p.value.map(|w| w * group.weight_decay);
            }
            if self.momentum != 0.0 {
                let v = self
                    .velocity
                    .entry(p.name.clone())
                    .or_insert_with(|| Matrix::zeros(update.rows, update.cols));
                v.scale_in_place(self.momentum);
                *v += &update;
                update = v.clone();
            }
            update.scale_in_place(group.lr);
            p.value = &p.value - &update;
        }
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    fn set_learning_rate(&mut self, group: usize, lr: f64) {
        self.groups[group].lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_step_moves_against_the_gradient() {
        let mut p = Parameter::new("w", Matrix::row_vector(vec![1.0, -1.0]));
        p.grad = Matrix::row_vector(vec![0.5, -0.5]);
        let mut sgd = Sgd::new(0.1);
        sgd.step(&mut [&mut p]);
        assert!((p.value.data[0][0] - 0.95).abs() < 1e-12);
        assert!((p.value.data[0][1] + 0.95).abs() < 1e-12);
    }

    #[test]
    fn momentum_accumulates_across_steps() {
        let mut p = Parameter::new("w", Matrix::row_vector(vec![0.0]));
        p.grad = Matrix::row_vector(vec![1.0]);
        let mut sgd = Sgd::with_groups(vec![ParamGroup { lr: 1.0, weight_decay: 0.0 }], 0.5);
        sgd.step(&mut [&mut p]);
        sgd.step(&mut [&mut p]);
        // v1 = 1, v2 = 0.5 * 1 + 1 = 1.5
        assert!((p.value.data[0][0] + 2.5).abs() < 1e-12);
    }

    #[test]
    fn set_learning_rate_targets_one_group() {
        let mut sgd = Sgd::with_groups(
            vec![ParamGroup { lr: 0.1, weight_decay: 0.0 }, ParamGroup { lr: 0.2, weight_decay: 0.0 }],
            0.0,
        );
        sgd.set_learning_rate(1, 0.05);
        assert_eq!(sgd.learning_rates(), vec![0.1, 0.05]);
        sgd.set_all_learning_rates(0.3);
        assert_eq!(sgd.learning_rates(), vec![0.3, 0.3]);
    }
}
