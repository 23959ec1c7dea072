use std::collections::HashMap;

use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;
use crate::optim::optimizer::{Optimizer, ParamGroup};

/// Adam with L2 weight decay folded into the gradient.
///
/// Moment buffers are keyed by parameter name, so the parameter order handed
/// to `step` does not matter.
pub struct Adam {
    groups: Vec<ParamGroup>,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
    moments: HashMap<String, (Matrix, Matrix)>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam::with_groups(vec![ParamGroup { lr: learning_rate, weight_decay: 0.0 }])
    }

    pub fn with_groups(groups: Vec<ParamGroup>) -> Adam {
        Adam {
            groups,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments: HashMap::new(),
        }
    }

    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);

        for p in params.iter_mut() {
            let group = self.groups[p.group];
            let (m, v) = self
                .moments
                .entry(p.name.clone())
                .or_insert_with(|| (Matrix::zeros(p.grad.rows, p.grad.cols), Matrix::zeros(p.grad.rows, p.grad.cols)));

            for i in 0..p.value.rows {
                for j in 0..p.value.cols {
                    let g = p.grad.data[i][j] + group.weight_decay * p.value.data[i][j];
                    let mij = self.beta1 * m.data[i][j] + (1.0 - self.beta1) * g;
                    let vij = self.beta2 * v.data[i][j] + (1.0 - self.beta2) * g * g;
                    m.data[i][j] = mij;
                    v.data[i][j] = vij;
                    let m_hat = mij / bias1;
                    let v_hat = vij / bias2;
                    p.value.data[i][j] -= group.lr * m_hat / (v_hat.sqrt() + self.epsilon);
                }
            }
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
    fn first_step_moves_each_weight_by_about_lr() {
        let mut p = Parameter::new("w", Matrix::row_vector(vec![1.0, 1.0]));
        p.grad = Matrix::row_vector(vec![3.0, -0.01]);
        let mut adam = Adam::new(0.1);
        adam.step(&mut [&mut p]);
        // m_hat / sqrt(v_hat) == sign(g) on the first step
        assert!((p.value.data[0][0] - 0.9).abs() < 1e-6);
        assert!((p.value.data[0][1] - 1.1).abs() < 1e-4);
        assert_eq!(adam.step_count(), 1);
    }

    #[test]
    fn zero_grad_clears_accumulated_gradients() {
        let mut p = Parameter::new("w", Matrix::row_vector(vec![1.0]));
        p.grad = Matrix::row_vector(vec![2.0]);
        let adam = Adam::new(0.1);
        adam.zero_grad(&mut [&mut p]);
        assert_eq!(p.grad.data[0][0], 0.0);
    }
}
