use serde::{Serialize, Deserialize};

use crate::layers::parameter::Parameter;

/// Hyperparameters shared by every parameter assigned to the group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
    pub lr: f64,
    pub weight_decay: f64,
}

/// Gradient-descent update rule over a model's parameters.
///
/// Learning rates live in parameter groups and are only changed through
/// `set_learning_rate`, which is how schedulers drive any implementation.
/// Every `Parameter::group` must index an existing group.
pub trait Optimizer {
    /// Applies one update using the gradients currently stored on `params`.
    fn step(&mut self, params: &mut [&mut Parameter]);

    fn zero_grad(&self, params: &mut [&mut Parameter]) {
        for p in params.iter_mut() {
            p.zero_grad();
        }
    }

    fn param_groups(&self) -> &[ParamGroup];

    fn set_learning_rate(&mut self, group: usize, lr: f64);

    /// Learning rate of the first group, the one reported in logs.
    fn learning_rate(&self) -> f64 {
        self.param_groups().first().map_or(0.0, |g| g.lr)
    }

    /// Writes `lr` into every group.
    fn set_all_learning_rates(&mut self, lr: f64) {
        for group in 0..self.param_groups().len() {
            self.set_learning_rate(group, lr);
        }
    }

    fn learning_rates(&self) -> Vec<f64> {
        self.param_groups().iter().map(|g| g.lr).collect()
    }
}

/// Update rule selected by `TrainConfig::learner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64, weight_decay: f64) -> Box<dyn Optimizer> {
        let group = ParamGroup { lr: learning_rate, weight_decay };
        match self {
            OptimizerKind::Sgd => Box::new(crate::optim::sgd::Sgd::with_groups(vec![group], 0.0)),
            OptimizerKind::Adam => Box::new(crate::optim::adam::Adam::with_groups(vec![group])),
        }
    }
}
