//! Learning-rate schedules
//!
//! Every schedule is a variant of the closed `LrScheduler` enum and is driven
//! through the same two hooks, so the training loop never asks which
//! schedule it holds:
//!
//! - `step_and_update_lr` once per batch: per-step schedules update the
//!   learning rate, then every variant performs the optimizer step.
//! - `advance` once per epoch with the validation loss: epoch schedules
//!   update the learning rate, loss-driven ones consume the loss.

pub mod cosine_annealing;
pub mod cosine_warmup;
pub mod plateau;
pub mod step_decay;

use log::info;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::layers::parameter::Parameter;
use crate::optim::optimizer::Optimizer;

pub use cosine_annealing::CosineAnnealingLR;
pub use cosine_warmup::CosineWarmupScheduler;
pub use plateau::ReduceLROnPlateau;
pub use step_decay::{ExponentialLR, MultiStepLR, StepLR};

/// Serializable schedule selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerConfig {
    MultiStep {
        #[serde(default)]
        milestones: Vec<usize>,
        #[serde(default = "default_gamma")]
        gamma: f64,
    },
    Step {
        #[serde(default = "default_step_size")]
        step_size: usize,
        #[serde(default = "default_gamma")]
        gamma: f64,
    },
    Exponential {
        #[serde(default = "default_gamma")]
        gamma: f64,
    },
    CosineAnnealing {
        #[serde(default = "default_t_max")]
        t_max: usize,
        #[serde(default)]
        eta_min: f64,
    },
    ReduceOnPlateau {
        #[serde(default = "default_gamma")]
        factor: f64,
        #[serde(default = "default_plateau_patience")]
        patience: usize,
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default)]
        min_lr: f64,
    },
    CosineWarmup {
        #[serde(default = "default_d_model")]
        d_model: usize,
        #[serde(default = "default_warmup_steps")]
        warmup_steps: usize,
        #[serde(default = "default_lr_mul")]
        lr_mul: f64,
    },
}

fn default_gamma() -> f64 {
    0.1
}
fn default_step_size() -> usize {
    10
}
fn default_t_max() -> usize {
    30
}
fn default_plateau_patience() -> usize {
    10
}
fn default_threshold() -> f64 {
    1e-4
}
fn default_d_model() -> usize {
    32
}
fn default_warmup_steps() -> usize {
    4000
}
fn default_lr_mul() -> f64 {
    1.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::MultiStep { milestones: Vec::new(), gamma: default_gamma() }
    }
}

/// The active learning-rate schedule of a training run.
#[derive(Debug, Clone, PartialEq)]
pub enum LrScheduler {
    /// Learning-rate decay disabled.
    Constant,
    MultiStep(MultiStepLR),
    Step(StepLR),
    Exponential(ExponentialLR),
    CosineAnnealing(CosineAnnealingLR),
    ReduceOnPlateau(ReduceLROnPlateau),
    CosineWarmup(CosineWarmupScheduler),
}

impl LrScheduler {
    /// Builds the schedule for `optimizer`, capturing its current learning
    /// rates as the base rates of epoch schedules.
    pub fn build(config: &SchedulerConfig, optimizer: &dyn Optimizer) -> Result<LrScheduler> {
        let scheduler = match *config {
            SchedulerConfig::MultiStep { ref milestones, gamma } => {
                LrScheduler::MultiStep(MultiStepLR::new(optimizer, milestones.clone(), gamma))
            }
            SchedulerConfig::Step { step_size, gamma } => {
                if step_size == 0 {
                    return Err(Error::Config("step scheduler needs step_size > 0".into()));
                }
                LrScheduler::Step(StepLR::new(optimizer, step_size, gamma))
            }
            SchedulerConfig::Exponential { gamma } => {
                LrScheduler::Exponential(ExponentialLR::new(optimizer, gamma))
            }
            SchedulerConfig::CosineAnnealing { t_max, eta_min } => {
                if t_max == 0 {
                    return Err(Error::Config("cosine annealing needs t_max > 0".into()));
                }
                LrScheduler::CosineAnnealing(CosineAnnealingLR::new(optimizer, t_max, eta_min))
            }
            SchedulerConfig::ReduceOnPlateau { factor, patience, threshold, min_lr } => {
                if !(0.0..1.0).contains(&factor) {
                    return Err(Error::Config("plateau factor must be in [0, 1)".into()));
                }
                LrScheduler::ReduceOnPlateau(ReduceLROnPlateau::new(factor, patience, threshold, min_lr))
            }
            SchedulerConfig::CosineWarmup { d_model, warmup_steps, lr_mul } => {
                LrScheduler::CosineWarmup(CosineWarmupScheduler::new(d_model, warmup_steps, lr_mul)?)
            }
        };
        info!("You select `{}` lr_scheduler.", scheduler.name());
        Ok(scheduler)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LrScheduler::Constant => "constant",
            LrScheduler::MultiStep(_) => "multi_step",
            LrScheduler::Step(_) => "step",
            LrScheduler::Exponential(_) => "exponential",
            LrScheduler::CosineAnnealing(_) => "cosine_annealing",
            LrScheduler::ReduceOnPlateau(_) => "reduce_on_plateau",
            LrScheduler::CosineWarmup(_) => "cosine_warmup",
        }
    }

    /// Per-batch hook: optional learning-rate update, then the optimizer step.
    pub fn step_and_update_lr(&mut self, optimizer: &mut dyn Optimizer, params: &mut [&mut Parameter]) {
        match self {
            LrScheduler::CosineWarmup(s) => s.step_and_update_lr(optimizer, params),
            _ => optimizer.step(params),
        }
    }

    pub fn zero_grad(&self, optimizer: &dyn Optimizer, params: &mut [&mut Parameter]) {
        match self {
            LrScheduler::CosineWarmup(s) => s.zero_grad(optimizer, params),
            _ => optimizer.zero_grad(params),
        }
    }

    /// Per-epoch hook. Only loss-driven schedules read `val_loss`; they skip
    /// the epoch when it is absent.
    pub fn advance(&mut self, optimizer: &mut dyn Optimizer, val_loss: Option<f64>) {
        match self {
            LrScheduler::Constant | LrScheduler::CosineWarmup(_) => {}
            LrScheduler::MultiStep(s) => s.advance(optimizer),
            LrScheduler::Step(s) => s.advance(optimizer),
            LrScheduler::Exponential(s) => s.advance(optimizer),
            LrScheduler::CosineAnnealing(s) => s.advance(optimizer),
            LrScheduler::ReduceOnPlateau(s) => {
                if let Some(loss) = val_loss {
                    s.advance(optimizer, loss);
                }
            }
        }
    }
}
