use std::path::PathBuf;
use std::sync::mpsc;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::evaluator::traj_loc_pred::EvaluatorConfig;
use crate::optim::optimizer::OptimizerKind;
use crate::optim::scheduler::SchedulerConfig;
use crate::train::epoch_stats::EpochStats;

/// Configuration for an `Executor` run.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
///
/// # Fields
/// - `max_epoch`, `start_epoch`: epochs run are `start_epoch..max_epoch`;
///   a non-zero `start_epoch` resumes from that epoch's checkpoint
/// - `learner`, `learning_rate`, `weight_decay`: optimizer selection
/// - `lr_decay`: when false the learning rate stays constant and
///   `lr_scheduler` is ignored
/// - `clip_grad_norm`, `max_grad_norm`: global-norm clipping before each step
/// - `use_early_stop`, `patience`: stop after `patience` consecutive
///   non-improving epochs
/// - `saved_model`, `load_best_epoch`: per-improvement checkpoints and
///   restoring the best one when training ends
/// - `hyper_tune`: report to the executor's tuning session each epoch
/// - `progress_tx`: optional channel sender; one `EpochStats` is sent per
///   completed epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub max_epoch: usize,
    pub start_epoch: usize,
    pub learner: OptimizerKind,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub lr_decay: bool,
    pub lr_scheduler: SchedulerConfig,
    pub clip_grad_norm: bool,
    pub max_grad_norm: f64,
    pub use_early_stop: bool,
    pub patience: usize,
    /// Epoch summary line every `log_every` epochs.
    pub log_every: usize,
    /// Batch progress line every `log_batch_every` batches.
    pub log_batch_every: usize,
    pub saved_model: bool,
    pub load_best_epoch: bool,
    pub hyper_tune: bool,
    pub dataset: String,
    pub cache_dir: PathBuf,
    pub evaluate_res_dir: PathBuf,
    /// File stem for `Executor::evaluate` results; a timestamp when unset.
    pub result_filename: Option<String>,
    pub evaluator: EvaluatorConfig,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            max_epoch: 100,
            start_epoch: 0,
            learner: OptimizerKind::Adam,
            learning_rate: 0.01,
            weight_decay: 0.0,
            lr_decay: false,
            lr_scheduler: SchedulerConfig::default(),
            clip_grad_norm: false,
            max_grad_norm: 1.0,
            use_early_stop: false,
            patience: 50,
            log_every: 1,
            log_batch_every: 100,
            saved_model: true,
            load_best_epoch: true,
            hyper_tune: false,
            dataset: "dataset".to_string(),
            cache_dir: PathBuf::from("cache/model_cache"),
            evaluate_res_dir: PathBuf::from("cache/evaluate_cache"),
            result_filename: None,
            evaluator: EvaluatorConfig::default(),
            progress_tx: None,
        }
    }
}

impl TrainConfig {
    /// Creates a default `TrainConfig` running `max_epoch` epochs.
    pub fn new(max_epoch: usize) -> Self {
        TrainConfig { max_epoch, ..TrainConfig::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_epoch > self.max_epoch {
            return Err(Error::Config(format!(
                "start_epoch {} is past max_epoch {}",
                self.start_epoch, self.max_epoch
            )));
        }
        if self.log_every == 0 || self.log_batch_every == 0 {
            return Err(Error::Config("log_every and log_batch_every must be at least 1".into()));
        }
        if self.clip_grad_norm && !(self.max_grad_norm > 0.0) {
            return Err(Error::Config("max_grad_norm must be positive when clipping".into()));
        }
        if !(self.learning_rate >= 0.0) {
            return Err(Error::Config("learning_rate must be non-negative".into()));
        }
        Ok(())
    }

    /// Deserializes a `TrainConfig` from a JSON file and validates it.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
