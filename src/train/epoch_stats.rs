use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by `Executor::train`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the executor
/// sends one `EpochStats` value at the end of every completed epoch, after
/// the learning-rate schedule has advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index.
    pub epoch: usize,
    /// Configured `max_epoch` for this run.
    pub total_epochs: usize,
    /// Mean training loss over the batches of this epoch.
    pub train_loss: f64,
    /// Mean validation loss, the value early stopping monitors.
    pub val_loss: f64,
    /// Learning rate of the first parameter group after this epoch.
    pub lr: f64,
    /// Wall-clock duration of the training pass in milliseconds.
    pub train_ms: u64,
    /// Wall-clock duration of the validation pass in milliseconds.
    pub eval_ms: u64,
}
