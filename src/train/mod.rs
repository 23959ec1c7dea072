pub mod checkpoint;
pub mod epoch_stats;
pub mod executor;
pub mod train_config;
pub mod tuning;

pub use checkpoint::Checkpoint;
pub use epoch_stats::EpochStats;
pub use executor::{Executor, RunState};
pub use train_config::TrainConfig;
pub use tuning::{LocalTrial, TuningSession};
