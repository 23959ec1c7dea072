pub mod math;
pub mod activation;
pub mod layers;
pub mod loss;
pub mod model;
pub mod data;
pub mod optim;
pub mod train;
pub mod evaluator;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use data::{Batch, DataLoader, Sample};
pub use error::{Error, Result};
pub use evaluator::{EvalBatch, EvaluatorConfig, Metric, TrajLocPredEvaluator};
pub use model::{LocationModel, Model, ModelKind, ModelSpec};
pub use optim::{CosineWarmupScheduler, LrScheduler, Optimizer, SchedulerConfig};
pub use train::{Executor, LocalTrial, TrainConfig, TuningSession};
