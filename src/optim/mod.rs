pub mod adam;
pub mod clip;
pub mod optimizer;
pub mod scheduler;
pub mod sgd;

pub use adam::Adam;
pub use clip::clip_grad_norm;
pub use optimizer::{Optimizer, OptimizerKind, ParamGroup};
pub use scheduler::{CosineWarmupScheduler, LrScheduler, SchedulerConfig};
pub use sgd::Sgd;
