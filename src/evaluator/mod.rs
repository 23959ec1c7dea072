pub mod metric;
pub mod top_k;
pub mod traj_loc_pred;

pub use metric::Metric;
pub use top_k::{top_k, TopKStats};
pub use traj_loc_pred::{Accumulator, EvalBatch, EvaluatorConfig, TrajLocPredEvaluator};
