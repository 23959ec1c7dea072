use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every fallible operation in the crate reports through this type.
///
/// Nothing inside the training loop or the evaluator retries or swallows an
/// error: configuration problems surface at construction, contract
/// violations surface on the offending call, numeric and filesystem failures
/// propagate out of `Executor::train` unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("the metric `{0}` is not allowed in TrajLocPredEvaluator (expected one of Precision, Recall, F1, MRR, MAP, NDCG)")]
    UnknownMetric(String),

    #[error("invalid evaluation batch: {0}")]
    InvalidBatch(String),

    #[error("division by zero while computing {0}")]
    DivisionByZero(String),

    #[error("non-finite training loss {loss} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize, loss: f64 },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("model error: {0}")]
    Model(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
