pub mod cross_entropy;

pub use cross_entropy::{softmax_rows, CrossEntropyLoss};
