pub mod batch;
pub mod loader;

pub use batch::{Batch, Sample};
pub use loader::DataLoader;
