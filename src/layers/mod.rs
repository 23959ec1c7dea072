pub mod dense;
pub mod embedding;
pub mod parameter;

pub use dense::Dense;
pub use embedding::Embedding;
pub use parameter::Parameter;
