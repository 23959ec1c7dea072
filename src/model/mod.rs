pub mod loc_embedding;
pub mod location_model;
pub mod model;
pub mod spec;
pub mod user_mlp;

pub use loc_embedding::LocEmbedding;
pub use location_model::LocationModel;
pub use model::{Model, ModelState};
pub use spec::{ModelKind, ModelSpec};
pub use user_mlp::UserLocMlp;
