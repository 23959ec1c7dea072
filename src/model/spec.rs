use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::model::loc_embedding::LocEmbedding;
use crate::model::location_model::LocationModel;
use crate::model::user_mlp::UserLocMlp;

/// Which built-in architecture a `ModelSpec` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LocEmbedding,
    UserLocMlp,
}

/// A fully serializable description of a model architecture.
///
/// `ModelSpec` can be saved to / loaded from JSON independently of the
/// trained weights, so an experiment's architecture can be stored before
/// training starts and rebuilt later to load a checkpoint into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, also used as the checkpoint file stem.
    pub name: String,
    pub kind: ModelKind,
    pub num_locations: usize,
    #[serde(default)]
    pub num_users: usize,
    #[serde(default = "default_emb_size")]
    pub emb_size: usize,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    #[serde(default = "default_activation")]
    pub activation: ActivationFunction,
    #[serde(default)]
    pub seed: u64,
}

fn default_emb_size() -> usize {
    32
}

fn default_hidden_size() -> usize {
    64
}

fn default_activation() -> ActivationFunction {
    ActivationFunction::Tanh
}

impl ModelSpec {
    pub fn build(&self) -> Result<LocationModel> {
        if self.num_locations == 0 || self.emb_size == 0 {
            return Err(Error::Config("num_locations and emb_size must be positive".into()));
        }
        match self.kind {
            ModelKind::LocEmbedding => Ok(LocationModel::LocEmbedding(LocEmbedding::new(
                &self.name,
                self.num_locations,
                self.emb_size,
                self.seed,
            ))),
            ModelKind::UserLocMlp => {
                if self.num_users == 0 || self.hidden_size == 0 {
                    return Err(Error::Config("user_loc_mlp needs num_users and hidden_size".into()));
                }
                Ok(LocationModel::UserLocMlp(UserLocMlp::new(
                    &self.name,
                    self.num_locations,
                    self.num_users,
                    self.emb_size,
                    self.hidden_size,
                    self.activation,
                    self.seed,
                )))
            }
        }
    }

    /// Serializes the model description to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `ModelSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<ModelSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::model::Model;

    #[test]
    fn json_defaults_fill_optional_fields() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"name": "LocEmbedding", "kind": "loc_embedding", "num_locations": 6}"#)
                .unwrap();
        assert_eq!(spec.emb_size, 32);
        let model = spec.build().unwrap();
        assert_eq!(model.name(), "LocEmbedding");
    }

    #[test]
    fn mlp_without_users_is_a_config_error() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"name": "m", "kind": "user_loc_mlp", "num_locations": 6}"#).unwrap();
        assert!(matches!(spec.build(), Err(Error::Config(_))));
    }

    #[test]
    fn spec_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let path = path.to_str().unwrap();
        let spec = ModelSpec {
            name: "UserLocMlp".into(),
            kind: ModelKind::UserLocMlp,
            num_locations: 10,
            num_users: 3,
            emb_size: 4,
            hidden_size: 8,
            activation: ActivationFunction::ReLU,
            seed: 9,
        };
        spec.save_json(path).unwrap();
        let loaded = ModelSpec::load_json(path).unwrap();
        assert_eq!(loaded.kind, ModelKind::UserLocMlp);
        assert_eq!(loaded.activation, ActivationFunction::ReLU);
    }
}
