use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activation::activation::ActivationFunction;
use crate::data::batch::Batch;
use crate::error::{Error, Result};
use crate::layers::{Dense, Embedding, Parameter};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::model::model::{check_batch, Model};

/// First-order transition model: scores every location from the embedding
/// of the current one, `logits = E[loc]·W + b`.
#[derive(Debug, Clone)]
pub struct LocEmbedding {
    name: String,
    loc_emb: Embedding,
    out: Dense,
    training: bool,
    d_logits: Option<Matrix>,
}

impl LocEmbedding {
    pub fn new(name: &str, num_locations: usize, emb_size: usize, seed: u64) -> LocEmbedding {
        let mut rng = StdRng::seed_from_u64(seed);
        LocEmbedding {
            name: name.to_string(),
            loc_emb: Embedding::new("loc_emb", num_locations, emb_size, &mut rng),
            out: Dense::new("out", emb_size, num_locations, ActivationFunction::Identity, &mut rng),
            training: true,
            d_logits: None,
        }
    }
}

impl Model for LocEmbedding {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        self.d_logits = None;
    }

    fn forward(&mut self, batch: &Batch) -> Result<Matrix> {
        check_batch(batch)?;
        let e = self.loc_emb.forward(&batch.current_loc)?;
        self.out.forward(&e)
    }

    fn calculate_loss(&mut self, batch: &Batch) -> Result<f64> {
        let logits = self.forward(batch)?;
        if self.training {
            let (loss, grad) = CrossEntropyLoss::loss_and_grad(&logits, &batch.target)?;
            self.d_logits = Some(grad);
            Ok(loss)
        } else {
            CrossEntropyLoss::loss(&logits, &batch.target)
        }
    }

    fn backward(&mut self) -> Result<()> {
        let d_logits = self
            .d_logits
            .take()
            .ok_or_else(|| Error::Model(format!("{}: backward without a training-mode loss", self.name)))?;
        let d_e = self.out.backward(&d_logits)?;
        self.loc_emb.backward(&d_e)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = vec![&self.loc_emb.table];
        params.extend(self.out.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = vec![&mut self.loc_emb.table];
        params.extend(self.out.parameters_mut());
        params
    }
}
