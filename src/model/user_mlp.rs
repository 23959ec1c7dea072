use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activation::activation::ActivationFunction;
use crate::data::batch::Batch;
use crate::error::{Error, Result};
use crate::layers::{Dense, Embedding, Parameter};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::model::model::{check_batch, Model};

/// Personalized variant: concatenates location and user embeddings and runs
/// them through one hidden layer before scoring every location.
#[derive(Debug, Clone)]
pub struct UserLocMlp {
    name: String,
    loc_emb: Embedding,
    user_emb: Embedding,
    hidden: Dense,
    out: Dense,
    training: bool,
    d_logits: Option<Matrix>,
}

impl UserLocMlp {
    pub fn new(
        name: &str,
        num_locations: usize,
        num_users: usize,
        emb_size: usize,
        hidden_size: usize,
        activation: ActivationFunction,
        seed: u64,
    ) -> UserLocMlp {
        let mut rng = StdRng::seed_from_u64(seed);
        UserLocMlp {
            name: name.to_string(),
            loc_emb: Embedding::new("loc_emb", num_locations, emb_size, &mut rng),
            user_emb: Embedding::new("user_emb", num_users, emb_size, &mut rng),
            hidden: Dense::new("hidden", 2 * emb_size, hidden_size, activation, &mut rng),
            out: Dense::new("out", hidden_size, num_locations, ActivationFunction::Identity, &mut rng),
            training: true,
            d_logits: None,
        }
    }
}

impl Model for UserLocMlp {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        self.d_logits = None;
    }

    fn forward(&mut self, batch: &Batch) -> Result<Matrix> {
        check_batch(batch)?;
        let loc = self.loc_emb.forward(&batch.current_loc)?;
        let user = self.user_emb.forward(&batch.uid)?;
        let h = self.hidden.forward(&loc.hstack(&user))?;
        self.out.forward(&h)
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
        let d_h = self.out.backward(&d_logits)?;
        let d_x = self.hidden.backward(&d_h)?;
        let (d_loc, d_user) = d_x.split_cols(self.loc_emb.dim());
        self.loc_emb.backward(&d_loc)?;
        self.user_emb.backward(&d_user)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = vec![&self.loc_emb.table, &self.user_emb.table];
        params.extend(self.hidden.parameters());
        params.extend(self.out.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = vec![&mut self.loc_emb.table, &mut self.user_emb.table];
        params.extend(self.hidden.parameters_mut());
        params.extend(self.out.parameters_mut());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_decreases_under_plain_gradient_descent() {
        let mut model = UserLocMlp::new("UserLocMlp", 4, 2, 4, 8, ActivationFunction::Tanh, 11);
        let batch = Batch { uid: vec![0, 1, 0, 1], current_loc: vec![0, 1, 2, 3], target: vec![1, 2, 3, 0] };

        let first = model.calculate_loss(&batch).unwrap();
        model.backward().unwrap();
        for _ in 0..200 {
            for p in model.parameters_mut() {
                let step = p.grad.map(|g| g * 0.5);
                p.value = &p.value - &step;
                p.zero_grad();
            }
            model.calculate_loss(&batch).unwrap();
            model.backward().unwrap();
        }
        let last = model.calculate_loss(&batch).unwrap();
        assert!(last < first * 0.5, "loss went from {first} to {last}");
    }

    #[test]
    fn unknown_user_is_a_shape_error() {
        let mut model = UserLocMlp::new("UserLocMlp", 4, 2, 2, 3, ActivationFunction::ReLU, 0);
        let batch = Batch { uid: vec![5], current_loc: vec![0], target: vec![1] };
        assert!(matches!(model.forward(&batch), Err(Error::Shape(_))));
    }
}
