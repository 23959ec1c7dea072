use crate::data::batch::Batch;
use crate::error::Result;
use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;
use crate::model::loc_embedding::LocEmbedding;
use crate::model::model::Model;
use crate::model::user_mlp::UserLocMlp;

/// Closed set of built-in model variants, dispatching `Model` to the inner one.
#[derive(Debug, Clone)]
pub enum LocationModel {
    LocEmbedding(LocEmbedding),
    UserLocMlp(UserLocMlp),
}

macro_rules! dispatch {
    ($self:ident, $m:ident => $body:expr) => {
        match $self {
            LocationModel::LocEmbedding($m) => $body,
            LocationModel::UserLocMlp($m) => $body,
        }
    };
}

impl Model for LocationModel {
    fn name(&self) -> &str {
        dispatch!(self, m => m.name())
    }

    fn set_training(&mut self, training: bool) {
        dispatch!(self, m => m.set_training(training))
    }

    fn forward(&mut self, batch: &Batch) -> Result<Matrix> {
        dispatch!(self, m => m.forward(batch))
    }

    fn calculate_loss(&mut self, batch: &Batch) -> Result<f64> {
        dispatch!(self, m => m.calculate_loss(batch))
    }

    fn backward(&mut self) -> Result<()> {
        dispatch!(self, m => m.backward())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        dispatch!(self, m => m.parameters())
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        dispatch!(self, m => m.parameters_mut())
    }
}
