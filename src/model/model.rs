use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::data::batch::Batch;
use crate::error::{Error, Result};
use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;

/// Capability every next-location model provides to the executor.
///
/// A training step is `calculate_loss` followed by `backward`: the loss call
/// caches whatever the gradient computation needs (only in training mode),
/// `backward` consumes that cache and accumulates into each
/// `Parameter::grad`. `forward` returns one row of location scores per
/// example and is what the ranking evaluator consumes.
pub trait Model {
    fn name(&self) -> &str;

    /// Switches between training and evaluation mode.
    fn set_training(&mut self, training: bool);

    fn forward(&mut self, batch: &Batch) -> Result<Matrix>;

    fn calculate_loss(&mut self, batch: &Batch) -> Result<f64>;

    fn backward(&mut self) -> Result<()>;

    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Snapshot of every parameter value, keyed by parameter name.
    fn state(&self) -> ModelState {
        ModelState {
            params: self
                .parameters()
                .into_iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
        }
    }

    /// Restores parameter values; every parameter must be present with the
    /// same shape.
    fn load_state(&mut self, state: &ModelState) -> Result<()> {
        for p in self.parameters_mut() {
            let value = state
                .params
                .get(&p.name)
                .ok_or_else(|| Error::Model(format!("checkpoint has no parameter `{}`", p.name)))?;
            if value.shape() != p.value.shape() {
                return Err(Error::Shape(format!(
                    "parameter `{}` is {:?} but the checkpoint holds {:?}",
                    p.name,
                    p.value.shape(),
                    value.shape()
                )));
            }
            p.value = value.clone();
        }
        Ok(())
    }
}

/// Serializable parameter snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelState {
    pub params: BTreeMap<String, Matrix>,
}

/// Rejects batches whose parallel columns disagree in length.
pub(crate) fn check_batch(batch: &Batch) -> Result<()> {
    if batch.uid.len() != batch.target.len() || batch.current_loc.len() != batch.target.len() {
        return Err(Error::Shape(format!(
            "batch columns differ in length: uid={}, current_loc={}, target={}",
            batch.uid.len(),
            batch.current_loc.len(),
            batch.target.len()
        )));
    }
    if batch.is_empty() {
        return Err(Error::Shape("empty batch".into()));
    }
    Ok(())
}
