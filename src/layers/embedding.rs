use rand::Rng;

use crate::error::{Error, Result};
use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;

/// Lookup table mapping integer ids (locations, users) to dense rows.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub table: Parameter,
    ids: Option<Vec<usize>>,
}

impl Embedding {
    pub fn new<R: Rng + ?Sized>(name: &str, num_embeddings: usize, dim: usize, rng: &mut R) -> Embedding {
        Embedding {
            table: Parameter::new(format!("{name}.weight"), Matrix::xavier(num_embeddings, dim, rng)),
            ids: None,
        }
    }

    pub fn num_embeddings(&self) -> usize {
        self.table.value.rows
    }

    pub fn dim(&self) -> usize {
        self.table.value.cols
    }

    pub fn forward(&mut self, ids: &[usize]) -> Result<Matrix> {
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.num_embeddings()) {
            return Err(Error::Shape(format!(
                "{}: id {} out of range for {} embeddings",
                self.table.name,
                bad,
                self.num_embeddings()
            )));
        }
        self.ids = Some(ids.to_vec());
        Ok(self.table.value.select_rows(ids))
    }

    /// Scatters `d_out` rows back into the gradient rows of the looked-up ids.
    pub fn backward(&mut self, d_out: &Matrix) -> Result<()> {
        let ids = self.ids.take().ok_or_else(|| {
            Error::Model(format!("{}: backward called without a preceding forward", self.table.name))
        })?;
        for (row, &id) in d_out.data.iter().zip(ids.iter()) {
            for (g, d) in self.table.grad.data[id].iter_mut().zip(row.iter()) {
                *g += d;
            }
        }
        Ok(())
    }
}
