use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::batch::{Batch, Sample};
use crate::error::{Error, Result};

/// Finite, restartable batch source. Each call to `batches` yields one epoch.
pub struct DataLoader {
    samples: Vec<Sample>,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl DataLoader {
    pub fn new(samples: Vec<Sample>, batch_size: usize, shuffle: bool, seed: u64) -> Result<DataLoader> {
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        Ok(DataLoader {
            samples,
            batch_size,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        self.samples.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Materializes one epoch of batches, reshuffling sample order first when
    /// shuffling is enabled. The last batch may be short.
    pub fn batches(&mut self) -> Vec<Batch> {
        let mut indices: Vec<usize> = (0..self.samples.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut self.rng);
        }
        indices
            .chunks(self.batch_size)
            .map(|chunk| Batch::from_samples(chunk.iter().map(|&i| &self.samples[i])))
            .collect()
    }
}
