use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::model::model::{Model, ModelState};
use crate::optim::optimizer::Optimizer;

/// Model parameters plus the optimizer's per-group learning rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Option<usize>,
    pub model: ModelState,
    pub learning_rates: Vec<f64>,
}

impl Checkpoint {
    pub fn capture(epoch: Option<usize>, model: &dyn Model, optimizer: &dyn Optimizer) -> Checkpoint {
        Checkpoint {
            epoch,
            model: model.state(),
            learning_rates: optimizer.learning_rates(),
        }
    }

    /// Loads parameters into `model` and learning rates into `optimizer`.
    pub fn restore(&self, model: &mut dyn Model, optimizer: &mut dyn Optimizer) -> Result<()> {
        model.load_state(&self.model)?;
        let groups = optimizer.param_groups().len();
        for (group, &lr) in self.learning_rates.iter().enumerate().take(groups) {
            optimizer.set_learning_rate(group, lr);
        }
        Ok(())
    }

    /// Writes the checkpoint as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Checkpoint> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// `<cache_dir>/<model>_<dataset>_epoch<N>.json`
pub fn epoch_checkpoint_path(cache_dir: &Path, model: &str, dataset: &str, epoch: usize) -> PathBuf {
    cache_dir.join(format!("{model}_{dataset}_epoch{epoch}.json"))
}
