use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// External hyperparameter-search trial the executor reports to.
///
/// Each epoch the executor asks for a step-scoped checkpoint directory,
/// writes the model there, then reports the validation loss. What the
/// search does with the reports (ranking, pruning) is opaque to training.
pub trait TuningSession {
    fn checkpoint_dir(&mut self, step: usize) -> Result<PathBuf>;

    fn report(&mut self, loss: f64) -> Result<()>;
}

/// Filesystem-backed trial: `checkpoint_<step>/` directories and one JSON
/// line per report in `progress.jsonl`.
#[derive(Debug)]
pub struct LocalTrial {
    trial_dir: PathBuf,
    reports: Vec<f64>,
}

#[derive(Serialize)]
struct Report<'a> {
    iteration: usize,
    loss: f64,
    timestamp: &'a str,
}

impl LocalTrial {
    pub fn new(trial_dir: impl Into<PathBuf>) -> Result<LocalTrial> {
        let trial_dir = trial_dir.into();
        std::fs::create_dir_all(&trial_dir)?;
        Ok(LocalTrial { trial_dir, reports: Vec::new() })
    }

    pub fn trial_dir(&self) -> &Path {
        &self.trial_dir
    }

    pub fn reports(&self) -> &[f64] {
        &self.reports
    }

    pub fn progress_path(&self) -> PathBuf {
        self.trial_dir.join("progress.jsonl")
    }
}

impl TuningSession for LocalTrial {
    fn checkpoint_dir(&mut self, step: usize) -> Result<PathBuf> {
        let dir = self.trial_dir.join(format!("checkpoint_{step:06}"));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn report(&mut self, loss: f64) -> Result<()> {
        let timestamp = chrono::Local::now().to_rfc3339();
        let line = serde_json::to_string(&Report {
            iteration: self.reports.len() + 1,
            loss,
            timestamp: &timestamp,
        })?;
        let mut file = OpenOptions::new().create(true).append(true).open(self.progress_path())?;
        writeln!(file, "{line}")?;
        self.reports.push(loss);
        Ok(())
    }
}
