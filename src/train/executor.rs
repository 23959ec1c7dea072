use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Serialize, Deserialize};

use crate::data::batch::Batch;
use crate::data::loader::DataLoader;
use crate::error::{Error, Result};
use crate::evaluator::traj_loc_pred::{EvalBatch, TrajLocPredEvaluator};
use crate::model::model::Model;
use crate::optim::clip::clip_grad_norm;
use crate::optim::optimizer::Optimizer;
use crate::optim::scheduler::LrScheduler;
use crate::train::checkpoint::{epoch_checkpoint_path, Checkpoint};
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::tuning::TuningSession;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Bookkeeping of one `Executor::train` call, readable once it returns.
///
/// # Fields
/// - `epoch_index`: last epoch that ran to completion
/// - `min_val_loss`: best validation loss seen, `f64::INFINITY` before any epoch
/// - `wait`: consecutive epochs without a strict improvement
/// - `best_epoch`: epoch that produced `min_val_loss`
/// - `train_time`, `eval_time`: per-epoch wall-clock seconds
/// - `stopped_early`: true when patience ran out before `max_epoch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub epoch_index: Option<usize>,
    pub min_val_loss: f64,
    pub wait: usize,
    pub best_epoch: Option<usize>,
    pub train_time: Vec<f64>,
    pub eval_time: Vec<f64>,
    pub stopped_early: bool,
}

impl RunState {
    fn new() -> RunState {
        RunState {
            epoch_index: None,
            min_val_loss: f64::INFINITY,
            wait: 0,
            best_epoch: None,
            train_time: Vec::new(),
            eval_time: Vec::new(),
            stopped_early: false,
        }
    }

    pub fn epochs_run(&self) -> usize {
        self.train_time.len()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Training loop controller for a next-location model.
///
/// Owns the model, its optimizer and learning-rate schedule, and the ranking
/// evaluator used by `evaluate`. Everything runs synchronously on the
/// calling thread.
pub struct Executor<M: Model> {
    model: M,
    optimizer: Box<dyn Optimizer>,
    scheduler: LrScheduler,
    evaluator: TrajLocPredEvaluator,
    tuning: Option<Box<dyn TuningSession>>,
    config: TrainConfig,
    run_state: Option<RunState>,
}

impl<M: Model> Executor<M> {
    /// Validates `config` and builds the optimizer, scheduler and evaluator
    /// it selects.
    pub fn new(config: TrainConfig, model: M) -> Result<Executor<M>> {
        config.validate()?;
        let optimizer = config.learner.build(config.learning_rate, config.weight_decay);
        info!("You select `{:?}` optimizer.", config.learner);
        let scheduler = build_scheduler(&config, optimizer.as_ref())?;
        let evaluator = TrajLocPredEvaluator::new(&config.evaluator)?;
        Ok(Executor {
            model,
            optimizer,
            scheduler,
            evaluator,
            tuning: None,
            config,
            run_state: None,
        })
    }

    /// Replaces the optimizer; the schedule is rebuilt against its rates.
    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Result<Executor<M>> {
        self.scheduler = build_scheduler(&self.config, optimizer.as_ref())?;
        self.optimizer = optimizer;
        Ok(self)
    }

    pub fn with_tuning_session(mut self, session: Box<dyn TuningSession>) -> Executor<M> {
        self.tuning = Some(session);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    pub fn scheduler(&self) -> &LrScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.run_state.as_ref()
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    /// Runs epochs `start_epoch..max_epoch` and returns the minimum
    /// validation loss.
    ///
    /// Each epoch: one training pass (zero grads, loss, backward, optional
    /// clipping, scheduled step per batch), one validation pass, the
    /// per-epoch schedule hook, optional tuner report, then the
    /// improvement/patience check. With `load_best_epoch` the best epoch's
    /// checkpoint is restored before returning.
    ///
    /// Nothing is caught: a non-finite loss aborts with
    /// `Error::NonFiniteLoss`, model and filesystem errors propagate as is.
    pub fn train(&mut self, train_loader: &mut DataLoader, eval_loader: &mut DataLoader) -> Result<f64> {
        if train_loader.is_empty() || eval_loader.is_empty() {
            return Err(Error::Config("train and eval loaders must not be empty".into()));
        }
        if self.config.hyper_tune && self.tuning.is_none() {
            return Err(Error::Config("hyper_tune is set but no tuning session is attached".into()));
        }
        info!("Start training ...");
        info!("num_batches:{}", train_loader.len());

        if self.config.start_epoch > 0 {
            self.load_model_with_epoch(self.config.start_epoch)?;
        }

        let mut state = RunState::new();
        let outcome = self.run_epochs(train_loader, eval_loader, &mut state);
        let (min_val_loss, best_epoch) = (state.min_val_loss, state.best_epoch);
        if state.epochs_run() > 0 {
            info!(
                "Trained totally {} epochs, average train time is {:.3}s, average eval time is {:.3}s",
                state.epochs_run(),
                mean(&state.train_time),
                mean(&state.eval_time)
            );
        }
        self.run_state = Some(state);
        outcome?;

        if self.config.load_best_epoch {
            match best_epoch {
                Some(best) if self.config.saved_model => self.load_model_with_epoch(best)?,
                Some(best) => warn!("load_best_epoch is set but saved_model is not; epoch {} was never saved", best),
                None => {}
            }
        }
        Ok(min_val_loss)
    }

    fn run_epochs(
        &mut self,
        train_loader: &mut DataLoader,
        eval_loader: &mut DataLoader,
        state: &mut RunState,
    ) -> Result<()> {
        for epoch in self.config.start_epoch..self.config.max_epoch {
            let start = Instant::now();
            let train_loss = self.train_epoch(train_loader, epoch)?;
            let train_secs = start.elapsed().as_secs_f64();
            state.train_time.push(train_secs);

            let start = Instant::now();
            let val_loss = self.valid_epoch(eval_loader)?;
            let eval_secs = start.elapsed().as_secs_f64();
            state.eval_time.push(eval_secs);

            self.scheduler.advance(self.optimizer.as_mut(), Some(val_loss));
            state.epoch_index = Some(epoch);

            let lr = self.optimizer.learning_rate();
            if epoch % self.config.log_every == 0 {
                info!(
                    "Epoch [{}/{}] train_loss: {:.4}, val_loss: {:.4}, lr: {:.6}, {:.2}s",
                    epoch,
                    self.config.max_epoch,
                    train_loss,
                    val_loss,
                    lr,
                    train_secs + eval_secs
                );
            }

            if let Some(ref tx) = self.config.progress_tx {
                // A dropped receiver only stops the progress feed.
                let _ = tx.send(EpochStats {
                    epoch,
                    total_epochs: self.config.max_epoch,
                    train_loss,
                    val_loss,
                    lr,
                    train_ms: (train_secs * 1000.0) as u64,
                    eval_ms: (eval_secs * 1000.0) as u64,
                });
            }

            if self.config.hyper_tune {
                self.report_to_tuner(epoch, val_loss)?;
            }

            if val_loss < state.min_val_loss {
                state.wait = 0;
                if self.config.saved_model {
                    let path = self.save_model_with_epoch(epoch)?;
                    info!(
                        "Val loss decrease from {:.4} to {:.4}, saving to {}",
                        state.min_val_loss,
                        val_loss,
                        path.display()
                    );
                }
                state.min_val_loss = val_loss;
                state.best_epoch = Some(epoch);
            } else {
                state.wait += 1;
                if state.wait == self.config.patience && self.config.use_early_stop {
                    warn!("Early stopping at epoch: {}", epoch);
                    state.stopped_early = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn train_epoch(&mut self, loader: &mut DataLoader, epoch: usize) -> Result<f64> {
        self.model.set_training(true);
        let batches = loader.batches();
        let mut losses = Vec::with_capacity(batches.len());
        for (i, batch) in batches.iter().enumerate() {
            let loss = self.train_batch(batch, epoch, i)?;
            debug!("epoch {} batch {} loss {:.6}", epoch, i, loss);
            if i % self.config.log_batch_every == 0 {
                info!(
                    "Training: epoch {}, batch {}/{}, loss {:.4}, lr {:.6}",
                    epoch,
                    i,
                    batches.len(),
                    loss,
                    self.optimizer.learning_rate()
                );
            }
            losses.push(loss);
        }
        Ok(mean(&losses))
    }

    fn train_batch(&mut self, batch: &Batch, epoch: usize, index: usize) -> Result<f64> {
        {
            let mut params = self.model.parameters_mut();
            self.scheduler.zero_grad(self.optimizer.as_ref(), &mut params);
        }
        let loss = self.model.calculate_loss(batch)?;
        if !loss.is_finite() {
            return Err(Error::NonFiniteLoss { epoch, batch: index, loss });
        }
        self.model.backward()?;

        let mut params = self.model.parameters_mut();
        if self.config.clip_grad_norm {
            clip_grad_norm(&mut params, self.config.max_grad_norm);
        }
        self.scheduler.step_and_update_lr(self.optimizer.as_mut(), &mut params);
        Ok(loss)
    }

    fn valid_epoch(&mut self, loader: &mut DataLoader) -> Result<f64> {
        self.model.set_training(false);
        let losses = loader
            .batches()
            .iter()
            .map(|batch| self.model.calculate_loss(batch))
            .collect::<Result<Vec<f64>>>();
        self.model.set_training(true);
        Ok(mean(&losses?))
    }

    fn report_to_tuner(&mut self, epoch: usize, val_loss: f64) -> Result<()> {
        let ckpt = Checkpoint::capture(Some(epoch), &self.model, self.optimizer.as_ref());
        let Some(session) = self.tuning.as_mut() else {
            return Ok(());
        };
        let dir = session.checkpoint_dir(epoch)?;
        ckpt.save(&dir.join("checkpoint"))?;
        session.report(val_loss)
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Scores every test batch, writes the metric map into
    /// `evaluate_res_dir` and returns it.
    pub fn evaluate(&mut self, test_loader: &mut DataLoader) -> Result<BTreeMap<String, f64>> {
        info!("Start evaluating ...");
        self.model.set_training(false);
        self.evaluator.clear();
        let collected = self.collect_scores(test_loader);
        self.model.set_training(true);
        collected?;
        self.evaluator
            .save_result(&self.config.evaluate_res_dir, self.config.result_filename.as_deref())?;
        self.evaluator.evaluate()
    }

    fn collect_scores(&mut self, test_loader: &mut DataLoader) -> Result<()> {
        for batch in test_loader.batches() {
            let scores = self.model.forward(&batch)?;
            self.evaluator.collect(&EvalBatch {
                loc_true: batch.target,
                loc_pred: scores.data,
            })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    pub fn save_model(&self, path: &Path) -> Result<()> {
        info!("Saved model at {}", path.display());
        Checkpoint::capture(None, &self.model, self.optimizer.as_ref()).save(path)
    }

    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        info!("Loaded model at {}", path.display());
        Checkpoint::load(path)?.restore(&mut self.model, self.optimizer.as_mut())
    }

    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        epoch_checkpoint_path(&self.config.cache_dir, self.model.name(), &self.config.dataset, epoch)
    }

    pub fn save_model_with_epoch(&self, epoch: usize) -> Result<PathBuf> {
        let path = self.epoch_path(epoch);
        Checkpoint::capture(Some(epoch), &self.model, self.optimizer.as_ref()).save(&path)?;
        info!("Saved model at {}", epoch);
        Ok(path)
    }

    pub fn load_model_with_epoch(&mut self, epoch: usize) -> Result<()> {
        let path = self.epoch_path(epoch);
        if !path.exists() {
            return Err(Error::Model(format!("weights at epoch {} not found: {}", epoch, path.display())));
        }
        Checkpoint::load(&path)?.restore(&mut self.model, self.optimizer.as_mut())?;
        info!("Loaded model at {}", epoch);
        Ok(())
    }
}

fn build_scheduler(config: &TrainConfig, optimizer: &dyn Optimizer) -> Result<LrScheduler> {
    if config.lr_decay {
        LrScheduler::build(&config.lr_scheduler, optimizer)
    } else {
        Ok(LrScheduler::Constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batch::Sample;
    use crate::model::LocEmbedding;
    use crate::optim::scheduler::SchedulerConfig;

    fn cyclic(num_locations: usize, n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample { uid: 0, current_loc: i % num_locations, target: (i + 1) % num_locations })
            .collect()
    }

    fn config(dir: &Path, max_epoch: usize) -> TrainConfig {
        TrainConfig {
            learning_rate: 0.05,
            cache_dir: dir.join("model_cache"),
            evaluate_res_dir: dir.join("evaluate_cache"),
            result_filename: Some("result".into()),
            dataset: "cyclic".into(),
            ..TrainConfig::new(max_epoch)
        }
    }

    #[test]
    fn training_lowers_validation_loss_and_restores_best_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let model = LocEmbedding::new("LocEmbedding", 6, 8, 3);
        let mut exec = Executor::new(config(dir.path(), 15), model).unwrap();
        let mut train = DataLoader::new(cyclic(6, 60), 12, true, 1).unwrap();
        let mut eval = DataLoader::new(cyclic(6, 12), 6, false, 0).unwrap();

        let best = exec.train(&mut train, &mut eval).unwrap();
        let state = exec.run_state().unwrap().clone();
        assert_eq!(state.epochs_run(), 15);
        assert_eq!(state.min_val_loss, best);
        assert!(best < (6f64).ln());

        let best_epoch = state.best_epoch.unwrap();
        assert!(exec.epoch_path(best_epoch).exists());
        let saved = Checkpoint::load(&exec.epoch_path(best_epoch)).unwrap();
        assert_eq!(saved.model, exec.model().state());
    }

    #[test]
    fn cosine_warmup_drives_the_learning_rate_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            lr_decay: true,
            lr_scheduler: SchedulerConfig::CosineWarmup { d_model: 16, warmup_steps: 10, lr_mul: 1.0 },
            clip_grad_norm: true,
            saved_model: false,
            load_best_epoch: false,
            ..config(dir.path(), 2)
        };
        let model = LocEmbedding::new("LocEmbedding", 4, 4, 0);
        let mut exec = Executor::new(cfg, model).unwrap();
        let mut train = DataLoader::new(cyclic(4, 12), 4, false, 0).unwrap();
        let mut eval = DataLoader::new(cyclic(4, 4), 4, false, 0).unwrap();
        exec.train(&mut train, &mut eval).unwrap();

        // 2 epochs x 3 batches
        let LrScheduler::CosineWarmup(sched) = exec.scheduler() else {
            panic!("expected cosine warmup, got {}", exec.scheduler().name());
        };
        assert_eq!(sched.n_steps(), 6);
        assert_eq!(exec.optimizer().learning_rate(), sched.current_lr());
    }

    #[test]
    fn evaluate_writes_named_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 1);
        cfg.evaluator.metrics = vec!["Recall".into(), "MRR".into(), "NDCG".into()];
        let model = LocEmbedding::new("LocEmbedding", 5, 4, 9);
        let mut exec = Executor::new(cfg, model).unwrap();
        let mut test = DataLoader::new(cyclic(5, 10), 4, false, 0).unwrap();

        let result = exec.evaluate(&mut test).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.contains_key("Recall@1"));
        let path = dir.path().join("evaluate_cache").join("result.json");
        let on_disk: BTreeMap<String, f64> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(on_disk, result);
    }

    #[test]
    fn resume_requires_the_start_epoch_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { start_epoch: 2, ..config(dir.path(), 4) };
        let mut exec = Executor::new(cfg, LocEmbedding::new("LocEmbedding", 3, 2, 0)).unwrap();
        let mut train = DataLoader::new(cyclic(3, 6), 3, false, 0).unwrap();
        let mut eval = DataLoader::new(cyclic(3, 3), 3, false, 0).unwrap();
        assert!(matches!(exec.train(&mut train, &mut eval), Err(Error::Model(_))));

        exec.save_model_with_epoch(2).unwrap();
        exec.train(&mut train, &mut eval).unwrap();
        assert_eq!(exec.run_state().unwrap().epochs_run(), 2);
    }

    #[test]
    fn empty_loaders_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = Executor::new(config(dir.path(), 1), LocEmbedding::new("LocEmbedding", 3, 2, 0)).unwrap();
        let mut empty = DataLoader::new(Vec::new(), 2, false, 0).unwrap();
        let mut eval = DataLoader::new(cyclic(3, 3), 3, false, 0).unwrap();
        assert!(matches!(exec.train(&mut empty, &mut eval), Err(Error::Config(_))));
    }
}
