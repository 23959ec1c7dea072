use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::evaluator::metric::Metric;
use crate::evaluator::top_k::top_k;

/// Evaluator settings: which metrics to report and the ranking cut-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    #[serde(default = "default_topk")]
    pub topk: usize,
}

fn default_metrics() -> Vec<String> {
    Metric::ALL.iter().map(|m| m.name().to_string()).collect()
}

fn default_topk() -> usize {
    1
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig { metrics: default_metrics(), topk: default_topk() }
    }
}

/// One batch of model output: a score row per example and its true location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalBatch {
    pub loc_true: Vec<usize>,
    pub loc_pred: Vec<Vec<f64>>,
}

/// Running sums across every batch collected since the last `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub total: usize,
    pub hit: usize,
    pub rank: f64,
    pub dcg: f64,
}

/// Streaming top-k evaluator for next-location prediction.
///
/// `collect` only ever adds to the accumulator, so batches may arrive in any
/// grouping; `evaluate` is a pure reduction over it. Call `clear` between
/// independent evaluation passes.
#[derive(Debug, Clone)]
pub struct TrajLocPredEvaluator {
    metrics: Vec<Metric>,
    topk: usize,
    result: BTreeMap<String, f64>,
    acc: Accumulator,
}

impl TrajLocPredEvaluator {
    pub fn new(config: &EvaluatorConfig) -> Result<TrajLocPredEvaluator> {
        let metrics = config
            .metrics
            .iter()
            .map(|name| name.parse::<Metric>())
            .collect::<Result<Vec<_>>>()?;
        if config.topk == 0 {
            return Err(Error::Config("evaluator topk must be at least 1".into()));
        }
        Ok(TrajLocPredEvaluator {
            metrics,
            topk: config.topk,
            result: BTreeMap::new(),
            acc: Accumulator::default(),
        })
    }

    /// Builds the evaluator from untyped JSON config, where `metrics` must be
    /// a list of metric names.
    pub fn from_json(config: &Value) -> Result<TrajLocPredEvaluator> {
        let metrics = match config.get("metrics") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::Config(format!("metric name {item} is not a string")))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(Error::Config(format!("evaluator metrics is not a list: {other}"))),
            None => default_metrics(),
        };
        let topk = match config.get("topk") {
            Some(v) => v
                .as_u64()
                .ok_or_else(|| Error::Config(format!("evaluator topk is not a non-negative integer: {v}")))?
                as usize,
            None => default_topk(),
        };
        TrajLocPredEvaluator::new(&EvaluatorConfig { metrics, topk })
    }

    pub fn topk(&self) -> usize {
        self.topk
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.acc
    }

    pub fn collect(&mut self, batch: &EvalBatch) -> Result<()> {
        let stats = top_k(&batch.loc_pred, &batch.loc_true, self.topk)?;
        self.acc.total += batch.loc_true.len();
        self.acc.hit += stats.hit;
        self.acc.rank += stats.rank;
        self.acc.dcg += stats.dcg;
        Ok(())
    }

    /// Untyped variant of `collect`: `batch` must be an object holding
    /// `loc_true` and `loc_pred`.
    pub fn collect_json(&mut self, batch: &Value) -> Result<()> {
        let obj = batch
            .as_object()
            .ok_or_else(|| Error::InvalidBatch("evaluator.collect input is not a map".into()))?;
        for key in ["loc_true", "loc_pred"] {
            if !obj.contains_key(key) {
                return Err(Error::InvalidBatch(format!("missing `{key}`")));
            }
        }
        let batch: EvalBatch =
            serde_json::from_value(batch.clone()).map_err(|e| Error::InvalidBatch(e.to_string()))?;
        self.collect(&batch)
    }

    /// Reduces the accumulator to the configured metrics. Recall is always
    /// reported since the executor validates on it.
    ///
    /// MAP@k uses the reciprocal-rank sum, the same value as MRR@k; with a
    /// single relevant location per query the two only coincide by
    /// construction, so treat MAP@k as MRR@k until per-query average
    /// precision is implemented.
    pub fn evaluate(&mut self) -> Result<BTreeMap<String, f64>> {
        let k = self.topk;
        let acc = self.acc;
        if acc.total == 0 {
            return Err(Error::DivisionByZero("ranking metrics over zero collected examples".into()));
        }
        let total = acc.total as f64;
        let hit = acc.hit as f64;
        let wants = |m: Metric| self.metrics.contains(&m);

        let mut result = BTreeMap::new();
        let precision = hit / (total * k as f64);
        let recall = hit / total;
        if wants(Metric::Precision) || wants(Metric::F1) {
            result.insert(Metric::Precision.key(k), precision);
        }
        result.insert(Metric::Recall.key(k), recall);
        if wants(Metric::F1) {
            if precision + recall == 0.0 {
                return Err(Error::DivisionByZero(format!("{} with zero precision and recall", Metric::F1.key(k))));
            }
            result.insert(Metric::F1.key(k), 2.0 * precision * recall / (precision + recall));
        }
        if wants(Metric::MRR) {
            result.insert(Metric::MRR.key(k), acc.rank / total);
        }
        if wants(Metric::MAP) {
            result.insert(Metric::MAP.key(k), acc.rank / total);
        }
        if wants(Metric::NDCG) {
            result.insert(Metric::NDCG.key(k), acc.dcg / total);
        }

        self.result = result.clone();
        Ok(result)
    }

    /// Evaluates and writes the result map as `<dir>/<filename>.json`.
    ///
    /// Without a filename the local time `%Y_%m_%d_%H_%M_%S` is used, so
    /// repeated calls may write different files.
    pub fn save_result(&mut self, save_path: impl AsRef<Path>, filename: Option<&str>) -> Result<PathBuf> {
        self.evaluate()?;
        let dir = save_path.as_ref();
        std::fs::create_dir_all(dir)?;
        let stem = match filename {
            Some(name) => name.to_string(),
            None => chrono::Local::now().format("%Y_%m_%d_%H_%M_%S").to_string(),
        };
        info!("evaluate result is {}", serde_json::to_string_pretty(&self.result)?);

        let path = dir.join(format!("{stem}.json"));
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &self.result)?;
        Ok(path)
    }

    pub fn clear(&mut self) {
        self.result.clear();
        self.acc = Accumulator::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn evaluator(metrics: &[&str], topk: usize) -> TrajLocPredEvaluator {
        TrajLocPredEvaluator::new(&EvaluatorConfig {
            metrics: metrics.iter().map(|s| s.to_string()).collect(),
            topk,
        })
        .unwrap()
    }

    fn batch(loc_true: Vec<usize>, loc_pred: Vec<Vec<f64>>) -> EvalBatch {
        EvalBatch { loc_true, loc_pred }
    }

    #[test]
    fn recall_and_ndcg_at_one() {
        let mut ev = evaluator(&["Recall", "NDCG"], 1);
        ev.collect(&batch(
            vec![0, 1, 2],
            vec![vec![0.9, 0.1, 0.0], vec![0.2, 0.7, 0.1], vec![0.6, 0.3, 0.1]],
        ))
        .unwrap();
        let result = ev.evaluate().unwrap();
        assert_relative_eq!(result["Recall@1"], 2.0 / 3.0);
        // Each top-1 hit contributes 1 / log2(2) = 1.
        assert_relative_eq!(result["NDCG@1"], 2.0 / 3.0);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn recall_is_reported_even_when_not_requested() {
        let mut ev = evaluator(&["MRR"], 2);
        ev.collect(&batch(vec![1], vec![vec![0.9, 0.5, 0.1]])).unwrap();
        let result = ev.evaluate().unwrap();
        assert_relative_eq!(result["Recall@2"], 1.0);
        assert_relative_eq!(result["MRR@2"], 0.5);
        assert!(!result.contains_key("Precision@2"));
    }

    #[test]
    fn precision_f1_and_map() {
        let mut ev = evaluator(&["F1", "MAP"], 2);
        ev.collect(&batch(vec![1, 0], vec![vec![0.9, 0.5, 0.1], vec![0.1, 0.2, 0.3]])).unwrap();
        let result = ev.evaluate().unwrap();
        let precision = 1.0 / 4.0;
        let recall = 1.0 / 2.0;
        assert_relative_eq!(result["Precision@2"], precision);
        assert_relative_eq!(result["F1@2"], 2.0 * precision * recall / (precision + recall));
        assert_relative_eq!(result["MAP@2"], 0.25);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let mut ev = evaluator(&["Precision", "Recall", "MRR", "NDCG"], 2);
        ev.collect(&batch(vec![0, 2], vec![vec![0.3, 0.4, 0.1], vec![0.1, 0.2, 0.9]])).unwrap();
        let first = ev.evaluate().unwrap();
        let second = ev.evaluate().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn split_batches_match_one_concatenated_batch() {
        let b1 = batch(vec![0, 2], vec![vec![0.3, 0.4, 0.1], vec![0.1, 0.2, 0.9]]);
        let b2 = batch(vec![1], vec![vec![0.5, 0.4, 0.6]]);
        let joined = batch(
            b1.loc_true.iter().chain(b2.loc_true.iter()).copied().collect(),
            b1.loc_pred.iter().chain(b2.loc_pred.iter()).cloned().collect(),
        );

        let mut split = evaluator(&["Precision", "Recall", "MRR", "NDCG"], 2);
        split.collect(&b2).unwrap();
        split.collect(&b1).unwrap();
        let mut whole = evaluator(&["Precision", "Recall", "MRR", "NDCG"], 2);
        whole.collect(&joined).unwrap();

        let (a, b) = (split.evaluate().unwrap(), whole.evaluate().unwrap());
        for (key, value) in &a {
            assert_relative_eq!(*value, b[key], max_relative = 1e-12);
        }
    }

    #[test]
    fn evaluate_after_clear_is_an_error() {
        let mut ev = evaluator(&["Recall"], 1);
        ev.collect(&batch(vec![0], vec![vec![1.0, 0.0]])).unwrap();
        ev.clear();
        assert_eq!(ev.accumulator(), &Accumulator::default());
        assert!(matches!(ev.evaluate(), Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn f1_without_hits_is_a_division_error() {
        let mut ev = evaluator(&["F1"], 1);
        ev.collect(&batch(vec![1], vec![vec![1.0, 0.0]])).unwrap();
        assert!(matches!(ev.evaluate(), Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn unknown_metric_fails_construction() {
        let err = TrajLocPredEvaluator::new(&EvaluatorConfig {
            metrics: vec!["Recall".into(), "Accuracy".into()],
            topk: 1,
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnknownMetric(name) if name == "Accuracy"));
    }

    #[test]
    fn json_config_must_hold_a_metric_list() {
        assert!(matches!(
            TrajLocPredEvaluator::from_json(&json!({"metrics": "Recall", "topk": 1})),
            Err(Error::Config(_))
        ));
        let ev = TrajLocPredEvaluator::from_json(&json!({"metrics": ["Recall"], "topk": 5})).unwrap();
        assert_eq!(ev.topk(), 5);
    }

    #[test]
    fn collect_json_rejects_non_maps_and_missing_keys() {
        let mut ev = evaluator(&["Recall"], 1);
        assert!(matches!(ev.collect_json(&json!([1, 2])), Err(Error::InvalidBatch(_))));
        assert!(matches!(ev.collect_json(&json!({"loc_true": [0]})), Err(Error::InvalidBatch(_))));
        ev.collect_json(&json!({"loc_true": [0], "loc_pred": [[0.9, 0.1]]})).unwrap();
        assert_eq!(ev.accumulator().hit, 1);
    }

    #[test]
    fn save_result_writes_named_and_timestamped_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("results");
        let mut ev = evaluator(&["Recall"], 1);
        ev.collect(&batch(vec![0], vec![vec![0.9, 0.1]])).unwrap();

        let named = ev.save_result(&out, Some("run")).unwrap();
        assert_eq!(named, out.join("run.json"));
        let saved: BTreeMap<String, f64> =
            serde_json::from_str(&std::fs::read_to_string(&named).unwrap()).unwrap();
        assert_eq!(saved["Recall@1"], 1.0);

        let stamped = ev.save_result(&out, None).unwrap();
        let stem = stamped.file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem.len(), "2024_01_01_00_00_00".len());
        assert_eq!(stem.matches('_').count(), 5);
    }
}
