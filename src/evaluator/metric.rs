use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Ranking metrics the trajectory evaluator can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Precision,
    Recall,
    F1,
    /// Mean reciprocal rank of the target within the top-k.
    MRR,
    /// Currently computed with the MRR formula (see `TrajLocPredEvaluator::evaluate`).
    MAP,
    NDCG,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Precision,
        Metric::Recall,
        Metric::F1,
        Metric::MRR,
        Metric::MAP,
        Metric::NDCG,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Precision => "Precision",
            Metric::Recall => "Recall",
            Metric::F1 => "F1",
            Metric::MRR => "MRR",
            Metric::MAP => "MAP",
            Metric::NDCG => "NDCG",
        }
    }

    /// Result-map key, e.g. `Recall@10`.
    pub fn key(&self, topk: usize) -> String {
        format!("{}@{}", self.name(), topk)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::UnknownMetric(s.to_string()))
    }
}
