use crate::error::{Error, Result};

/// Per-batch contribution to the ranking accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopKStats {
    pub hit: usize,
    /// Sum of `1 / (pos + 1)` over hits, `pos` being the 0-based rank.
    pub rank: f64,
    /// Sum of `1 / log2(pos + 2)` over hits.
    pub dcg: f64,
}

/// Scores each row's top-`topk` candidates against its true location.
///
/// Candidates are ordered by descending score; equal scores keep the lower
/// index first. A NaN or infinite score has no rank, so the batch is
/// rejected with `Error::InvalidBatch`.
pub fn top_k(loc_pred: &[Vec<f64>], loc_true: &[usize], topk: usize) -> Result<TopKStats> {
    if loc_pred.len() != loc_true.len() {
        return Err(Error::InvalidBatch(format!(
            "{} score rows for {} targets",
            loc_pred.len(),
            loc_true.len()
        )));
    }

    let mut stats = TopKStats::default();
    for (scores, &target) in loc_pred.iter().zip(loc_true.iter()) {
        if topk > scores.len() {
            return Err(Error::InvalidBatch(format!(
                "topk {} exceeds the {} candidate scores of a row",
                topk,
                scores.len()
            )));
        }
        if let Some(idx) = scores.iter().position(|s| !s.is_finite()) {
            return Err(Error::InvalidBatch(format!(
                "non-finite score {} for location {}",
                scores[idx], idx
            )));
        }
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        if let Some(pos) = order[..topk].iter().position(|&idx| idx == target) {
            stats.hit += 1;
            stats.rank += 1.0 / (pos + 1) as f64;
            stats.dcg += 1.0 / ((pos + 2) as f64).log2();
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rank_and_dcg_depend_on_position() {
        let pred = vec![vec![0.1, 0.9, 0.5], vec![0.1, 0.9, 0.5], vec![0.1, 0.9, 0.5]];
        let stats = top_k(&pred, &[1, 2, 0], 2).unwrap();
        assert_eq!(stats.hit, 2);
        assert_relative_eq!(stats.rank, 1.0 + 0.5);
        assert_relative_eq!(stats.dcg, 1.0 + 1.0 / 3f64.log2());
    }

    #[test]
    fn ties_prefer_the_lower_index() {
        let stats = top_k(&[vec![0.5, 0.5]], &[0], 1).unwrap();
        assert_eq!(stats.hit, 1);
        let stats = top_k(&[vec![0.5, 0.5]], &[1], 1).unwrap();
        assert_eq!(stats.hit, 0);
    }

    #[test]
    fn topk_wider_than_candidates_is_rejected() {
        assert!(matches!(top_k(&[vec![1.0]], &[0], 2), Err(Error::InvalidBatch(_))));
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let mut row: Vec<f64> = (0..64).map(|i| i as f64 / 64.0).collect();
        row[7] = f64::NAN;
        row[40] = f64::NAN;
        assert!(matches!(top_k(&[row], &[3], 5), Err(Error::InvalidBatch(_))));
        assert!(matches!(top_k(&[vec![f64::NAN, 0.9, 0.1]], &[1], 1), Err(Error::InvalidBatch(_))));
        assert!(matches!(top_k(&[vec![0.2, f64::INFINITY]], &[0], 1), Err(Error::InvalidBatch(_))));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(top_k(&[vec![1.0]], &[0, 0], 1), Err(Error::InvalidBatch(_))));
    }
}
