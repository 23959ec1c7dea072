use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Softmax cross-entropy over location logits with integer targets.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

/// Row-wise softmax, shifted by the row maximum for numerical stability.
pub fn softmax_rows(logits: &Matrix) -> Matrix {
    let data = logits
        .data
        .iter()
        .map(|row| {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / sum).collect()
        })
        .collect();
    Matrix::from_data(data)
}

impl CrossEntropyLoss {
    /// Mean over the batch of `-log(softmax(logits)[target])`.
    pub fn loss(logits: &Matrix, targets: &[usize]) -> Result<f64> {
        Self::check(logits, targets)?;
        let probs = softmax_rows(logits);
        Ok(Self::mean_nll(&probs, targets))
    }

    /// Loss plus ∂L/∂logits.
    ///
    /// With softmax and cross-entropy composed the gradient simplifies to
    /// `(p - onehot(target)) / N`.
    pub fn loss_and_grad(logits: &Matrix, targets: &[usize]) -> Result<(f64, Matrix)> {
        Self::check(logits, targets)?;
        let probs = softmax_rows(logits);
        let loss = Self::mean_nll(&probs, targets);

        let n = targets.len() as f64;
        let mut grad = probs;
        for (row, &t) in grad.data.iter_mut().zip(targets.iter()) {
            row[t] -= 1.0;
            row.iter_mut().for_each(|g| *g /= n);
        }
        Ok((loss, grad))
    }

    fn mean_nll(probs: &Matrix, targets: &[usize]) -> f64 {
        let total: f64 = probs
            .data
            .iter()
            .zip(targets.iter())
            .map(|(row, &t)| -(row[t] + EPS).ln())
            .sum();
        total / targets.len() as f64
    }

    fn check(logits: &Matrix, targets: &[usize]) -> Result<()> {
        if targets.is_empty() {
            return Err(Error::Shape("cross-entropy over an empty batch".into()));
        }
        if logits.rows != targets.len() {
            return Err(Error::Shape(format!(
                "{} logit rows for {} targets",
                logits.rows,
                targets.len()
            )));
        }
        if let Some(&t) = targets.iter().find(|&&t| t >= logits.cols) {
            return Err(Error::Shape(format!("target {t} out of range for {} classes", logits.cols)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let logits = Matrix::zeros(2, 4);
        let loss = CrossEntropyLoss::loss(&logits, &[0, 3]).unwrap();
        assert_abs_diff_eq!(loss, 4f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let logits = Matrix::from_data(vec![vec![1.0, -2.0, 0.5], vec![0.0, 3.0, 1.0]]);
        let (_, grad) = CrossEntropyLoss::loss_and_grad(&logits, &[2, 1]).unwrap();
        for row in &grad.data {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        }
        assert!(grad.data[0][2] < 0.0);
    }

    #[test]
    fn softmax_survives_large_logits() {
        let probs = softmax_rows(&Matrix::row_vector(vec![1000.0, 1000.0]));
        assert_abs_diff_eq!(probs.data[0][0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn target_out_of_range_is_rejected() {
        let logits = Matrix::zeros(1, 2);
        assert!(matches!(CrossEntropyLoss::loss(&logits, &[2]), Err(Error::Shape(_))));
    }
}
