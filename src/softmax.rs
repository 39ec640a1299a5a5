use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::hyperparameters::Stabilization;

pub fn max(values: ArrayView1<f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
}

/// Subtracts the stabilizing maximum from a batch of (N, C) scores.
pub fn shift_scores(scores: &Array2<f64>, stabilization: Stabilization) -> Array2<f64> {
    match stabilization {
        Stabilization::PerRow => {
            let row_max = scores.map_axis(Axis(1), max);
            scores - &row_max.insert_axis(Axis(1))
        }
        Stabilization::Global => {
            let global_max = scores.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            scores - global_max
        }
    }
}

/// Row-wise softmax of a score matrix. Each row sums to one.
pub fn softmax_rows(scores: &Array2<f64>, stabilization: Stabilization) -> Array2<f64> {
    let exp = shift_scores(scores, stabilization).mapv(f64::exp);
    let sums = exp.sum_axis(Axis(1)).insert_axis(Axis(1));
    exp / &sums
}

/// Softmax of a single score vector, shifted by its own maximum.
pub fn softmax(scores: ArrayView1<f64>) -> Array1<f64> {
    let m = max(scores);
    let exp = scores.mapv(|s| (s - m).exp());
    let sum = exp.sum();
    exp / sum
}

/// `ln(sum(exp(shifted)))` for scores that have already been shifted.
pub fn log_sum_exp(shifted: ArrayView1<f64>) -> f64 {
    shifted.mapv(f64::exp).sum().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(array![1.0, 2.0, 3.0].view());
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_handles_large_scores() {
        let p = softmax(array![1000.0, 1000.0].view());
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shift_scores_per_row_and_global() {
        let scores = array![[1.0, 3.0], [10.0, 4.0]];

        let per_row = shift_scores(&scores, Stabilization::PerRow);
        assert_eq!(per_row, array![[-2.0, 0.0], [0.0, -6.0]]);

        let global = shift_scores(&scores, Stabilization::Global);
        assert_eq!(global, array![[-9.0, -7.0], [0.0, -6.0]]);
    }

    #[test]
    fn test_global_shift_can_underflow() {
        let scores = array![[0.0, 0.0], [2000.0, 2000.0]];

        let global = softmax_rows(&scores, Stabilization::Global);
        assert!(global[[0, 0]].is_nan());

        let per_row = softmax_rows(&scores, Stabilization::PerRow);
        assert!((per_row[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_sum_exp() {
        let shifted = array![0.0, 0.0];
        assert!((log_sum_exp(shifted.view()) - 2.0f64.ln()).abs() < 1e-12);
    }
}
