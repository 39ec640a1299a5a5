use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

use crate::error::{Result, SoftmaxError};
use crate::hyperparameters::{LossHyperparameters, Stabilization};
use crate::softmax::{log_sum_exp, max, shift_scores};
use crate::utils::{one_hot, outer_product, validate_inputs, Dims};

/// Selects which of the two softmax loss implementations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftmaxLoss {
    Naive,
    #[default]
    Vectorized,
}

impl SoftmaxLoss {
    pub fn compute(
        &self,
        weights: &Array2<f64>,
        inputs: &Array2<f64>,
        labels: &Array1<usize>,
        params: impl Into<LossHyperparameters>,
    ) -> Result<(f64, Array2<f64>)> {
        match self {
            SoftmaxLoss::Naive => loss_naive(weights, inputs, labels, params),
            SoftmaxLoss::Vectorized => loss_vectorized(weights, inputs, labels, params),
        }
    }
}

/// Softmax loss and gradient computed one example at a time.
///
/// # Arguments
///
/// * `weights` - (D, C) weight matrix
/// * `inputs` - (N, D) minibatch, one example per row
/// * `labels` - N class indices, each below C
/// * `params` - regularization strength, or full `LossHyperparameters`
///
/// # Returns
///
/// The mean data loss plus the penalty, and a fresh (D, C) gradient.
pub fn loss_naive(
    weights: &Array2<f64>,
    inputs: &Array2<f64>,
    labels: &Array1<usize>,
    params: impl Into<LossHyperparameters>,
) -> Result<(f64, Array2<f64>)> {
    let params = params.into();
    params.regularization.validate()?;
    let dims = validate_inputs(weights, inputs, labels)?;
    log_entry("naive", dims, &params);

    // Global stabilization needs every score before the first exponential.
    let global_max = match params.stabilization {
        Stabilization::PerRow => None,
        Stabilization::Global => Some(
            inputs
                .outer_iter()
                .map(|x| max(x.dot(weights).view()))
                .fold(f64::NEG_INFINITY, f64::max),
        ),
    };

    let mut loss = 0.0;
    let mut grad: Array2<f64> = Array2::zeros(weights.dim());

    for (index, (x, &label)) in inputs.outer_iter().zip(labels.iter()).enumerate() {
        let scores = x.dot(weights);
        let shift = global_max.unwrap_or_else(|| max(scores.view()));
        let shifted = scores.mapv(|s| s - shift);

        let lse = log_sum_exp(shifted.view());
        if lse == f64::NEG_INFINITY {
            return Err(underflow(index));
        }
        loss += lse - shifted[label];

        let mut dscores = shifted.mapv(|s| (s - lse).exp());
        dscores[label] -= 1.0;
        grad += &outer_product(x, dscores.view());
    }

    let n = dims.examples as f64;
    loss /= n;
    grad /= n;

    loss += params.regularization.loss(weights);
    params.regularization.accumulate_gradient(weights, &mut grad);

    check_finite(loss, &grad);
    Ok((loss, grad))
}

/// Softmax loss and gradient computed with batched matrix operations.
///
/// Same arguments and results as [`loss_naive`].
pub fn loss_vectorized(
    weights: &Array2<f64>,
    inputs: &Array2<f64>,
    labels: &Array1<usize>,
    params: impl Into<LossHyperparameters>,
) -> Result<(f64, Array2<f64>)> {
    let params = params.into();
    params.regularization.validate()?;
    let dims = validate_inputs(weights, inputs, labels)?;
    log_entry("vectorized", dims, &params);

    let n = dims.examples as f64;
    let targets = one_hot(labels, dims.classes);

    // (N, C)
    let shifted = shift_scores(&inputs.dot(weights), params.stabilization);
    let lse = shifted.mapv(f64::exp).sum_axis(Axis(1)).mapv(f64::ln);
    if let Some(index) = lse.iter().position(|&l| l == f64::NEG_INFINITY) {
        return Err(underflow(index));
    }
    let correct = (&shifted * &targets).sum_axis(Axis(1));

    let mut loss = (&lse - &correct).sum() / n;
    loss += params.regularization.loss(weights);

    let probs = (&shifted - &lse.insert_axis(Axis(1))).mapv(f64::exp);
    let mut grad = inputs.t().dot(&(probs - &targets)) / n;
    params.regularization.accumulate_gradient(weights, &mut grad);

    check_finite(loss, &grad);
    Ok((loss, grad))
}

fn log_entry(path: &str, dims: Dims, params: &LossHyperparameters) {
    debug!(
        "softmax loss ({}): N={} D={} C={} reg={} penalty={:?} stabilization={:?}",
        path,
        dims.examples,
        dims.features,
        dims.classes,
        params.regularization.strength,
        params.regularization.penalty,
        params.stabilization,
    );
}

// Every exponential in a row rounded to zero, so the row has no distribution.
fn underflow(index: usize) -> SoftmaxError {
    warn!("softmax scores of example {} underflowed; use per-row stabilization", index);
    SoftmaxError::Underflow { index }
}

fn count_non_finite(values: &Array2<f64>) -> usize {
    values.iter().filter(|v| !v.is_finite()).count()
}

fn check_finite(loss: f64, grad: &Array2<f64>) {
    if !loss.is_finite() {
        warn!("softmax loss is not finite ({})", loss);
    }
    let bad = count_non_finite(grad);
    if bad > 0 {
        warn!("softmax gradient has {} non-finite entries", bad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparameters::{Penalty, Regularization};
    use ndarray::array;

    fn assert_close(a: f64, b: f64, tol: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() / scale < tol, "{} vs {}", a, b);
    }

    fn fixture() -> (Array2<f64>, Array2<f64>, Array1<usize>) {
        let w = array![[0.2, -0.5, 0.1], [1.5, 1.3, 2.1], [0.0, 0.25, 0.2], [-0.3, 0.4, -1.0]];
        let x = array![[1.0, 2.0, -1.0, 0.5], [0.3, -0.7, 2.0, 1.1]];
        let y = array![2, 0];
        (w, x, y)
    }

    #[test]
    fn test_identity_scenario() {
        let w = array![[1.0, 0.0], [0.0, 1.0]];
        let x = array![[1.0, 0.0]];
        let y = array![0];
        let e = 1.0f64.exp();
        let expected = -(e / (e + 1.0)).ln();

        let (loss_n, _) = loss_naive(&w, &x, &y, 0.0).unwrap();
        let (loss_v, _) = loss_vectorized(&w, &x, &y, 0.0).unwrap();
        assert_close(loss_n, expected, 1e-12);
        assert_close(loss_v, expected, 1e-12);
    }

    #[test]
    fn test_naive_matches_vectorized() {
        let (w, x, y) = fixture();
        let (loss_n, grad_n) = loss_naive(&w, &x, &y, 0.1).unwrap();
        let (loss_v, grad_v) = loss_vectorized(&w, &x, &y, 0.1).unwrap();

        assert_close(loss_n, loss_v, 1e-10);
        for (a, b) in grad_n.iter().zip(grad_v.iter()) {
            assert_close(*a, *b, 1e-10);
        }
    }

    #[test]
    fn test_gradient_rows_sum_to_zero_without_regularization() {
        // Without regularization each row of dW sums to zero since the
        // softmax residual sums to zero per example.
        let (w, x, y) = fixture();
        let (_, grad) = loss_vectorized(&w, &x, &y, 0.0).unwrap();
        for row in grad.outer_iter() {
            assert!(row.sum().abs() < 1e-12);
        }
    }

    #[test]
    fn test_dispatch() {
        let (w, x, y) = fixture();
        let params = LossHyperparameters::from(Regularization::new(0.2, Penalty::L2 { coefficient: 0.5 }));
        let (a, _) = SoftmaxLoss::Naive.compute(&w, &x, &y, params).unwrap();
        let (b, _) = SoftmaxLoss::Vectorized.compute(&w, &x, &y, params).unwrap();
        assert_close(a, b, 1e-10);
    }

    #[test]
    fn test_nan_input_yields_non_finite_gradient() {
        let (w, mut x, y) = fixture();
        x[[1, 2]] = f64::NAN;

        let (loss, grad) = loss_vectorized(&w, &x, &y, 0.0).unwrap();
        assert!(loss.is_nan());
        // One NaN feature poisons that example's residual row, which feeds every entry.
        assert_eq!(count_non_finite(&grad), grad.len());

        let (_, clean) = loss_vectorized(&w, &fixture().1, &y, 0.0).unwrap();
        assert_eq!(count_non_finite(&clean), 0);
    }

    #[test]
    fn test_global_underflow_is_an_error() {
        let w = array![[1.0, 0.0], [0.0, 1.0]];
        let x = array![[0.0, 0.0], [2000.0, 2000.0]];
        let y = array![0, 1];
        let params = LossHyperparameters::legacy_vectorized(0.0);

        assert_eq!(loss_naive(&w, &x, &y, params), Err(SoftmaxError::Underflow { index: 0 }));
        assert_eq!(loss_vectorized(&w, &x, &y, params), Err(SoftmaxError::Underflow { index: 0 }));
    }

    #[test]
    fn test_negative_regularization_rejected() {
        let (w, x, y) = fixture();
        assert!(loss_naive(&w, &x, &y, -0.5).is_err());
        assert!(loss_vectorized(&w, &x, &y, -0.5).is_err());
    }
}
