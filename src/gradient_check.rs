use ndarray::Array2;
use rand::Rng;
use tracing::debug;

use crate::error::{Result, SoftmaxError};

/// Outcome of comparing one analytic gradient entry against a finite difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheck {
    pub index: (usize, usize),
    pub numerical: f64,
    pub analytic: f64,
    pub relative_error: f64,
}

/// `|a - b| / (|a| + |b|)`, zero when both are zero.
pub fn relative_error(a: f64, b: f64) -> f64 {
    let denom = a.abs() + b.abs();
    if denom == 0.0 {
        0.0
    } else {
        (a - b).abs() / denom
    }
}

fn centered_difference<F>(f: &mut F, perturbed: &mut Array2<f64>, index: (usize, usize), h: f64) -> Result<f64>
where
    F: FnMut(&Array2<f64>) -> Result<f64>,
{
    let original = perturbed[index];

    perturbed[index] = original + h;
    let plus = f(perturbed);
    perturbed[index] = original - h;
    let minus = f(perturbed);
    perturbed[index] = original;

    Ok((plus? - minus?) / (2.0 * h))
}

/// Centered finite-difference gradient of `f` at every entry of `weights`.
///
/// `f` is evaluated on a private copy; the caller's matrix is not touched.
pub fn numerical_gradient<F>(mut f: F, weights: &Array2<f64>, h: f64) -> Result<Array2<f64>>
where
    F: FnMut(&Array2<f64>) -> Result<f64>,
{
    let mut perturbed = weights.clone();
    let mut grad: Array2<f64> = Array2::zeros(weights.dim());

    for index in ndarray::indices(weights.dim()) {
        grad[index] = centered_difference(&mut f, &mut perturbed, index, h)?;
    }

    Ok(grad)
}

/// Checks `num_checks` randomly chosen entries of `analytic` against a
/// centered finite difference of `f`.
pub fn grad_check_sparse<F, R>(
    mut f: F,
    weights: &Array2<f64>,
    analytic: &Array2<f64>,
    num_checks: usize,
    h: f64,
    rng: &mut R,
) -> Result<Vec<GradCheck>>
where
    F: FnMut(&Array2<f64>) -> Result<f64>,
    R: Rng + ?Sized,
{
    if analytic.dim() != weights.dim() {
        return Err(SoftmaxError::ShapeMismatch {
            what: "analytic gradient",
            expected: weights.len(),
            actual: analytic.len(),
        });
    }
    let (rows, cols) = weights.dim();
    if rows == 0 || cols == 0 {
        return Ok(Vec::new());
    }

    let mut perturbed = weights.clone();
    let mut checks = Vec::with_capacity(num_checks);

    for _ in 0..num_checks {
        let index = (rng.random_range(0..rows), rng.random_range(0..cols));
        let numerical = centered_difference(&mut f, &mut perturbed, index, h)?;
        let analytic = analytic[index];
        let check = GradCheck {
            index,
            numerical,
            analytic,
            relative_error: relative_error(numerical, analytic),
        };
        debug!(
            "grad check {:?}: numerical {:.6e} analytic {:.6e}, relative error {:.3e}",
            check.index, check.numerical, check.analytic, check.relative_error
        );
        checks.push(check);
    }

    Ok(checks)
}
