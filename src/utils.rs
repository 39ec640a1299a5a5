use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{Result, SoftmaxError};

/// Batch dimensions: examples, features, classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    pub examples: usize,
    pub features: usize,
    pub classes: usize,
}

/// Checks that `weights` (D, C), `inputs` (N, D) and `labels` (N) line up
/// and that every label is a valid class index.
pub fn validate_inputs(
    weights: &Array2<f64>,
    inputs: &Array2<f64>,
    labels: &Array1<usize>,
) -> Result<Dims> {
    let (features, classes) = weights.dim();
    let (examples, input_features) = inputs.dim();

    if input_features != features {
        return Err(SoftmaxError::ShapeMismatch {
            what: "input features",
            expected: features,
            actual: input_features,
        });
    }
    if labels.len() != examples {
        return Err(SoftmaxError::ShapeMismatch {
            what: "labels",
            expected: examples,
            actual: labels.len(),
        });
    }
    if examples == 0 {
        return Err(SoftmaxError::EmptyBatch);
    }
    if let Some((index, &label)) = labels.iter().enumerate().find(|(_, &l)| l >= classes) {
        return Err(SoftmaxError::InvalidLabel { index, label, classes });
    }

    Ok(Dims { examples, features, classes })
}

/// (N, C) indicator matrix with a single 1.0 per row at the label's column.
pub fn one_hot(labels: &Array1<usize>, classes: usize) -> Array2<f64> {
    Array2::from_shape_fn((labels.len(), classes), |(i, c)| {
        if labels[i] == c { 1.0 } else { 0.0 }
    })
}

pub fn outer_product(column: ArrayView1<f64>, row: ArrayView1<f64>) -> Array2<f64> {
    let a = column.insert_axis(Axis(1));
    let b = row.insert_axis(Axis(0));

    a.dot(&b)
}
