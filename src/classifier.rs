use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::error::{Result, SoftmaxError};
use crate::hyperparameters::{LossHyperparameters, Stabilization};
use crate::loss::SoftmaxLoss;
use crate::softmax::softmax_rows;

/// Linear classifier scored with the softmax loss
///
/// Feature and class counts are read off `weights`, so reassigning it
/// reshapes the classifier.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    pub weights: Array2<f64>,
    pub implementation: SoftmaxLoss,
}

impl SoftmaxClassifier {
    /// Constructs a classifier with weights drawn from `Normal(0, std)`
    ///
    /// # Arguments
    ///
    /// * `features` - Number of input features (D)
    /// * `classes` - Number of output classes (C)
    /// * `std` - Standard deviation of the initial weights
    /// * `implementation` - Which loss implementation `loss` runs
    pub fn new(features: usize, classes: usize, std: f64, implementation: SoftmaxLoss) -> Result<Self> {
        Self::with_rng(features, classes, std, implementation, &mut rand::rng())
    }

    /// Same as [`SoftmaxClassifier::new`] with a caller-supplied generator.
    pub fn with_rng<R: Rng + ?Sized>(
        features: usize,
        classes: usize,
        std: f64,
        implementation: SoftmaxLoss,
        rng: &mut R,
    ) -> Result<Self> {
        if features == 0 || classes == 0 {
            return Err(SoftmaxError::InvalidDimension(format!(
                "classifier needs at least one feature and one class, got {}x{}",
                features, classes
            )));
        }
        if !std.is_finite() || std <= 0.0 {
            return Err(SoftmaxError::InvalidDimension(format!(
                "weight std must be finite and positive, got {}",
                std
            )));
        }
        let normal_dist = Normal::new(0.0, std)
            .map_err(|e| SoftmaxError::InvalidDimension(e.to_string()))?;

        let weights = Array2::from_shape_fn((features, classes), |_| normal_dist.sample(rng));
        info!("Initialized softmax classifier: {} features -> {} classes", features, classes);

        Ok(SoftmaxClassifier {
            weights,
            implementation,
        })
    }

    pub fn from_weights(weights: Array2<f64>, implementation: SoftmaxLoss) -> Self {
        SoftmaxClassifier {
            weights,
            implementation,
        }
    }

    pub fn features(&self) -> usize {
        self.weights.nrows()
    }

    pub fn classes(&self) -> usize {
        self.weights.ncols()
    }

    /// Loss and weight gradient on a labelled minibatch
    pub fn loss(
        &self,
        inputs: &Array2<f64>,
        labels: &Array1<usize>,
        params: impl Into<LossHyperparameters>,
    ) -> Result<(f64, Array2<f64>)> {
        self.implementation.compute(&self.weights, inputs, labels, params)
    }

    /// Raw class scores, (N, C)
    pub fn scores(&self, inputs: &Array2<f64>) -> Result<Array2<f64>> {
        if inputs.ncols() != self.features() {
            return Err(SoftmaxError::ShapeMismatch {
                what: "input features",
                expected: self.features(),
                actual: inputs.ncols(),
            });
        }
        Ok(inputs.dot(&self.weights))
    }

    pub fn probabilities(&self, inputs: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(softmax_rows(&self.scores(inputs)?, Stabilization::PerRow))
    }

    /// Index of the highest score per example; ties go to the lowest class.
    pub fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<usize>> {
        let scores = self.scores(inputs)?;
        Ok(scores.map_axis(Axis(1), |row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (c, &s)| if s > best.1 { (c, s) } else { best })
                .0
        }))
    }
}
