use ndarray::Array2;

use crate::error::{Result, SoftmaxError};

/// How the regularization strength enters the loss and the gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    /// `coefficient * reg * sum(W^2)` in the loss, `2 * coefficient * reg * W` in the gradient.
    L2 { coefficient: f64 },
    /// `0.5 * reg * sum(W^2)` in the loss but `2 * reg * W` in the gradient.
    /// The two terms disagree by a factor of four.
    HalfLossFullGrad,
    /// `reg * sum(W^2)` in the loss with no gradient term at all.
    LossOnly,
}

impl Default for Penalty {
    fn default() -> Self {
        Penalty::L2 { coefficient: 1.0 }
    }
}

/// Regularization strength paired with the convention that applies it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Regularization {
    pub strength: f64,
    pub penalty: Penalty,
}

impl Regularization {
    pub fn new(strength: f64, penalty: Penalty) -> Self {
        Regularization { strength, penalty }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.strength.is_finite() || self.strength < 0.0 {
            return Err(SoftmaxError::InvalidRegularization(self.strength));
        }
        Ok(())
    }

    /// Penalty added to the data loss.
    pub fn loss(&self, weights: &Array2<f64>) -> f64 {
        let coefficient = match self.penalty {
            Penalty::L2 { coefficient } => coefficient,
            Penalty::HalfLossFullGrad => 0.5,
            Penalty::LossOnly => 1.0,
        };
        coefficient * self.strength * weights.mapv(|w| w * w).sum()
    }

    /// Adds the penalty's gradient into `grad` in place.
    pub fn accumulate_gradient(&self, weights: &Array2<f64>, grad: &mut Array2<f64>) {
        let scale = match self.penalty {
            Penalty::L2 { coefficient } => 2.0 * coefficient * self.strength,
            Penalty::HalfLossFullGrad => 2.0 * self.strength,
            Penalty::LossOnly => return,
        };
        grad.scaled_add(scale, weights);
    }
}

impl From<f64> for Regularization {
    fn from(strength: f64) -> Self {
        Regularization { strength, penalty: Penalty::default() }
    }
}

/// Which maximum is subtracted from the scores before exponentiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stabilization {
    /// Each example subtracts its own maximum score.
    #[default]
    PerRow,
    /// One maximum over the whole batch. Rows far below it can underflow to zero.
    Global,
}

/// Hyperparameters for a single softmax loss evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LossHyperparameters {
    /// Regularization strength and convention
    pub regularization: Regularization,

    /// Score shift applied before exponentiating
    pub stabilization: Stabilization,
}

impl LossHyperparameters {
    pub fn new(regularization: Regularization, stabilization: Stabilization) -> Self {
        LossHyperparameters { regularization, stabilization }
    }

    /// Reproduces the explicit-loop penalty: half in the loss, full in the gradient.
    ///
    /// The loop it mirrors exponentiated raw scores with no max shift. This
    /// preset still shifts by each row's max, so it matches that loop wherever
    /// the unshifted loop did not overflow.
    pub fn legacy_naive(reg: f64) -> Self {
        LossHyperparameters {
            regularization: Regularization::new(reg, Penalty::HalfLossFullGrad),
            stabilization: Stabilization::PerRow,
        }
    }

    /// Reproduces the batched behavior: penalty in the loss only, one global max shift.
    pub fn legacy_vectorized(reg: f64) -> Self {
        LossHyperparameters {
            regularization: Regularization::new(reg, Penalty::LossOnly),
            stabilization: Stabilization::Global,
        }
    }

    pub fn with_stabilization(mut self, stabilization: Stabilization) -> Self {
        self.stabilization = stabilization;
        self
    }
}

impl From<f64> for LossHyperparameters {
    fn from(reg: f64) -> Self {
        LossHyperparameters {
            regularization: Regularization::from(reg),
            stabilization: Stabilization::default(),
        }
    }
}

impl From<Regularization> for LossHyperparameters {
    fn from(regularization: Regularization) -> Self {
        LossHyperparameters {
            regularization,
            stabilization: Stabilization::default(),
        }
    }
}
