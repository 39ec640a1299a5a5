mod classifier;
mod error;
mod gradient_check;
mod hyperparameters;
mod loss;
mod softmax;
mod utils;

pub use classifier::SoftmaxClassifier;
pub use error::{Result, SoftmaxError};
pub use gradient_check::{grad_check_sparse, numerical_gradient, relative_error, GradCheck};
pub use hyperparameters::{LossHyperparameters, Penalty, Regularization, Stabilization};
pub use loss::{loss_naive, loss_vectorized, SoftmaxLoss};
pub use softmax::{softmax, softmax_rows};
pub use utils::one_hot;
