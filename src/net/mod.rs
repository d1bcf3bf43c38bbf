pub mod dense;
pub mod trainer;

pub use dense::{DenseNet, DerivativeCache, NetError};
pub use trainer::{Hyper, Trainer};
