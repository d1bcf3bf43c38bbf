pub mod activation;
pub mod f;
pub mod net;
pub mod twister;

pub use activation::{Activation, Activations};
pub use net::dense::{DenseNet, DerivativeCache, NetError};
pub use net::trainer::{Hyper, Trainer};
pub use twister::Twister64;

pub type Dataset = (Vec<Vec<f64>>, Vec<Vec<f64>>);
