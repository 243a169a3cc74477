pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod train;
pub mod data;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::{FeedforwardNetwork, ForwardPass, Gradients, Initialization};
pub use loss::mae::MaeLoss;
pub use data::{decode, image_to_row_matrix, label_to_one_hot, Dataset, LabeledImage};
pub use train::{run_epoch, train, EpochStats, TrainConfig};
pub use error::{Error, Result};
