pub mod network;

pub use network::{FeedforwardNetwork, ForwardPass, Gradients, Initialization};
