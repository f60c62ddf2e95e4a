//! Feedforward neural network with backpropagation-based gradient descent training

mod evaluator;
mod matrix;
mod net;
mod trainer;

pub use evaluator::*;
pub use matrix::*;
pub use net::*;
pub use trainer::*;
