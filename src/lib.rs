//! Digit classifier built on a from-scratch feedforward network.
//!
//! - [`feedforward`]: matrices, the sigmoid network, backpropagation trainer and evaluation
//! - [`data`]: labeled sample sets and the CSV loader
//! - [`config`]: network and training parameters
//!
//! Python bindings are available behind the `python` feature.

pub mod config;
pub mod data;
pub mod feedforward;

#[cfg(feature = "python")]
mod python_ffi;
