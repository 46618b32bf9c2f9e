//! Convnet
//!
//! A minimal convolutional neural network engine: a composable stack of
//! layers that transforms a multi-channel 2D input volume into feature maps
//! through learned convolution filters and nonlinear activation, trainable
//! end-to-end via momentum-augmented gradient descent.
//!
//! The network consumes an externally computed error signal at its output
//! layer; no loss function is built in.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Convolution, MaxPooling, Dense)
//! - `activations`: Activation functions (Sigmoid, Tanh, ReLU, LeakyReLU)
//! - `network`: Network orchestration (forward and backward propagation)
//! - `architecture`: Architecture configuration and network building
//! - `dimensions`: Volume shape description
//! - `error`: Error taxonomy
//! - `utils`: Shared utilities (RNG)

pub mod activations;
pub mod architecture;
pub mod dimensions;
pub mod error;
pub mod layers;
pub mod network;
pub mod utils;
