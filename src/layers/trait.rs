//! Layer trait definition for network layers
//!
//! This module defines the core Layer trait that all layer types must
//! implement. The trait provides a common interface for forward propagation,
//! gradient computation, and parameter updates.
//!
//! The trait is a capability set: every layer kind implements the full
//! surface, with default implementations covering the operations that are
//! not meaningful for a given kind (for example `stride` returns 0 for
//! non-strided layers, and `weights` returns `None` for layers without
//! trainable parameters).

use crate::activations::Activation;
use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use ndarray::{Array2, Array3};

/// Core trait for network layers.
///
/// All layer types (Convolution, MaxPooling, Dense) implement this trait to
/// provide a uniform interface for forward and backward propagation.
///
/// Layers work with `f64` volumes stored channels-first (`(z, y, x)` for
/// dimensions `{ x, y, z }`).
///
/// # Example
///
/// ```ignore
/// // Forward pass through a layer
/// layer.feed_forward(&input)?;
/// let output = layer.activated_outputs();
///
/// // Backward pass: gradients, then the in-place weight update
/// layer.compute_gradients(&errors)?;
/// layer.update_weights(0.01)?;
/// ```
pub trait Layer {
    /// The dimensions of the incoming volume, fixed after construction.
    fn input_size(&self) -> Dimensions;

    /// The dimensions of the outgoing volume, fixed after construction.
    fn output_size(&self) -> Dimensions;

    /// The cached post-activation output from the last forward pass.
    ///
    /// # Panics
    ///
    /// Panics if no forward pass has run.
    fn activated_outputs(&self) -> &Array3<f64>;

    /// The cached error signal to hand to the predecessor layer.
    ///
    /// # Panics
    ///
    /// Panics if no gradient pass has run.
    fn propagated_errors(&self) -> &Array3<f64>;

    /// The learnable parameter block, one row per filter/unit; layout is
    /// variant-specific. `None` for layers without trainable parameters.
    fn weights(&self) -> Option<Array2<f64>> {
        None
    }

    /// Replace the learnable parameter block.
    ///
    /// Fails when the provided block does not match the variant-specific
    /// layout. Layers without trainable parameters ignore the call.
    fn set_weights(&mut self, weights: &Array2<f64>) -> Result<(), NetworkError> {
        let _ = weights;
        Ok(())
    }

    /// The most recently computed parameter-gradient block, in the same
    /// layout as `weights`. `None` before the first gradient pass and for
    /// layers without trainable parameters.
    fn gradients(&self) -> Option<Array2<f64>> {
        None
    }

    /// Consume an input volume matching `input_size`, produce and cache the
    /// activated output.
    ///
    /// Fails with a shape-mismatch error when the dimensions disagree; the
    /// layer's cached state is left unchanged in that case.
    fn feed_forward(&mut self, input: &Array3<f64>) -> Result<(), NetworkError>;

    /// Consume an upstream error volume matching `output_size`, compute and
    /// cache the parameter gradients and the error signal for the
    /// predecessor layer.
    ///
    /// Fails on shape mismatch, or with a sequencing error when no forward
    /// pass has run.
    fn compute_gradients(&mut self, errors: &Array3<f64>) -> Result<(), NetworkError>;

    /// Apply the cached gradients to the parameters in place using the given
    /// learning rate (and momentum where applicable).
    ///
    /// Fails with a sequencing error when called before `compute_gradients`.
    fn update_weights(&mut self, rate: f64) -> Result<(), NetworkError>;

    /// The layer's stride; 0 for non-strided layers.
    fn stride(&self) -> usize {
        0
    }

    /// The layer's kind ("convolution", "maxpooling", "dense").
    fn layer_type(&self) -> &'static str;

    /// Replace the layer's activation function. Layers that apply no
    /// activation ignore the call.
    fn set_activation(&mut self, activation: Box<dyn Activation>) {
        let _ = activation;
    }

    /// Print the activated output volume to stdout.
    ///
    /// # Panics
    ///
    /// Panics if no forward pass has run.
    fn print_output(&self) {
        print_volume(self.activated_outputs());
    }

    /// Print the weight block to stdout; prints nothing for layers without
    /// trainable parameters.
    fn print_weights(&self) {
        if let Some(weights) = self.weights() {
            let (rows, cols) = weights.dim();
            for i in 0..rows {
                for j in 0..cols {
                    print!("{:.2} ", weights[[i, j]]);
                }
                println!();
            }
        }
    }
}

fn print_volume(volume: &Array3<f64>) {
    let (channels, rows, cols) = volume.dim();
    for c in 0..channels {
        for i in 0..rows {
            for j in 0..cols {
                print!("{:.2} ", volume[[c, i, j]]);
            }
            println!();
        }
        println!();
    }
}
