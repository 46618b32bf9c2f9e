//! Network orchestration
//!
//! A Network is an ordered pipeline of layers. Forward propagation pushes an
//! input volume through each layer in sequence; backward propagation starts
//! from an externally computed error signal at the output layer and walks
//! the chain in reverse, each layer computing its gradients and updating its
//! weights before handing its propagated errors to its predecessor.

use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use crate::layers::Layer;
use ndarray::Array3;

/// An ordered pipeline of layers.
///
/// Composition is fixed after construction; adjacent layers must agree on
/// their volume dimensions, which is validated up front as a configuration
/// error rather than at call time.
///
/// # Example
///
/// ```
/// use convnet::dimensions::Dimensions;
/// use convnet::layers::{ConvolutionLayer, Layer};
/// use convnet::network::Network;
/// use convnet::utils::SimpleRng;
/// use ndarray::Array3;
///
/// let mut rng = SimpleRng::new(42);
/// let conv = ConvolutionLayer::new(Dimensions::new(5, 5, 1), 1, 3, 2, &mut rng).unwrap();
/// let mut network = Network::new(vec![Box::new(conv)]).unwrap();
///
/// let input = Array3::zeros((1, 5, 5));
/// network.feed_forward(&input).unwrap();
/// assert_eq!(network.output().dim(), (2, 3, 3));
/// ```
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl Network {
    /// Create a network from an ordered sequence of layers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the sequence is empty or when an
    /// adjacent pair of layers disagrees on its volume dimensions.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Result<Self, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::Config(
                "network must have at least one layer".to_string(),
            ));
        }
        for i in 0..layers.len() - 1 {
            let output = layers[i].output_size();
            let input = layers[i + 1].input_size();
            if output != input {
                return Err(NetworkError::Config(format!(
                    "layer connection mismatch: layer {} output {} does not match layer {} input {}",
                    i,
                    output,
                    i + 1,
                    input
                )));
            }
        }
        Ok(Self { layers })
    }

    /// The number of layers in the pipeline.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the pipeline is empty; always false for a constructed network.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layers in forward-pass order.
    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// The dimensions the input volume must have.
    pub fn input_size(&self) -> Dimensions {
        self.layers[0].input_size()
    }

    /// The dimensions of the output volume.
    pub fn output_size(&self) -> Dimensions {
        self.layers[self.layers.len() - 1].output_size()
    }

    /// Run the input volume through every layer in sequence.
    ///
    /// Each layer consumes the previous layer's activated outputs. Stops at
    /// the first failing layer and surfaces its error together with its
    /// position in the pipeline.
    pub fn feed_forward(&mut self, input: &Array3<f64>) -> Result<(), NetworkError> {
        let mut current = input.clone();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let kind = layer.layer_type();
            layer
                .feed_forward(&current)
                .map_err(|source| NetworkError::at_layer(index, kind, source))?;
            current = layer.activated_outputs().clone();
        }
        Ok(())
    }

    /// Walk the layers in reverse, training each one.
    ///
    /// The first (output-most) layer consumes the externally supplied error
    /// signal; every other layer consumes its successor's propagated errors.
    /// Per layer: compute gradients, then apply the weight update with the
    /// given learning rate. Stops at the first failing layer and surfaces
    /// its error together with its position.
    pub fn back_propagate(
        &mut self,
        output_errors: &Array3<f64>,
        rate: f64,
    ) -> Result<(), NetworkError> {
        let mut errors = output_errors.clone();
        for index in (0..self.layers.len()).rev() {
            let layer = &mut self.layers[index];
            let kind = layer.layer_type();
            layer
                .compute_gradients(&errors)
                .map_err(|source| NetworkError::at_layer(index, kind, source))?;
            layer
                .update_weights(rate)
                .map_err(|source| NetworkError::at_layer(index, kind, source))?;
            errors = layer.propagated_errors().clone();
        }
        Ok(())
    }

    /// The final layer's activated output volume.
    ///
    /// # Panics
    ///
    /// Panics if no forward pass has run.
    pub fn output(&self) -> &Array3<f64> {
        self.layers[self.layers.len() - 1].activated_outputs()
    }

    /// Print the final layer's output volume to stdout.
    ///
    /// # Panics
    ///
    /// Panics if no forward pass has run.
    pub fn print(&self) {
        self.layers[self.layers.len() - 1].print_output();
    }
}
