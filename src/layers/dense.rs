//! Dense (fully connected) layer implementation
//!
//! Flattens the incoming volume, applies `y = W*x + b` followed by the
//! activation, and trains weights and biases with the same momentum update
//! rule the convolution layer uses.

use crate::activations::{Activation, Sigmoid};
use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use crate::layers::convolution::DEFAULT_MOMENTUM;
use crate::layers::Layer;
use crate::utils::SimpleRng;
use ndarray::{Array1, Array2, Array3};

/// Dense (fully connected) layer with weights and biases.
///
/// The input volume is flattened in logical `(channel, row, col)` order into
/// a vector of length `input.elements()`. The weight matrix is shaped
/// `(output_size, input.elements())` and the output is exposed as a
/// `(output_size, 1, 1)` volume so dense layers chain with spatial layers
/// under the same contract.
pub struct DenseLayer {
    input_dims: Dimensions,
    output_dims: Dimensions,
    momentum: f64,

    weights: Array2<f64>,
    biases: Array1<f64>,
    previous_delta: Array2<f64>,
    previous_bias_delta: Array1<f64>,

    activation: Box<dyn Activation>,

    inputs: Option<Array1<f64>>,
    raw_outputs: Option<Array1<f64>>,
    outputs: Option<Array3<f64>>,
    weight_gradients: Option<Array2<f64>>,
    bias_gradients: Option<Array1<f64>>,
    propagated: Option<Array3<f64>>,
}

impl DenseLayer {
    /// Create a dense layer with the default momentum coefficient.
    ///
    /// Weights are initialized uniform-random in [-0.5, 0.5); biases and
    /// previous deltas start at zero. The default activation is Sigmoid.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the input dimensions are invalid
    /// or `output_size` is zero.
    pub fn new(
        input: Dimensions,
        output_size: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self, NetworkError> {
        Self::with_momentum(input, output_size, DEFAULT_MOMENTUM, rng)
    }

    /// Create a dense layer with an explicit momentum coefficient.
    pub fn with_momentum(
        input: Dimensions,
        output_size: usize,
        momentum: f64,
        rng: &mut SimpleRng,
    ) -> Result<Self, NetworkError> {
        if !input.is_valid() {
            return Err(NetworkError::Config(format!(
                "input dimensions {} must all be at least 1",
                input
            )));
        }
        if output_size == 0 {
            return Err(NetworkError::Config(
                "output_size must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&momentum) {
            return Err(NetworkError::Config(format!(
                "momentum {} must be in range [0.0, 1.0]",
                momentum
            )));
        }

        let input_len = input.elements();
        let mut weights = Array2::zeros((output_size, input_len));
        for value in weights.iter_mut() {
            *value = rng.gen_range_f64(-0.5, 0.5);
        }

        Ok(Self {
            input_dims: input,
            output_dims: Dimensions::new(output_size, 1, 1),
            momentum,
            weights,
            biases: Array1::zeros(output_size),
            previous_delta: Array2::zeros((output_size, input_len)),
            previous_bias_delta: Array1::zeros(output_size),
            activation: Box::new(Sigmoid),
            inputs: None,
            raw_outputs: None,
            outputs: None,
            weight_gradients: None,
            bias_gradients: None,
            propagated: None,
        })
    }

    /// Get the momentum coefficient.
    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Layer for DenseLayer {
    fn input_size(&self) -> Dimensions {
        self.input_dims
    }

    fn output_size(&self) -> Dimensions {
        self.output_dims
    }

    fn activated_outputs(&self) -> &Array3<f64> {
        self.outputs
            .as_ref()
            .expect("no forward pass has been run")
    }

    fn propagated_errors(&self) -> &Array3<f64> {
        self.propagated
            .as_ref()
            .expect("no gradient pass has been run")
    }

    fn weights(&self) -> Option<Array2<f64>> {
        Some(self.weights.clone())
    }

    fn set_weights(&mut self, weights: &Array2<f64>) -> Result<(), NetworkError> {
        if weights.dim() != self.weights.dim() {
            return Err(NetworkError::Config(format!(
                "weight block must be {}x{}, got {}x{}",
                self.weights.dim().0,
                self.weights.dim().1,
                weights.dim().0,
                weights.dim().1
            )));
        }
        self.weights = weights.clone();
        Ok(())
    }

    fn gradients(&self) -> Option<Array2<f64>> {
        self.weight_gradients.clone()
    }

    fn feed_forward(&mut self, input: &Array3<f64>) -> Result<(), NetworkError> {
        let actual = Dimensions::of(input);
        if actual != self.input_dims {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_dims,
                actual,
            });
        }

        let flattened: Array1<f64> = input.iter().copied().collect();
        let raw = self.weights.dot(&flattened) + &self.biases;

        let activation = self.activation.as_ref();
        let mut outputs = Array3::zeros(self.output_dims.shape());
        for (i, &value) in raw.iter().enumerate() {
            outputs[[0, 0, i]] = activation.activate(value);
        }

        self.inputs = Some(flattened);
        self.raw_outputs = Some(raw);
        self.outputs = Some(outputs);
        Ok(())
    }

    fn compute_gradients(&mut self, errors: &Array3<f64>) -> Result<(), NetworkError> {
        let actual = Dimensions::of(errors);
        if actual != self.output_dims {
            return Err(NetworkError::ShapeMismatch {
                expected: self.output_dims,
                actual,
            });
        }
        let inputs = self.inputs.as_ref().ok_or(NetworkError::ForwardPassRequired)?;
        let raw = self
            .raw_outputs
            .as_ref()
            .ok_or(NetworkError::ForwardPassRequired)?;
        let outputs = self
            .outputs
            .as_ref()
            .ok_or(NetworkError::ForwardPassRequired)?;

        let activation = self.activation.as_ref();
        let output_len = self.output_dims.x;

        let mut local = Array1::zeros(output_len);
        for i in 0..output_len {
            let arg = if activation.dx_takes_activated() {
                outputs[[0, 0, i]]
            } else {
                raw[i]
            };
            local[i] = errors[[0, 0, i]] * activation.activate_dx(arg);
        }

        // Weight gradient is the outer product of the local gradients with
        // the flattened input; the bias gradient is the local gradient.
        let mut weight_gradients = Array2::zeros(self.weights.dim());
        for i in 0..output_len {
            for j in 0..inputs.len() {
                weight_gradients[[i, j]] = local[i] * inputs[j];
            }
        }

        let propagated_flat = self.weights.t().dot(&local);
        let mut propagated = Array3::zeros(self.input_dims.shape());
        for (value, &flat) in propagated.iter_mut().zip(propagated_flat.iter()) {
            *value = flat;
        }

        self.weight_gradients = Some(weight_gradients);
        self.bias_gradients = Some(local);
        self.propagated = Some(propagated);
        Ok(())
    }

    fn update_weights(&mut self, rate: f64) -> Result<(), NetworkError> {
        let weight_gradients = self
            .weight_gradients
            .as_ref()
            .ok_or(NetworkError::GradientsRequired)?;
        let bias_gradients = self
            .bias_gradients
            .as_ref()
            .ok_or(NetworkError::GradientsRequired)?;

        let delta = weight_gradients * -rate + &self.previous_delta * self.momentum;
        self.weights += &delta;
        self.previous_delta = delta;

        let bias_delta = bias_gradients * -rate + &self.previous_bias_delta * self.momentum;
        self.biases += &bias_delta;
        self.previous_bias_delta = bias_delta;
        Ok(())
    }

    fn layer_type(&self) -> &'static str {
        "dense"
    }

    fn set_activation(&mut self, activation: Box<dyn Activation>) {
        self.activation = activation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_creation() {
        let mut rng = SimpleRng::new(42);
        let layer = DenseLayer::new(Dimensions::new(4, 1, 1), 3, &mut rng).unwrap();

        assert_eq!(layer.input_size(), Dimensions::new(4, 1, 1));
        assert_eq!(layer.output_size(), Dimensions::new(3, 1, 1));
        assert_eq!(layer.weights().unwrap().dim(), (3, 4));
    }

    #[test]
    fn test_dense_accepts_spatial_input() {
        let mut rng = SimpleRng::new(42);
        let layer = DenseLayer::new(Dimensions::new(3, 3, 4), 10, &mut rng).unwrap();

        assert_eq!(layer.weights().unwrap().dim(), (10, 36));
    }

    #[test]
    fn test_dense_zero_output_rejected() {
        let mut rng = SimpleRng::new(42);
        assert!(DenseLayer::new(Dimensions::new(4, 1, 1), 0, &mut rng).is_err());
    }

    #[test]
    fn test_dense_initialization_bounds() {
        let mut rng = SimpleRng::new(42);
        let layer = DenseLayer::new(Dimensions::new(10, 1, 1), 5, &mut rng).unwrap();

        for &weight in layer.weights().unwrap().iter() {
            assert!((-0.5..0.5).contains(&weight));
        }
    }

    #[test]
    fn test_dense_sequencing_errors() {
        let mut rng = SimpleRng::new(42);
        let mut layer = DenseLayer::new(Dimensions::new(4, 1, 1), 2, &mut rng).unwrap();

        let errors = Array3::zeros((1, 1, 2));
        assert_eq!(
            layer.compute_gradients(&errors),
            Err(NetworkError::ForwardPassRequired)
        );
        assert_eq!(layer.update_weights(0.1), Err(NetworkError::GradientsRequired));
    }
}
