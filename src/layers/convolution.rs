//! Convolution layer implementation
//!
//! Slides learnable square filters over the input volume with a configurable
//! stride, applies an elementwise activation, and trains via
//! momentum-augmented gradient descent. Both the forward pass and the filter
//! gradient are cross-correlations (no kernel flip).

use crate::activations::{Activation, Sigmoid};
use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use crate::layers::Layer;
use crate::utils::SimpleRng;
use ndarray::{Array2, Array3};

/// Momentum coefficient used when none is configured.
pub const DEFAULT_MOMENTUM: f64 = 0.9;

/// Convolution layer with learnable filters.
///
/// Each filter is a square `filter_size x filter_size` kernel spanning every
/// input channel, stored as an `Array3<f64>` of shape
/// `(channels, filter_size, filter_size)`. The single-channel case is simply
/// `channels = 1`; there is no separate layout for it.
///
/// The window slides from the origin with step `stride` and visits every
/// position where it fits entirely inside the input (no padding), so the
/// output extents are `(input - filter_size) / stride + 1` per axis and the
/// output channel count equals the number of filters.
///
/// # Example
///
/// ```
/// use convnet::dimensions::Dimensions;
/// use convnet::layers::{ConvolutionLayer, Layer};
/// use convnet::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = ConvolutionLayer::new(Dimensions::new(5, 5, 1), 1, 3, 2, &mut rng).unwrap();
/// assert_eq!(layer.output_size(), Dimensions::new(3, 3, 2));
/// ```
pub struct ConvolutionLayer {
    input_dims: Dimensions,
    output_dims: Dimensions,
    stride: usize,
    filter_size: usize,
    momentum: f64,

    // One kernel and one momentum block per filter, same shape.
    filters: Vec<Array3<f64>>,
    previous_deltas: Vec<Array3<f64>>,

    activation: Box<dyn Activation>,

    // Caches from the last forward and gradient passes.
    inputs: Option<Array3<f64>>,
    raw_outputs: Option<Array3<f64>>,
    outputs: Option<Array3<f64>>,
    filter_gradients: Option<Vec<Array3<f64>>>,
    propagated: Option<Array3<f64>>,
}

impl ConvolutionLayer {
    /// Create a convolution layer with the default momentum coefficient.
    ///
    /// Filters are initialized with uniform-random values in [-0.5, 0.5);
    /// previous deltas start at zero. The default activation is Sigmoid.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `filter_size` exceeds either spatial
    /// extent of `input`, or if `stride`, `filter_size`, `num_filters`, or
    /// any input dimension is zero.
    pub fn new(
        input: Dimensions,
        stride: usize,
        filter_size: usize,
        num_filters: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self, NetworkError> {
        Self::with_momentum(input, stride, filter_size, num_filters, DEFAULT_MOMENTUM, rng)
    }

    /// Create a convolution layer with an explicit momentum coefficient.
    ///
    /// # Errors
    ///
    /// In addition to the checks in [`ConvolutionLayer::new`], fails when
    /// `momentum` is outside [0.0, 1.0].
    pub fn with_momentum(
        input: Dimensions,
        stride: usize,
        filter_size: usize,
        num_filters: usize,
        momentum: f64,
        rng: &mut SimpleRng,
    ) -> Result<Self, NetworkError> {
        if !input.is_valid() {
            return Err(NetworkError::Config(format!(
                "input dimensions {} must all be at least 1",
                input
            )));
        }
        if stride == 0 {
            return Err(NetworkError::Config(
                "stride must be greater than 0".to_string(),
            ));
        }
        if filter_size == 0 {
            return Err(NetworkError::Config(
                "filter_size must be greater than 0".to_string(),
            ));
        }
        if num_filters == 0 {
            return Err(NetworkError::Config(
                "num_filters must be greater than 0".to_string(),
            ));
        }
        if filter_size > input.x || filter_size > input.y {
            return Err(NetworkError::Config(format!(
                "filter_size {} does not fit input dimensions {}",
                filter_size, input
            )));
        }
        if !(0.0..=1.0).contains(&momentum) {
            return Err(NetworkError::Config(format!(
                "momentum {} must be in range [0.0, 1.0]",
                momentum
            )));
        }

        // Output extents per axis: (input - filter_size) / stride + 1, floored.
        let output_dims = Dimensions::new(
            (input.x - filter_size) / stride + 1,
            (input.y - filter_size) / stride + 1,
            num_filters,
        );

        let kernel_shape = (input.z, filter_size, filter_size);
        let mut filters = Vec::with_capacity(num_filters);
        let mut previous_deltas = Vec::with_capacity(num_filters);
        for _ in 0..num_filters {
            let mut kernel = Array3::zeros(kernel_shape);
            for value in kernel.iter_mut() {
                *value = rng.gen_range_f64(-0.5, 0.5);
            }
            filters.push(kernel);
            previous_deltas.push(Array3::zeros(kernel_shape));
        }

        Ok(Self {
            input_dims: input,
            output_dims,
            stride,
            filter_size,
            momentum,
            filters,
            previous_deltas,
            activation: Box::new(Sigmoid),
            inputs: None,
            raw_outputs: None,
            outputs: None,
            filter_gradients: None,
            propagated: None,
        })
    }

    /// Get the filter kernel size.
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// Get the number of filters.
    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    /// Get the momentum coefficient.
    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Layer for ConvolutionLayer {
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

    /// One row per filter, the kernel flattened in `(channel, row, col)`
    /// order.
    fn weights(&self) -> Option<Array2<f64>> {
        let row_len = self.input_dims.z * self.filter_size * self.filter_size;
        let mut weights = Array2::zeros((self.filters.len(), row_len));
        for (f, kernel) in self.filters.iter().enumerate() {
            for (j, &value) in kernel.iter().enumerate() {
                weights[[f, j]] = value;
            }
        }
        Some(weights)
    }

    fn set_weights(&mut self, weights: &Array2<f64>) -> Result<(), NetworkError> {
        let row_len = self.input_dims.z * self.filter_size * self.filter_size;
        if weights.dim() != (self.filters.len(), row_len) {
            return Err(NetworkError::Config(format!(
                "weight block must be {}x{}, got {}x{}",
                self.filters.len(),
                row_len,
                weights.dim().0,
                weights.dim().1
            )));
        }
        for (f, kernel) in self.filters.iter_mut().enumerate() {
            for (value, &new) in kernel.iter_mut().zip(weights.row(f).iter()) {
                *value = new;
            }
        }
        Ok(())
    }

    fn gradients(&self) -> Option<Array2<f64>> {
        let gradients = self.filter_gradients.as_ref()?;
        let row_len = self.input_dims.z * self.filter_size * self.filter_size;
        let mut block = Array2::zeros((gradients.len(), row_len));
        for (f, gradient) in gradients.iter().enumerate() {
            for (j, &value) in gradient.iter().enumerate() {
                block[[f, j]] = value;
            }
        }
        Some(block)
    }

    fn feed_forward(&mut self, input: &Array3<f64>) -> Result<(), NetworkError> {
        let actual = Dimensions::of(input);
        if actual != self.input_dims {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_dims,
                actual,
            });
        }

        let k = self.filter_size;
        let s = self.stride;
        let mut raw = Array3::zeros(self.output_dims.shape());
        for (f, kernel) in self.filters.iter().enumerate() {
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let mut sum = 0.0;
                    for c in 0..self.input_dims.z {
                        for ky in 0..k {
                            for kx in 0..k {
                                sum += input[[c, out_y * s + ky, out_x * s + kx]]
                                    * kernel[[c, ky, kx]];
                            }
                        }
                    }
                    raw[[f, out_y, out_x]] = sum;
                }
            }
        }

        let activation = self.activation.as_ref();
        let outputs = raw.mapv(|value| activation.activate(value));

        self.inputs = Some(input.clone());
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

        let k = self.filter_size;
        let s = self.stride;
        let activation = self.activation.as_ref();

        // Local gradient: upstream error times the activation derivative,
        // whose argument convention is variant-specific.
        let mut local = Array3::zeros(self.output_dims.shape());
        for f in 0..self.output_dims.z {
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let arg = if activation.dx_takes_activated() {
                        outputs[[f, out_y, out_x]]
                    } else {
                        raw[[f, out_y, out_x]]
                    };
                    local[[f, out_y, out_x]] =
                        errors[[f, out_y, out_x]] * activation.activate_dx(arg);
                }
            }
        }

        // Filter gradient: cross-correlation of the local gradients with the
        // input windows, accumulated over all output positions.
        let mut filter_gradients = Vec::with_capacity(self.filters.len());
        for f in 0..self.filters.len() {
            let mut gradient = Array3::zeros((self.input_dims.z, k, k));
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let delta = local[[f, out_y, out_x]];
                    for c in 0..self.input_dims.z {
                        for ky in 0..k {
                            for kx in 0..k {
                                gradient[[c, ky, kx]] +=
                                    delta * inputs[[c, out_y * s + ky, out_x * s + kx]];
                            }
                        }
                    }
                }
            }
            filter_gradients.push(gradient);
        }

        // Propagated error: every input position accumulates the local
        // gradient of each window that covered it, weighted by the matching
        // kernel weight. Overlapping windows sum.
        let mut propagated = Array3::zeros(self.input_dims.shape());
        for (f, kernel) in self.filters.iter().enumerate() {
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let delta = local[[f, out_y, out_x]];
                    for c in 0..self.input_dims.z {
                        for ky in 0..k {
                            for kx in 0..k {
                                propagated[[c, out_y * s + ky, out_x * s + kx]] +=
                                    delta * kernel[[c, ky, kx]];
                            }
                        }
                    }
                }
            }
        }

        self.filter_gradients = Some(filter_gradients);
        self.propagated = Some(propagated);
        Ok(())
    }

    fn update_weights(&mut self, rate: f64) -> Result<(), NetworkError> {
        let gradients = self
            .filter_gradients
            .as_ref()
            .ok_or(NetworkError::GradientsRequired)?;
        for f in 0..self.filters.len() {
            let delta = &gradients[f] * -rate + &self.previous_deltas[f] * self.momentum;
            self.filters[f] += &delta;
            self.previous_deltas[f] = delta;
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn layer_type(&self) -> &'static str {
        "convolution"
    }

    fn set_activation(&mut self, activation: Box<dyn Activation>) {
        self.activation = activation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dimensions() {
        let mut rng = SimpleRng::new(42);
        let layer =
            ConvolutionLayer::new(Dimensions::new(28, 28, 1), 1, 3, 8, &mut rng).unwrap();

        assert_eq!(layer.output_size(), Dimensions::new(26, 26, 8));
        assert_eq!(layer.input_size(), Dimensions::new(28, 28, 1));
    }

    #[test]
    fn test_output_dimensions_strided() {
        let mut rng = SimpleRng::new(42);
        let layer =
            ConvolutionLayer::new(Dimensions::new(28, 28, 3), 2, 5, 4, &mut rng).unwrap();

        // (28 - 5) / 2 + 1 = 12 per axis, floored
        assert_eq!(layer.output_size(), Dimensions::new(12, 12, 4));
        assert_eq!(layer.stride(), 2);
    }

    #[test]
    fn test_oversized_filter_rejected() {
        let mut rng = SimpleRng::new(42);
        let result = ConvolutionLayer::new(Dimensions::new(3, 3, 1), 1, 5, 1, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_stride_rejected() {
        let mut rng = SimpleRng::new(42);
        let result = ConvolutionLayer::new(Dimensions::new(5, 5, 1), 0, 3, 1, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_filters_rejected() {
        let mut rng = SimpleRng::new(42);
        let result = ConvolutionLayer::new(Dimensions::new(5, 5, 1), 1, 3, 0, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_momentum_rejected() {
        let mut rng = SimpleRng::new(42);
        let result =
            ConvolutionLayer::with_momentum(Dimensions::new(5, 5, 1), 1, 3, 1, 1.5, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_initialization_bounds() {
        let mut rng = SimpleRng::new(42);
        let layer =
            ConvolutionLayer::new(Dimensions::new(8, 8, 3), 1, 3, 4, &mut rng).unwrap();

        let weights = layer.weights().unwrap();
        assert_eq!(weights.dim(), (4, 3 * 3 * 3));
        for &weight in weights.iter() {
            assert!((-0.5..0.5).contains(&weight));
        }
    }

    #[test]
    fn test_deterministic_initialization() {
        let mut rng1 = SimpleRng::new(12345);
        let layer1 =
            ConvolutionLayer::new(Dimensions::new(8, 8, 2), 1, 3, 4, &mut rng1).unwrap();

        let mut rng2 = SimpleRng::new(12345);
        let layer2 =
            ConvolutionLayer::new(Dimensions::new(8, 8, 2), 1, 3, 4, &mut rng2).unwrap();

        assert_eq!(layer1.weights().unwrap(), layer2.weights().unwrap());
    }

    #[test]
    fn test_set_weights_shape_checked() {
        let mut rng = SimpleRng::new(42);
        let mut layer =
            ConvolutionLayer::new(Dimensions::new(5, 5, 1), 1, 3, 2, &mut rng).unwrap();

        let wrong = Array2::zeros((2, 4));
        assert!(layer.set_weights(&wrong).is_err());

        let right = Array2::from_elem((2, 9), 0.25);
        layer.set_weights(&right).unwrap();
        assert_eq!(layer.weights().unwrap(), right);
    }

    #[test]
    fn test_sequencing_errors() {
        let mut rng = SimpleRng::new(42);
        let mut layer =
            ConvolutionLayer::new(Dimensions::new(5, 5, 1), 1, 3, 1, &mut rng).unwrap();

        let errors = Array3::zeros((1, 3, 3));
        assert_eq!(
            layer.compute_gradients(&errors),
            Err(NetworkError::ForwardPassRequired)
        );
        assert_eq!(layer.update_weights(0.1), Err(NetworkError::GradientsRequired));
    }
}
