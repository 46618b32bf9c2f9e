//! Max-pooling layer implementation
//!
//! Downsamples each channel by taking the maximum of each pooling window.
//! No learnable parameters; gradients are routed back to the positions that
//! produced the maxima.

use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use crate::layers::Layer;
use ndarray::Array3;

/// Max pooling layer.
///
/// Slides a square `pool_size x pool_size` window over each channel with
/// step `stride`, keeping the window maximum. The channel count is
/// unchanged; the spatial extents shrink by the same floor formula the
/// convolution layer uses.
pub struct MaxPoolingLayer {
    input_dims: Dimensions,
    output_dims: Dimensions,
    pool_size: usize,
    stride: usize,

    outputs: Option<Array3<f64>>,
    // Input coordinates (y, x) of the maximum for each output position.
    switches: Option<Array3<[usize; 2]>>,
    propagated: Option<Array3<f64>>,
}

impl MaxPoolingLayer {
    /// Create a max-pooling layer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `pool_size` exceeds either spatial
    /// extent of `input`, or if `stride`, `pool_size`, or any input
    /// dimension is zero.
    pub fn new(
        input: Dimensions,
        pool_size: usize,
        stride: usize,
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
        if pool_size == 0 {
            return Err(NetworkError::Config(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if pool_size > input.x || pool_size > input.y {
            return Err(NetworkError::Config(format!(
                "pool_size {} does not fit input dimensions {}",
                pool_size, input
            )));
        }

        let output_dims = Dimensions::new(
            (input.x - pool_size) / stride + 1,
            (input.y - pool_size) / stride + 1,
            input.z,
        );

        Ok(Self {
            input_dims: input,
            output_dims,
            pool_size,
            stride,
            outputs: None,
            switches: None,
            propagated: None,
        })
    }

    /// Get the pooling window size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

impl Layer for MaxPoolingLayer {
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

    fn feed_forward(&mut self, input: &Array3<f64>) -> Result<(), NetworkError> {
        let actual = Dimensions::of(input);
        if actual != self.input_dims {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_dims,
                actual,
            });
        }

        let p = self.pool_size;
        let s = self.stride;
        let mut outputs = Array3::zeros(self.output_dims.shape());
        let mut switches = Array3::from_elem(self.output_dims.shape(), [0usize; 2]);
        for c in 0..self.input_dims.z {
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let mut best = f64::NEG_INFINITY;
                    let mut best_at = [0usize; 2];
                    for py in 0..p {
                        for px in 0..p {
                            let y = out_y * s + py;
                            let x = out_x * s + px;
                            let value = input[[c, y, x]];
                            if value > best {
                                best = value;
                                best_at = [y, x];
                            }
                        }
                    }
                    outputs[[c, out_y, out_x]] = best;
                    switches[[c, out_y, out_x]] = best_at;
                }
            }
        }

        self.outputs = Some(outputs);
        self.switches = Some(switches);
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
        let switches = self
            .switches
            .as_ref()
            .ok_or(NetworkError::ForwardPassRequired)?;

        // Each upstream error flows to the input position that produced the
        // maximum; overlapping windows sum.
        let mut propagated = Array3::zeros(self.input_dims.shape());
        for c in 0..self.output_dims.z {
            for out_y in 0..self.output_dims.y {
                for out_x in 0..self.output_dims.x {
                    let [y, x] = switches[[c, out_y, out_x]];
                    propagated[[c, y, x]] += errors[[c, out_y, out_x]];
                }
            }
        }

        self.propagated = Some(propagated);
        Ok(())
    }

    fn update_weights(&mut self, _rate: f64) -> Result<(), NetworkError> {
        // No parameters to update, but the sequencing contract still holds.
        if self.propagated.is_none() {
            return Err(NetworkError::GradientsRequired);
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn layer_type(&self) -> &'static str {
        "maxpooling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooling_output_dimensions() {
        let layer = MaxPoolingLayer::new(Dimensions::new(4, 4, 2), 2, 2).unwrap();
        assert_eq!(layer.output_size(), Dimensions::new(2, 2, 2));
        assert_eq!(layer.stride(), 2);
    }

    #[test]
    fn test_pooling_oversized_window_rejected() {
        assert!(MaxPoolingLayer::new(Dimensions::new(3, 3, 1), 5, 1).is_err());
        assert!(MaxPoolingLayer::new(Dimensions::new(3, 3, 1), 2, 0).is_err());
    }

    #[test]
    fn test_pooling_takes_window_maximum() {
        let mut layer = MaxPoolingLayer::new(Dimensions::new(4, 4, 1), 2, 2).unwrap();

        let mut input = Array3::zeros((1, 4, 4));
        input[[0, 0, 0]] = 3.0;
        input[[0, 1, 1]] = 7.0;
        input[[0, 2, 3]] = 5.0;
        input[[0, 3, 3]] = -1.0;

        layer.feed_forward(&input).unwrap();
        let output = layer.activated_outputs();
        assert_eq!(output[[0, 0, 0]], 7.0);
        assert_eq!(output[[0, 1, 1]], 5.0);
    }

    #[test]
    fn test_pooling_routes_errors_to_argmax() {
        let mut layer = MaxPoolingLayer::new(Dimensions::new(2, 2, 1), 2, 2).unwrap();

        let mut input = Array3::zeros((1, 2, 2));
        input[[0, 1, 0]] = 9.0;
        layer.feed_forward(&input).unwrap();

        let mut errors = Array3::zeros((1, 1, 1));
        errors[[0, 0, 0]] = 0.25;
        layer.compute_gradients(&errors).unwrap();

        let propagated = layer.propagated_errors();
        assert_eq!(propagated[[0, 1, 0]], 0.25);
        assert_eq!(propagated[[0, 0, 0]], 0.0);
        assert_eq!(propagated[[0, 0, 1]], 0.0);
        assert_eq!(propagated[[0, 1, 1]], 0.0);
    }

    #[test]
    fn test_pooling_has_no_weights() {
        let layer = MaxPoolingLayer::new(Dimensions::new(4, 4, 1), 2, 2).unwrap();
        assert!(layer.weights().is_none());
        assert!(layer.gradients().is_none());
    }

    #[test]
    fn test_pooling_sequencing() {
        let mut layer = MaxPoolingLayer::new(Dimensions::new(4, 4, 1), 2, 2).unwrap();
        assert_eq!(layer.update_weights(0.1), Err(NetworkError::GradientsRequired));
    }
}
