//! Error taxonomy
//!
//! Three classes of failures are surfaced to callers:
//!
//! - Configuration errors at construction time; the layer or network is
//!   never created.
//! - Shape-mismatch errors at call time; recoverable, and the layer's
//!   cached state is left unchanged.
//! - Sequencing errors when gradient or update calls arrive before the
//!   passes they depend on.
//!
//! Network-level calls stop at the first failing layer and wrap that
//! layer's error together with its position in the pipeline.

use crate::dimensions::Dimensions;
use thiserror::Error;

/// Errors produced by layer and network operations.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    /// Invalid construction parameters (non-positive stride, oversized
    /// filter, mis-chained layer dimensions, malformed config file, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An input or error volume does not match the layer's declared shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    /// `compute_gradients` was called before any successful forward pass.
    #[error("compute_gradients requires a prior feed_forward")]
    ForwardPassRequired,

    /// `update_weights` was called before any successful gradient pass.
    #[error("update_weights requires a prior compute_gradients")]
    GradientsRequired,

    /// A layer failed during a network-level call; carries the layer's
    /// position and kind alongside the underlying error.
    #[error("layer {index} ({layer_type}): {source}")]
    Layer {
        index: usize,
        layer_type: String,
        #[source]
        source: Box<NetworkError>,
    },
}

impl NetworkError {
    /// Wrap a layer error with its position in the network pipeline.
    pub fn at_layer(index: usize, layer_type: &str, source: NetworkError) -> Self {
        NetworkError::Layer {
            index,
            layer_type: layer_type.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = NetworkError::ShapeMismatch {
            expected: Dimensions::new(5, 5, 1),
            actual: Dimensions::new(4, 4, 1),
        };
        assert_eq!(err.to_string(), "shape mismatch: expected 5x5x1, got 4x4x1");
    }

    #[test]
    fn test_layer_wrapper_message() {
        let err = NetworkError::at_layer(2, "convolution", NetworkError::GradientsRequired);
        assert!(err.to_string().starts_with("layer 2 (convolution)"));
    }
}
