//! Layer abstractions for the network
//!
//! This module provides the Layer trait and implementations for the layer
//! kinds the network supports.

mod r#trait;
pub mod convolution;
pub mod dense;
pub mod pooling;

// Re-export the Layer trait and layer types for convenience
pub use convolution::ConvolutionLayer;
pub use dense::DenseLayer;
pub use pooling::MaxPoolingLayer;
pub use r#trait::Layer;
