//! Architecture configuration structures
//!
//! This module provides configuration structures for defining networks via
//! JSON configuration files, enabling architecture experimentation without
//! code changes.

use crate::activations;
use crate::dimensions::Dimensions;
use crate::error::NetworkError;
use crate::layers::{ConvolutionLayer, DenseLayer, Layer, MaxPoolingLayer};
use crate::network::Network;
use crate::utils::SimpleRng;
use serde::Deserialize;
use std::fs;

/// Configuration for a single layer in the network.
///
/// Defines the layer type and its parameters. Different layer types require
/// different fields:
///
/// - **convolution**: Requires `input`, `filter_size`, `num_filters`, and
///   optional `stride` (default 1), `momentum`, `activation`
/// - **maxpooling**: Requires `input`, `pool_size`, and optional `stride`
///   (default 1)
/// - **dense**: Requires `input`, `output_size`, and optional `momentum`,
///   `activation`
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "convolution",
///   "input": { "x": 9, "y": 9, "z": 1 },
///   "stride": 1,
///   "filter_size": 3,
///   "num_filters": 4,
///   "activation": "relu"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "convolution", "maxpooling", or "dense"
    pub layer_type: String,

    /// Dimensions of the incoming volume
    pub input: Option<Dimensions>,

    /// Stride for convolution and maxpooling layers (default: 1)
    pub stride: Option<usize>,

    /// Kernel size for convolution layers (square)
    pub filter_size: Option<usize>,

    /// Filter count for convolution layers
    pub num_filters: Option<usize>,

    /// Momentum coefficient for trainable layers (default: 0.9)
    pub momentum: Option<f64>,

    /// Window size for maxpooling layers (square)
    pub pool_size: Option<usize>,

    /// Output unit count for dense layers
    pub output_size: Option<usize>,

    /// Activation name: "sigmoid", "tanh", "relu", or "leaky_relu"
    pub activation: Option<String>,
}

/// Configuration for the entire network architecture.
///
/// Contains a sequence of layer configurations applied in the order they
/// appear.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or the JSON is
/// invalid.
///
/// # Examples
///
/// ```no_run
/// use convnet::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/cnn_simple.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, NetworkError> {
    let contents = fs::read_to_string(path)
        .map_err(|err| NetworkError::Config(format!("cannot read {}: {}", path, err)))?;
    serde_json::from_str(&contents)
        .map_err(|err| NetworkError::Config(format!("invalid architecture config: {}", err)))
}

fn require<T>(value: Option<T>, index: usize, layer_type: &str, field: &str) -> Result<T, NetworkError> {
    value.ok_or_else(|| {
        NetworkError::Config(format!(
            "layer {}: {} layer missing '{}'",
            index, layer_type, field
        ))
    })
}

/// Builds a network from an architecture configuration.
///
/// Each layer is constructed with parameters from the config, using the
/// provided RNG for weight initialization; configured activations are
/// applied after construction. Adjacent-layer compatibility is validated by
/// [`Network::new`].
///
/// # Errors
///
/// Returns a configuration error naming the offending layer when a required
/// field is missing, a parameter is out of range, the layer type is unknown,
/// or the layer chain is mis-dimensioned.
pub fn build_network(
    config: &ArchitectureConfig,
    rng: &mut SimpleRng,
) -> Result<Network, NetworkError> {
    let mut layers: Vec<Box<dyn Layer>> = Vec::new();

    for (index, layer_config) in config.layers.iter().enumerate() {
        let layer_type = layer_config.layer_type.to_lowercase();

        match layer_type.as_str() {
            "convolution" => {
                let input = require(layer_config.input, index, "convolution", "input")?;
                let filter_size =
                    require(layer_config.filter_size, index, "convolution", "filter_size")?;
                let num_filters =
                    require(layer_config.num_filters, index, "convolution", "num_filters")?;
                let stride = layer_config.stride.unwrap_or(1);

                let mut layer = match layer_config.momentum {
                    Some(momentum) => ConvolutionLayer::with_momentum(
                        input,
                        stride,
                        filter_size,
                        num_filters,
                        momentum,
                        rng,
                    ),
                    None => ConvolutionLayer::new(input, stride, filter_size, num_filters, rng),
                }
                .map_err(|err| prefix_layer(index, err))?;

                if let Some(name) = &layer_config.activation {
                    layer.set_activation(activations::from_name(name)?);
                }
                layers.push(Box::new(layer));
            }
            "maxpooling" => {
                let input = require(layer_config.input, index, "maxpooling", "input")?;
                let pool_size =
                    require(layer_config.pool_size, index, "maxpooling", "pool_size")?;
                let stride = layer_config.stride.unwrap_or(1);

                let layer = MaxPoolingLayer::new(input, pool_size, stride)
                    .map_err(|err| prefix_layer(index, err))?;
                layers.push(Box::new(layer));
            }
            "dense" => {
                let input = require(layer_config.input, index, "dense", "input")?;
                let output_size =
                    require(layer_config.output_size, index, "dense", "output_size")?;

                let mut layer = match layer_config.momentum {
                    Some(momentum) => DenseLayer::with_momentum(input, output_size, momentum, rng),
                    None => DenseLayer::new(input, output_size, rng),
                }
                .map_err(|err| prefix_layer(index, err))?;

                if let Some(name) = &layer_config.activation {
                    layer.set_activation(activations::from_name(name)?);
                }
                layers.push(Box::new(layer));
            }
            _ => {
                return Err(NetworkError::Config(format!(
                    "layer {}: invalid layer type '{}'; must be one of: convolution, maxpooling, dense",
                    index, layer_config.layer_type
                )));
            }
        }
    }

    Network::new(layers)
}

fn prefix_layer(index: usize, err: NetworkError) -> NetworkError {
    match err {
        NetworkError::Config(message) => {
            NetworkError::Config(format!("layer {}: {}", index, message))
        }
        other => other,
    }
}
