// Tests for architecture configuration: JSON loading, validation, and
// network building.

use convnet::architecture::{build_network, load_architecture};
use convnet::dimensions::Dimensions;
use convnet::utils::SimpleRng;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_architecture_from_json() {
    let json = r#"{
  "layers": [
    {
      "layer_type": "convolution",
      "input": { "x": 9, "y": 9, "z": 1 },
      "stride": 1,
      "filter_size": 3,
      "num_filters": 4,
      "activation": "relu"
    },
    {
      "layer_type": "dense",
      "input": { "x": 7, "y": 7, "z": 4 },
      "output_size": 10
    }
  ]
}"#;

    let file = write_temp_config(json);
    let config = load_architecture(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.layers.len(), 2);
    assert_eq!(config.layers[0].layer_type, "convolution");
    assert_eq!(config.layers[0].input, Some(Dimensions::new(9, 9, 1)));
    assert_eq!(config.layers[0].num_filters, Some(4));
    assert_eq!(config.layers[1].layer_type, "dense");
    assert_eq!(config.layers[1].output_size, Some(10));
}

#[test]
fn test_load_rejects_invalid_json() {
    let file = write_temp_config("{ not json");
    assert!(load_architecture(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_load_rejects_missing_file() {
    assert!(load_architecture("config/does_not_exist.json").is_err());
}

#[test]
fn test_load_and_build_full_pipeline() {
    let json = r#"{
  "layers": [
    {
      "layer_type": "convolution",
      "input": { "x": 9, "y": 9, "z": 1 },
      "stride": 1,
      "filter_size": 3,
      "num_filters": 4,
      "activation": "leaky_relu"
    },
    {
      "layer_type": "maxpooling",
      "input": { "x": 7, "y": 7, "z": 4 },
      "pool_size": 2,
      "stride": 2
    },
    {
      "layer_type": "dense",
      "input": { "x": 3, "y": 3, "z": 4 },
      "output_size": 10,
      "activation": "sigmoid"
    }
  ]
}"#;

    let file = write_temp_config(json);
    let config = load_architecture(file.path().to_str().unwrap()).unwrap();

    let mut rng = SimpleRng::new(42);
    let network = build_network(&config, &mut rng).unwrap();

    assert_eq!(network.len(), 3);
    assert_eq!(network.input_size(), Dimensions::new(9, 9, 1));
    assert_eq!(network.output_size(), Dimensions::new(10, 1, 1));
}

#[test]
fn test_build_rejects_mis_chained_config() {
    let json = r#"{
  "layers": [
    {
      "layer_type": "convolution",
      "input": { "x": 9, "y": 9, "z": 1 },
      "filter_size": 3,
      "num_filters": 4
    },
    {
      "layer_type": "dense",
      "input": { "x": 6, "y": 6, "z": 4 },
      "output_size": 10
    }
  ]
}"#;

    let file = write_temp_config(json);
    let config = load_architecture(file.path().to_str().unwrap()).unwrap();

    let mut rng = SimpleRng::new(42);
    let err = build_network(&config, &mut rng).unwrap_err();
    assert!(err.to_string().contains("layer connection mismatch"));
}

#[test]
fn test_build_rejects_unknown_activation() {
    let json = r#"{
  "layers": [
    {
      "layer_type": "dense",
      "input": { "x": 4, "y": 1, "z": 1 },
      "output_size": 2,
      "activation": "softmax"
    }
  ]
}"#;

    let file = write_temp_config(json);
    let config = load_architecture(file.path().to_str().unwrap()).unwrap();

    let mut rng = SimpleRng::new(42);
    assert!(build_network(&config, &mut rng).is_err());
}

#[test]
fn test_example_configs() {
    // The shipped example configuration files must parse and build.
    let mut rng = SimpleRng::new(42);

    let cnn = load_architecture("config/architectures/cnn_simple.json").unwrap();
    assert_eq!(cnn.layers.len(), 3);
    let network = build_network(&cnn, &mut rng).unwrap();
    assert_eq!(network.input_size(), Dimensions::new(9, 9, 1));
    assert_eq!(network.output_size(), Dimensions::new(10, 1, 1));

    let mlp = load_architecture("config/architectures/mlp_simple.json").unwrap();
    assert_eq!(mlp.layers.len(), 2);
    let network = build_network(&mlp, &mut rng).unwrap();
    assert_eq!(network.input_size(), Dimensions::new(4, 1, 1));
    assert_eq!(network.output_size(), Dimensions::new(3, 1, 1));
}
