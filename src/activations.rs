//! Activation functions for network layers
//!
//! Each variant is a stateless strategy: `activate` applies the nonlinearity
//! and `activate_dx` returns the local derivative used during gradient
//! computation. Two of the derivatives deliberately deviate from the textbook
//! formulas and are preserved exactly for behavioral parity with earlier
//! trained models; see the notes on [`Sigmoid`] and [`ReLU`].

use crate::error::NetworkError;

/// Elementwise nonlinearity applied to a layer's raw output.
///
/// `activate` and `activate_dx` must be pure functions of their single
/// numeric input. `dx_takes_activated` records which cached value the
/// derivative expects: most variants differentiate the raw pre-activation
/// sum, but Sigmoid's derivative is defined on the activated output.
pub trait Activation {
    /// Apply the nonlinearity.
    fn activate(&self, input: f64) -> f64;

    /// Local derivative used during gradient computation.
    fn activate_dx(&self, input: f64) -> f64;

    /// Diagnostic identifier.
    fn name(&self) -> &'static str;

    /// Whether `activate_dx` expects the activated output rather than the
    /// raw pre-activation sum.
    fn dx_takes_activated(&self) -> bool {
        false
    }
}

/// Logistic sigmoid: `1 / (1 + e^-x)`.
///
/// The derivative is defined as `1 - x` evaluated on the activated output.
/// This is a known simplification of the true sigmoid derivative
/// `sigma(x) * (1 - sigma(x))`, kept bit-compatible rather than corrected.
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn activate(&self, input: f64) -> f64 {
        1.0 / (1.0 + (-input).exp())
    }

    fn activate_dx(&self, input: f64) -> f64 {
        1.0 - input
    }

    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn dx_takes_activated(&self) -> bool {
        true
    }
}

/// Hyperbolic tangent with the standard derivative `1 - tanh(x)^2`.
pub struct Tanh;

impl Activation for Tanh {
    fn activate(&self, input: f64) -> f64 {
        input.tanh()
    }

    fn activate_dx(&self, input: f64) -> f64 {
        let tanh = input.tanh();
        1.0 - tanh * tanh
    }

    fn name(&self) -> &'static str {
        "Tanh"
    }
}

/// Rectified linear unit: `max(0, x)`.
///
/// The derivative is a bounded surrogate rather than the step function:
/// 0.9999 when `x > 0.01`, 0.0001 otherwise. The constants are preserved
/// exactly for parity.
pub struct ReLU;

impl Activation for ReLU {
    fn activate(&self, input: f64) -> f64 {
        if input > 0.0 {
            input
        } else {
            0.0
        }
    }

    fn activate_dx(&self, input: f64) -> f64 {
        if input > 0.01 {
            0.9999
        } else {
            0.0001
        }
    }

    fn name(&self) -> &'static str {
        "ReLU"
    }
}

/// Leaky rectified linear unit with a fixed 0.01 slope for negative inputs.
pub struct LeakyReLU;

impl Activation for LeakyReLU {
    fn activate(&self, input: f64) -> f64 {
        if input > 0.0 {
            input
        } else {
            0.01 * input
        }
    }

    fn activate_dx(&self, input: f64) -> f64 {
        if input > 0.0 {
            1.0
        } else {
            0.01
        }
    }

    fn name(&self) -> &'static str {
        "LeakyReLU"
    }
}

/// Resolve an activation by its configuration name.
///
/// Accepted names: `"sigmoid"`, `"tanh"`, `"relu"`, `"leaky_relu"`
/// (case-insensitive).
pub fn from_name(name: &str) -> Result<Box<dyn Activation>, NetworkError> {
    match name.to_lowercase().as_str() {
        "sigmoid" => Ok(Box::new(Sigmoid)),
        "tanh" => Ok(Box::new(Tanh)),
        "relu" => Ok(Box::new(ReLU)),
        "leaky_relu" => Ok(Box::new(LeakyReLU)),
        _ => Err(NetworkError::Config(format!(
            "unknown activation '{}'; must be one of: sigmoid, tanh, relu, leaky_relu",
            name
        ))),
    }
}
