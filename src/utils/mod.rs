//! Shared utilities for the network implementation
//!
//! Currently random number generation; the RNG is passed explicitly into
//! layer constructors so initialization stays deterministic and testable.

pub mod rng;

pub use rng::SimpleRng;
