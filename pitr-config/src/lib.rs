//! Configuration management for the binlog collector.
//!
//! Provides environment detection, configuration loading from YAML files and environment
//! variables, secret handling, and the shared configuration types.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
