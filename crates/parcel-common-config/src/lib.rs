//! Configuration types for Parcel.
//!
//! Configuration is resolved from built-in defaults, an optional YAML file
//! (`parcel.yaml` or `$PARCEL_CONFIG_PATH`) and environment overrides, in
//! that order.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
