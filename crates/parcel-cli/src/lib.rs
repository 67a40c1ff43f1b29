//! Parcel audit CLI library.
//!
//! Core components of the `parcel-audit` operator binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
