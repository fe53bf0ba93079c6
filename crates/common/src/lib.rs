//! Error helpers shared by the wizard crates.

pub mod error;

pub use error::{FromMessage, UNKNOWN_ERROR, describe_error};
