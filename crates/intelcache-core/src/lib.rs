//! Intelcache Core - Types and error handling shared by the refresh pipeline

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
