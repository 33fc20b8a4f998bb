//! Utilities Module
//!
//! Logging, configuration and HTTP helpers shared across the crate.

mod http;
pub mod logging;
pub mod settings;

pub use http::*;
pub use settings::*;
