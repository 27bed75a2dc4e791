//! # Configuration
//!
//! Controller and HTTP server configuration, read from environment variables
//! with defaults from [`crate::constants`].

mod controller;

pub use controller::{ControllerConfig, LogFormat, ServerConfig};
