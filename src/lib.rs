//! NginxSet Controller Library
//!
//! This library provides the core functionality for the NginxSet Controller.
//! Unit tests live next to the code; end-to-end passes are in `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use nginxset_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

// Re-export modules so they can be tested
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
