//! # Runtime
//!
//! Process bootstrap and the watch loop that feeds the reconciler.
//!
//! - `initialization.rs` - crypto provider, logging, metrics, HTTP server, client
//! - `watch_loop.rs` - watch, trigger filtering and dispatch
//! - `trigger.rs` - generation-or-annotation change filter
//! - `error_policy.rs` - requeue policy for failed passes

pub mod error_policy;
pub mod initialization;
pub mod trigger;
pub mod watch_loop;
