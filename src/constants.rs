//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Finalizer attached to every `NginxSet` before any other processing
pub const NGINXSET_FINALIZER: &str = "finalizers.nginxset.io";

/// Field manager recorded on writes issued by this controller
pub const FIELD_MANAGER: &str = "nginxset-controller";

/// Failure count at which the controller stops attempting installs
pub const MAX_FAILURES: i64 = 5;

/// Prefix of the terminal Ready message once the failure budget is spent
pub const MAX_ATTEMPTS_EXCEEDED_PREFIX: &str = "exceeded the maximum number of release attempts";

/// Default fixed requeue interval applied after every reconcile pass (seconds)
pub const DEFAULT_SYNC_PERIOD_SECS: u64 = 60;

/// Default number of reconciles allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 2;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default delay before restarting the watch after the stream ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Container image of the managed nginx workload
pub const NGINX_IMAGE: &str = "nginx:1.23.2";

/// Container name inside the managed pod template
pub const NGINX_CONTAINER_NAME: &str = "web";

/// Container port exposed by the managed pod template
pub const NGINX_CONTAINER_PORT: i32 = 80;

/// Label key/value used for the Deployment selector and pod labels
pub const APP_LABEL_KEY: &str = "app";
pub const APP_LABEL_VALUE: &str = "nginx";
