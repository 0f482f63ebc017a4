pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{Connection, PeerOptions, RelayHub, RelayHubBuilder};
pub use config::{BackendSpec, Config};
pub use domain::entities::{ConnectionEvents, ConnectionLifecycle, StateTransition};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{ChatBackend, InboundText, MetricsReporter, RestartScheduler, RestartTask};
pub use domain::value_objects::{
    ConnectionConfig, ConnectionState, EndpointConfig, ReconnectPolicy, RelayLine, RelaySettings,
    RestartCause, SendOutcome,
};
pub use infrastructure::backends::{ConsoleBackend, LineBackend, LineTimeouts, MemoryBackend};
pub use infrastructure::metrics::{serve_metrics, HealthReport, PrometheusReporter};
pub use infrastructure::scheduler::TokioRestartScheduler;
