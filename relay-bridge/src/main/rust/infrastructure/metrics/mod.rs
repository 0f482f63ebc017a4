mod metrics_server;
mod prometheus_reporter;

pub use metrics_server::{serve_metrics, ConnectionHealth, HealthReport};
pub use prometheus_reporter::PrometheusReporter;
