mod chat_backend;
mod metrics_reporter;
mod restart_scheduler;

pub use chat_backend::{ChatBackend, InboundText};
pub use metrics_reporter::MetricsReporter;
pub use restart_scheduler::{RestartScheduler, RestartTask};
