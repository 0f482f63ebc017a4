mod tokio_scheduler;

pub use tokio_scheduler::TokioRestartScheduler;
