use std::time::Duration;

/// Deferred work handed to a scheduler
pub type RestartTask = Box<dyn FnOnce() + Send + 'static>;

/// Port for running a restart after a fixed delay, off the caller's execution context
pub trait RestartScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: RestartTask);
}
