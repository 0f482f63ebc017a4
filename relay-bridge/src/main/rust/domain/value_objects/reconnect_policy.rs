use std::fmt;
use std::time::Duration;

use crate::domain::errors::{DomainError, Result};

/// Why a connection is being restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCause {
    /// An established session dropped
    Lost,
    /// Open or handshake did not succeed
    Failed,
}

impl fmt::Display for RestartCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lost => write!(f, "lost"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Fixed-delay reconnect configuration. There is no growth and no retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    lost_delay: Duration,
    failed_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(lost_delay: Duration, failed_delay: Duration) -> Result<Self> {
        if lost_delay.is_zero() || failed_delay.is_zero() {
            return Err(DomainError::InvalidReconnectDelay);
        }

        Ok(Self {
            lost_delay,
            failed_delay,
        })
    }

    pub fn lost_delay(&self) -> Duration {
        self.lost_delay
    }

    pub fn failed_delay(&self) -> Duration {
        self.failed_delay
    }

    /// Delay before the next `start()`; identical for every attempt of the same cause
    pub fn delay_for(&self, cause: RestartCause) -> Duration {
        match cause {
            RestartCause::Lost => self.lost_delay,
            RestartCause::Failed => self.failed_delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            lost_delay: Duration::from_secs(5),
            failed_delay: Duration::from_secs(15),
        }
    }
}
