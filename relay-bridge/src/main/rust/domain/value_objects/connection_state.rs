use std::fmt;

/// Lifecycle states of a single backend connection (pure domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Constructed or torn down; ready to be started
    #[default]
    Idle,
    /// Transport being established
    Opening,
    /// Transport open, protocol handshake in progress
    Initializing,
    /// Handshake complete, listen loop running
    Connected,
    /// Teardown requested by `stop()`
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Opening => write!(f, "OPENING"),
            Self::Initializing => write!(f, "INITIALIZING"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Closing => write!(f, "CLOSING"),
        }
    }
}

impl ConnectionState {
    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Opening => 1.0,
            Self::Initializing => 2.0,
            Self::Connected => 3.0,
            Self::Closing => 4.0,
        }
    }

    /// Usable for sending
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// A start request in this state is a no-op
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}
