use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Open failed: {0}")]
    OpenFailure(String),

    #[error("Initialization failed: {0}")]
    InitFailure(String),

    #[error("Transport lost: {0}")]
    TransportLost(String),

    #[error("Send dropped: {0} is not established")]
    SendDropped(String),

    #[error("Invalid connection name: {0:?}")]
    InvalidConnectionName(String),

    #[error("Invalid port: port cannot be zero")]
    InvalidPort,

    #[error("Invalid host: {0:?}")]
    InvalidHost(String),

    #[error("Invalid reconnect delay: must be greater than zero")]
    InvalidReconnectDelay,

    #[error("Invalid shutdown phrase: must not be blank")]
    InvalidShutdownPhrase,

    #[error("Invalid backend spec: {0}")]
    InvalidBackendSpec(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
