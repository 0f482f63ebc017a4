use crate::domain::errors::{DomainError, Result};

/// Where and as whom a network backend connects
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    host: String,
    port: u16,
    identity: String,
    channel: String,
    password: Option<String>,
}

impl EndpointConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() || host.contains(char::is_whitespace) {
            return Err(DomainError::InvalidHost(host));
        }
        if port == 0 {
            return Err(DomainError::InvalidPort);
        }

        Ok(Self {
            host,
            port,
            identity: identity.into(),
            channel: channel.into(),
            password: None,
        })
    }

    /// Attach a password; blank passwords are treated as absent
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
