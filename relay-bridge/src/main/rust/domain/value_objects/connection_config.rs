use tracing::level_filters::LevelFilter;

use crate::domain::errors::{DomainError, Result};

/// Static identity of one bridged connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    name: String,
    verbosity: u8,
}

impl ConnectionConfig {
    pub fn new(name: impl Into<String>, verbosity: u8) -> Result<Self> {
        let name = name.into();
        Self::validate_name(&name)?;

        Ok(Self { name, verbosity })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Map the integer log level onto a tracing filter:
    /// 0 off, 1 error, 2 warn, 3 info, 4 debug, 5 and above trace.
    pub fn log_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(DomainError::InvalidConnectionName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ConnectionConfig::new("irc", 3).unwrap();
        assert_eq!(config.name(), "irc");
        assert_eq!(config.verbosity(), 3);
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert!(ConnectionConfig::new("", 3).is_err());
        assert!(ConnectionConfig::new("voice chat", 3).is_err());
        assert!(ConnectionConfig::new("irc:", 3).is_err());
    }

    #[test]
    fn test_log_filter_mapping() {
        assert_eq!(ConnectionConfig::new("a", 0).unwrap().log_filter(), LevelFilter::OFF);
        assert_eq!(ConnectionConfig::new("a", 2).unwrap().log_filter(), LevelFilter::WARN);
        assert_eq!(ConnectionConfig::new("a", 3).unwrap().log_filter(), LevelFilter::INFO);
        assert_eq!(ConnectionConfig::new("a", 9).unwrap().log_filter(), LevelFilter::TRACE);
    }
}
