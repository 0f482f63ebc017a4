use crate::domain::errors::{DomainError, Result};

/// Hub-wide relay behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    shutdown_phrase: String,
    shutdown_reply: String,
}

impl RelaySettings {
    pub fn new(
        shutdown_phrase: impl Into<String>,
        shutdown_reply: impl Into<String>,
    ) -> Result<Self> {
        let shutdown_phrase = shutdown_phrase.into().trim().to_string();
        if shutdown_phrase.is_empty() {
            return Err(DomainError::InvalidShutdownPhrase);
        }

        Ok(Self {
            shutdown_phrase,
            shutdown_reply: shutdown_reply.into(),
        })
    }

    pub fn shutdown_phrase(&self) -> &str {
        &self.shutdown_phrase
    }

    pub fn shutdown_reply(&self) -> &str {
        &self.shutdown_reply
    }

    /// Exact match, ignoring surrounding whitespace
    pub fn is_shutdown_phrase(&self, message: &str) -> bool {
        message.trim() == self.shutdown_phrase
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            shutdown_phrase: "gtfo".to_string(),
            shutdown_reply: "KAY CU".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phrase() {
        let settings = RelaySettings::default();
        assert!(settings.is_shutdown_phrase("gtfo"));
        assert!(settings.is_shutdown_phrase("gtfo\n"));
        assert!(!settings.is_shutdown_phrase("please gtfo"));
        assert_eq!(settings.shutdown_reply(), "KAY CU");
    }

    #[test]
    fn test_rejects_blank_phrase() {
        assert_eq!(
            RelaySettings::new("   ", "bye").unwrap_err(),
            DomainError::InvalidShutdownPhrase
        );
    }
}
