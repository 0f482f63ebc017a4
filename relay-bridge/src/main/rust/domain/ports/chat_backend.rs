use crate::domain::errors::Result;

/// A decoded inbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub sender: String,
    pub message: String,
}

impl InboundText {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }
}

/// Port for concrete chat backends (voice chat, IRC, console, ...).
///
/// The connection driver owns the lifecycle; implementations only move bytes.
/// All methods take `&self` because `receive` blocks on the listen thread while
/// sends arrive from other connections' threads.
pub trait ChatBackend: Send + Sync {
    /// Establish the raw transport
    fn open(&self) -> Result<()>;

    /// Protocol handshake after a successful open (authentication, join channel)
    fn initialize(&self) -> Result<()>;

    /// Release the transport. Must be idempotent and must unblock a pending `receive`.
    fn close(&self);

    /// Block until the next inbound unit.
    ///
    /// `Ok(Some(_))` is a chat message, `Ok(None)` is protocol traffic handled
    /// internally, and `Err(_)` means the transport is gone.
    fn receive(&self) -> Result<Option<InboundText>>;

    /// Best-effort write of one protocol line
    fn send_raw(&self, line: &str) -> Result<()>;

    /// Write a chat message in the backend's wire form
    fn send_text(&self, text: &str) -> Result<()> {
        self.send_raw(text)
    }

    /// Presence/away/comment text shown to the backend's users; `None` clears it.
    /// Backends without such a notion ignore it.
    fn set_status_text(&self, _text: Option<&str>) -> Result<()> {
        Ok(())
    }

    /// Backend-specific cleanup of inbound text before it is relayed
    fn transform_inbound(&self, text: &str) -> String {
        text.to_string()
    }
}
