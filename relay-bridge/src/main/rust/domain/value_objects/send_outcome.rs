/// What happened to an outbound payload handed to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the backend
    Sent,
    /// Connection not established; nothing was written
    Dropped,
    /// The write failed and the connection was declared lost
    Failed,
}

