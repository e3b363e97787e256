//! Mailbox error types.

use thiserror::Error;

/// Errors raised while talking to the IMAP server or parsing messages.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// IMAP protocol error.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse a fetched message.
    #[error("Failed to parse message: {0}")]
    ParseError(String),

    /// Folder not found on the server.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// A remote move failed and the message is still present.
    #[error("Failed to move message {uid} to '{folder}': {reason}")]
    MoveFailed {
        uid: u32,
        folder: String,
        reason: String,
    },

    /// A reconnect wait was cut short by the termination signal.
    #[error("Interrupted by shutdown")]
    Interrupted,

    /// IO error on the underlying stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<async_native_tls::Error> for MailboxError {
    fn from(err: async_native_tls::Error) -> Self {
        MailboxError::TlsError(err.to_string())
    }
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailboxError>;
