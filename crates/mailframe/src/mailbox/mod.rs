//! Remote mailbox access over IMAP.
//!
//! The watched folder is the source of truth for what the frame shows:
//! listing, subject screening, full fetches, and disposition moves all go
//! through the `Mailbox` capability trait, whose production implementation
//! wraps a single long-lived TLS session.

pub mod error;
pub mod message;
pub mod session;
pub mod sync;

pub use error::MailboxError;
pub use message::{classify_kind, Attachment, AttachmentKind, FetchedMessage};
pub use session::ImapSession;
pub use sync::{
    Disposition, Mailbox, MailboxSync, ScreenOutcome, ARCHIVE_FOLDER, REJECT_FOLDER, TRASH_FOLDER,
};
