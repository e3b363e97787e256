//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};

use mailframe::mailbox::{classify_kind, Attachment, FetchedMessage};

/// Builder for `FetchedMessage` instances fed to the scripted mailbox.
pub struct MessageBuilder {
    uid: u32,
    subject: Option<String>,
    sender_address: String,
    sender_name: Option<String>,
    date: Option<DateTime<Local>>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Create a new builder with sensible defaults for testing.
    pub fn new(uid: u32) -> Self {
        Self {
            uid,
            subject: Some("family photos".to_string()),
            sender_address: "sender@example.com".to_string(),
            sender_name: None,
            date: None,
            attachments: vec![],
        }
    }

    /// Set the subject header.
    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set the sender display name and address.
    pub fn from_sender(mut self, name: &str, address: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self.sender_address = address.to_string();
        self
    }

    /// Set the date header from a unix timestamp.
    pub fn sent_at(mut self, timestamp: i64) -> Self {
        self.date = Local.timestamp_opt(timestamp, 0).single();
        self
    }

    /// Append an attachment; kind and index are derived the same way the
    /// message parser derives them.
    pub fn attachment(mut self, filename: &str, content: &[u8]) -> Self {
        let index = self.attachments.len() as u32;
        self.attachments.push(Attachment {
            index,
            filename: filename.to_lowercase(),
            kind: classify_kind(filename),
            content: content.to_vec(),
        });
        self
    }

    /// Build the message.
    pub fn build(self) -> FetchedMessage {
        FetchedMessage {
            uid: self.uid,
            subject: self.subject,
            sender_address: self.sender_address,
            sender_name: self.sender_name,
            date: self.date,
            attachments: self.attachments,
        }
    }
}
