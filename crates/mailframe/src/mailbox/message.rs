//! Fetched message parsing and attachment classification.

use chrono::{DateTime, Local, TimeZone};
use log::debug;
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

use super::error::{MailboxError, Result};

/// Media kind derived from the attachment filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Unsupported,
}

/// Classifies an attachment by its filename extension, case-insensitive.
/// Anything outside the recognized set, including a missing extension or
/// a missing filename, is unsupported.
pub fn classify_kind(filename: &str) -> AttachmentKind {
    let Some(ext) = filename.rsplit_once('.').map(|(_, ext)| ext) else {
        return AttachmentKind::Unsupported;
    };
    match ext.to_lowercase().as_str() {
        "jpg" | "png" | "gif" | "heic" => AttachmentKind::Image,
        "mp4" | "mov" => AttachmentKind::Video,
        _ => AttachmentKind::Unsupported,
    }
}

/// One non-inline attachment part, in walk order.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Position among the message's qualifying parts, 0-based.
    pub index: u32,
    /// Original filename, lowercased; empty when the part carried none.
    pub filename: String,
    pub kind: AttachmentKind,
    pub content: Vec<u8>,
}

/// A fully fetched message: the headers the slideshow needs plus the
/// ordered attachment parts.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub uid: u32,
    pub subject: Option<String>,
    pub sender_address: String,
    pub sender_name: Option<String>,
    /// Date header rendered in local time, when present and parseable.
    pub date: Option<DateTime<Local>>,
    pub attachments: Vec<Attachment>,
}

/// Parses a raw RFC 822 message into the fields the slideshow consumes.
///
/// A part qualifies as an attachment when it carries a Content-Disposition
/// other than inline; body parts without a disposition are skipped. The
/// walk preserves part order, which fixes each attachment's index.
pub fn parse_message(raw: &[u8], uid: u32) -> Result<FetchedMessage> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailboxError::ParseError("Failed to parse message".to_string()))?;

    let subject = message.subject().map(|s| s.to_string());
    let (sender_name, sender_address) = sender_of(&message);
    let date = local_date_of(&message);

    let mut attachments = Vec::new();
    for part in message.parts.iter() {
        let Some(disposition) = part.content_disposition() else {
            continue;
        };
        if disposition.ctype().eq_ignore_ascii_case("inline") {
            continue;
        }

        let content = match &part.body {
            PartType::Binary(data) | PartType::InlineBinary(data) => data.to_vec(),
            PartType::Text(text) => text.as_bytes().to_vec(),
            PartType::Html(html) => html.as_bytes().to_vec(),
            _ => continue,
        };

        let filename = part
            .attachment_name()
            .map(|n| n.to_lowercase())
            .unwrap_or_default();
        let kind = classify_kind(&filename);

        attachments.push(Attachment {
            index: attachments.len() as u32,
            filename,
            kind,
            content,
        });
    }

    debug!(
        "Parsed message UID={} subject={:?} with {} attachment parts",
        uid,
        subject.as_deref().unwrap_or("(no subject)"),
        attachments.len()
    );

    Ok(FetchedMessage {
        uid,
        subject,
        sender_address,
        sender_name,
        date,
        attachments,
    })
}

/// Extracts the first From address as (display name, address).
fn sender_of(message: &Message) -> (Option<String>, String) {
    let Some(addr) = message.from().and_then(|from| from.first()) else {
        return (None, String::new());
    };
    let name = addr
        .name()
        .map(|n| n.to_string())
        .filter(|n| !n.is_empty());
    let address = addr.address().unwrap_or_default().to_string();
    (name, address)
}

/// Converts the Date header to local time via its epoch timestamp.
fn local_date_of(message: &Message) -> Option<DateTime<Local>> {
    message
        .date()
        .map(|d| d.to_timestamp())
        .and_then(|ts| Local.timestamp_opt(ts, 0).single())
}
