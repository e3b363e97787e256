//! Async IMAP session over TLS.

use async_imap::Session;
use async_native_tls::TlsConnector;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use super::error::{MailboxError, Result};

/// Underlying async stream (async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

const IMAPS_PORT: u16 = 993;

/// Long-lived authenticated IMAP session bound to one folder.
pub struct ImapSession {
    session: Option<Session<TlsStream>>,
    server: String,
    login: String,
    password: SecretString,
    folder: String,
}

impl ImapSession {
    pub fn new(
        server: impl Into<String>,
        login: impl Into<String>,
        password: SecretString,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            session: None,
            server: server.into(),
            login: login.into(),
            password,
            folder: folder.into(),
        }
    }

    /// Connects, authenticates, logs the account's folder list, and
    /// selects the watched folder for read-write access.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        let addr = format!("{}:{}", self.server, IMAPS_PORT);
        info!("Connecting to IMAP server at {}", addr);

        // Establish TCP connection using std::net and wrap with async-io
        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;

        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(&self.server, tcp_stream)
            .await
            .map_err(|e| MailboxError::TlsError(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream);
        let mut session = client
            .login(&self.login, self.password.expose_secret())
            .await
            .map_err(|(e, _)| MailboxError::AuthenticationFailed(e.to_string()))?;

        info!("Successfully authenticated to IMAP server");

        match list_folder_names(&mut session).await {
            Ok(folders) => info!("Folders: {:?}", folders),
            Err(e) => warn!("Failed to list folders: {}", e),
        }

        let mailbox = session.select(&self.folder).await.map_err(|e| {
            if e.to_string().contains("Mailbox doesn't exist") || e.to_string().contains("NO") {
                MailboxError::FolderNotFound(self.folder.clone())
            } else {
                MailboxError::ProtocolError(e.to_string())
            }
        })?;

        debug!(
            "Folder '{}' selected with {} messages",
            self.folder, mailbox.exists
        );
        self.session = Some(session);
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session
            .as_mut()
            .ok_or_else(|| MailboxError::ConnectionFailed("Not connected".to_string()))
    }

    /// Returns every UID in the selected folder, ascending.
    pub async fn search_all(&mut self) -> Result<Vec<u32>> {
        let session = self.session_mut()?;

        let uids = session
            .uid_search("ALL")
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Folder listing holds {} messages", uid_list.len());
        Ok(uid_list)
    }

    /// Fetches only the envelope of a message and returns its decoded
    /// subject. `Ok(None)` means the message vanished since the listing.
    pub async fn fetch_subject(&mut self, uid: u32) -> Result<Option<Option<String>>> {
        let session = self.session_mut()?;

        let mut messages = session
            .uid_fetch(uid.to_string(), "(UID ENVELOPE)")
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let Some(message_result) = messages.next().await else {
            return Ok(None);
        };
        let message = message_result.map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let subject = message
            .envelope()
            .and_then(|env| env.subject.as_ref())
            .and_then(|raw| decode_header_value(raw));
        Ok(Some(subject))
    }

    /// Fetches a full message with BODY.PEEK[] so it is not marked read.
    /// `Ok(None)` means the message vanished since the listing.
    pub async fn fetch_body(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let session = self.session_mut()?;

        debug!("Fetching message with UID {}", uid);

        let mut messages = session
            .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let Some(message_result) = messages.next().await else {
            return Ok(None);
        };
        let message = message_result.map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let body = message
            .body()
            .ok_or_else(|| MailboxError::ProtocolError("Message has no body".to_string()))?;
        Ok(Some(body.to_vec()))
    }

    /// Moves a message to another folder. A failed MOVE is re-checked
    /// against the live folder: if the UID is already gone the move is
    /// treated as complete, so repeating a disposition never errors.
    pub async fn move_to(&mut self, uid: u32, folder: &str) -> Result<()> {
        let session = self.session_mut()?;

        if let Err(e) = session.uid_mv(uid.to_string(), folder).await {
            let still_present = session
                .uid_search(format!("UID {}", uid))
                .await
                .map_err(|se| MailboxError::ProtocolError(se.to_string()))?
                .contains(&uid);
            if still_present {
                return Err(MailboxError::MoveFailed {
                    uid,
                    folder: folder.to_string(),
                    reason: e.to_string(),
                });
            }
            debug!("UID {} already gone from the folder, move treated as done", uid);
        }
        Ok(())
    }

    /// Logs out gracefully. Harmless when not connected.
    pub async fn logout(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Logging out of IMAP server");
            session
                .logout()
                .await
                .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;
        }
        Ok(())
    }

    /// Drops the dead session state so the next connect starts clean.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            debug!("Discarding broken IMAP session");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapSession dropped without explicit logout - session will be closed");
        }
    }
}

async fn list_folder_names(session: &mut Session<TlsStream>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    {
        let mut stream = session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;
        while let Some(item) = stream.next().await {
            let name = item.map_err(|e| MailboxError::ProtocolError(e.to_string()))?;
            names.push(name.name().to_string());
        }
    }
    Ok(names)
}

/// Decodes a raw header value, including RFC 2047 encoded words, by
/// running it through the message parser as a synthetic header block.
fn decode_header_value(raw: &[u8]) -> Option<String> {
    let mut synthetic = Vec::with_capacity(raw.len() + 13);
    synthetic.extend_from_slice(b"Subject: ");
    synthetic.extend_from_slice(raw);
    synthetic.extend_from_slice(b"\r\n\r\n");

    mail_parser::MessageParser::default()
        .parse(&synthetic)
        .and_then(|m| m.subject().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> ImapSession {
        ImapSession::new(
            "imap.example.com",
            "frame@example.com",
            SecretString::from("hunter2".to_string()),
            "INBOX",
        )
    }

    #[test]
    fn test_session_starts_disconnected() {
        let session = test_session();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_reset_without_session_is_harmless() {
        let mut session = test_session();
        session.reset();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_decode_plain_header() {
        assert_eq!(
            decode_header_value(b"Family photos"),
            Some("Family photos".to_string())
        );
    }

    #[test]
    fn test_decode_rfc2047_header() {
        assert_eq!(
            decode_header_value(b"=?utf-8?B?SGVsbG8gV29ybGQ=?="),
            Some("Hello World".to_string())
        );
    }
}
