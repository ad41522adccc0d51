//! The connection-upgrade handshake.
//!
//! A client opens with an HTTP `GET` carrying a `Sec-WebSocket-Key`
//! header. The server proves it understood the upgrade by hashing that key
//! together with a fixed GUID and echoing the result back in a `101`
//! response. Anything else gets a `400` and the connection is dropped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

use crate::ProtocolError;

/// Upper bound on the request head. Real upgrade requests are a few hundred
/// bytes.
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Reply sent when the request is not a valid upgrade.
pub const BAD_REQUEST_RESPONSE: &str =
    "HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n";

const KEY_HEADER: &str = "Sec-WebSocket-Key";
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A parsed upgrade request. Only the key matters to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    key: String,
}

impl UpgradeRequest {
    /// Parses a request head (everything up to the blank line).
    ///
    /// Requires the request to start with `GET` and to carry a non-empty
    /// `Sec-WebSocket-Key` header. Header names are matched
    /// case-insensitively.
    pub fn parse(head: &str) -> Result<Self, ProtocolError> {
        if !head.starts_with("GET") {
            return Err(ProtocolError::BadHandshake("missing GET request line"));
        }

        let key = head
            .split("\r\n")
            .skip(1)
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(KEY_HEADER))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or(ProtocolError::BadHandshake("missing Sec-WebSocket-Key"))?;

        Ok(Self { key: key.to_string() })
    }

    /// The client's key, as sent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The full `101 Switching Protocols` response for this request.
    pub fn accept_response(&self) -> String {
        switching_protocols_response(&accept_token(&self.key))
    }
}

/// Computes `base64(SHA-1(key + GUID))`.
pub fn accept_token(key: &str) -> String {
    derive_accept_key(key.as_bytes())
}

/// Builds the `101` response carrying `token`.
pub fn switching_protocols_response(token: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Accept: {token}\r\n\
         \r\n"
    )
}

/// Reads the request head up to and including the blank line.
///
/// Bytes after the terminator stay buffered in `reader` for frame
/// decoding.
///
/// # Errors
/// - [`ProtocolError::HandshakeTooLarge`] past [`MAX_REQUEST_HEAD`] bytes
/// - [`ProtocolError::Io`] if the stream ends first
pub async fn read_request_head<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut head = Vec::with_capacity(512);
    let mut limited = (&mut *reader).take(MAX_REQUEST_HEAD as u64);

    loop {
        let n = limited.read_until(b'\n', &mut head).await?;
        if head.ends_with(HEAD_TERMINATOR) {
            break;
        }
        if head.len() >= MAX_REQUEST_HEAD {
            return Err(ProtocolError::HandshakeTooLarge {
                max: MAX_REQUEST_HEAD,
            });
        }
        if n == 0 {
            return Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed during handshake",
            )));
        }
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}
