//! Error types for the protocol layer.

/// Errors that can occur while reading or writing the wire protocol.
///
/// Everything except [`ProtocolError::Io`] is a *violation*: the peer sent
/// something the server refuses to speak, and the session is terminated
/// with a `protocol_error` notice. I/O failures (EOF, reset) end the
/// session silently.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The underlying stream failed or ended early.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The upgrade request was missing the `GET` line or the key header.
    #[error("bad handshake: {0}")]
    BadHandshake(&'static str),

    /// The upgrade request head exceeded the size cap.
    #[error("handshake request exceeds {max} bytes")]
    HandshakeTooLarge {
        /// The cap that was exceeded.
        max: usize,
    },

    /// The first frame byte was not "final text frame".
    #[error("unsupported frame opcode byte {0:#04x}")]
    UnsupportedOpcode(u8),

    /// A client frame arrived without the mask bit.
    #[error("client frame is not masked")]
    UnmaskedFrame,

    /// The length indicator asked for a 64-bit extended length.
    #[error("unsupported payload length indicator {0}")]
    UnsupportedLength(u8),

    /// The frame payload was not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,

    /// An outbound payload does not fit the frame form being written.
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLong {
        /// Actual payload length.
        len: usize,
        /// Largest length the encoder accepts.
        max: usize,
    },

    /// The token sequence does not match any accepted message shape.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// An invitation code was not 4 lowercase hex characters.
    #[error("invalid invitation code {0:?}")]
    InvalidCode(String),
}

impl ProtocolError {
    /// Returns `true` if the peer broke the protocol, as opposed to the
    /// connection simply failing.
    pub fn is_violation(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_is_not_a_violation() {
        let err = ProtocolError::from(std::io::Error::from(
            std::io::ErrorKind::UnexpectedEof,
        ));
        assert!(!err.is_violation());
    }

    #[test]
    fn test_frame_errors_are_violations() {
        assert!(ProtocolError::UnsupportedOpcode(0x82).is_violation());
        assert!(ProtocolError::UnsupportedLength(127).is_violation());
        assert!(ProtocolError::Malformed("x".into()).is_violation());
    }

    #[test]
    fn test_opcode_display_is_hex() {
        let err = ProtocolError::UnsupportedOpcode(0x88);
        assert_eq!(err.to_string(), "unsupported frame opcode byte 0x88");
    }
}
