//! Text-frame encoding and decoding.
//!
//! The server speaks a deliberately tiny subset of the framing protocol:
//!
//! - Inbound frames must be *final text frames* (`0x81`), masked, with a
//!   7-bit or 16-bit length. 64-bit lengths are refused outright so a
//!   client cannot make the server allocate huge buffers.
//! - Outbound frames are final text frames, unmasked, with a 7-bit length.
//!   Every server message fits in 125 bytes.
//!
//! ```text
//!  byte 0      byte 1           [bytes 2-3]     mask (4)   payload
//! +--------+-+-------+      +---------------+ +--------+ +---------+
//! |  0x81  |M| len7  |      | len16 (BE) if | |  key   | | data ^  |
//! |        | |       |      |  len7 == 126  | |        | | key[i%4]|
//! +--------+-+-------+      +---------------+ +--------+ +---------+
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::ProtocolError;

/// First byte of every accepted frame: FIN bit + text opcode.
pub const FINAL_TEXT_FRAME: u8 = 0x81;

/// Largest payload that fits the 7-bit length form.
pub const MAX_SHORT_PAYLOAD: usize = 125;

/// Largest payload that fits the 16-bit extended length form.
pub const MAX_EXTENDED_PAYLOAD: usize = u16::MAX as usize;

const MASK_BIT: u8 = 0x80;
const LENGTH_BITS: u8 = 0x7f;
const EXTENDED_16: u8 = 126;

/// Encodes a server→client text frame (unmasked, 7-bit length).
///
/// # Errors
/// Returns [`ProtocolError::PayloadTooLong`] if `payload` exceeds
/// [`MAX_SHORT_PAYLOAD`] bytes. The server's own vocabulary never does,
/// so hitting this is a bug in the caller.
pub fn encode_text(payload: &str) -> Result<Vec<u8>, ProtocolError> {
    let bytes = payload.as_bytes();
    if bytes.len() > MAX_SHORT_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong {
            len: bytes.len(),
            max: MAX_SHORT_PAYLOAD,
        });
    }

    let mut frame = Vec::with_capacity(2 + bytes.len());
    frame.push(FINAL_TEXT_FRAME);
    frame.push(bytes.len() as u8);
    frame.extend_from_slice(bytes);
    Ok(frame)
}

/// Encodes a client→server frame: masked, using the 16-bit extended
/// length when the payload is longer than 125 bytes.
///
/// The server never sends masked frames; this exists for test clients and
/// tooling that need to talk to it.
///
/// # Errors
/// Returns [`ProtocolError::PayloadTooLong`] past [`MAX_EXTENDED_PAYLOAD`].
pub fn encode_masked(
    payload: &[u8],
    mask: [u8; 4],
) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_EXTENDED_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong {
            len: payload.len(),
            max: MAX_EXTENDED_PAYLOAD,
        });
    }

    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.push(FINAL_TEXT_FRAME);
    if payload.len() <= MAX_SHORT_PAYLOAD {
        frame.push(MASK_BIT | payload.len() as u8);
    } else {
        frame.push(MASK_BIT | EXTENDED_16);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    }
    frame.extend_from_slice(&mask);
    frame.extend(
        payload
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ mask[i % 4]),
    );
    Ok(frame)
}

/// Reads one client frame and returns its unmasked payload bytes.
///
/// # Errors
/// - [`ProtocolError::UnsupportedOpcode`]: first byte is not `0x81`
/// - [`ProtocolError::UnmaskedFrame`]: mask bit not set
/// - [`ProtocolError::UnsupportedLength`]: 64-bit length indicator
/// - [`ProtocolError::Io`]: the stream ended or failed mid-frame
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let first = reader.read_u8().await?;
    if first != FINAL_TEXT_FRAME {
        return Err(ProtocolError::UnsupportedOpcode(first));
    }

    let second = reader.read_u8().await?;
    if second & MASK_BIT == 0 {
        return Err(ProtocolError::UnmaskedFrame);
    }
    let len = match second & LENGTH_BITS {
        short @ 0..=125 => usize::from(short),
        EXTENDED_16 => usize::from(reader.read_u16().await?),
        other => return Err(ProtocolError::UnsupportedLength(other)),
    };

    let mut mask = [0u8; 4];
    reader.read_exact(&mut mask).await?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }

    tracing::trace!(len, "frame received");
    Ok(payload)
}

/// Reads one client frame and decodes its payload as UTF-8 text.
pub async fn read_text<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let payload = read_frame(reader).await?;
    String::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)
}
