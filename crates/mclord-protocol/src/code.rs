//! Invitation codes: the 4-character keys players use to find a room.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::ProtocolError;

/// Number of characters in an invitation code.
pub const CODE_LEN: usize = 4;

/// A room's invitation code: exactly 4 lowercase hex characters.
///
/// Stored as raw ASCII bytes so the type is `Copy` and cheap to use as a
/// `HashMap` key. The only ways to obtain one are [`InvitationCode::generate`]
/// and parsing, both of which uphold the character-set invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvitationCode([u8; CODE_LEN]);

impl InvitationCode {
    /// Mints a random code from two random bytes.
    ///
    /// Two cosmetic substitutions keep codes friendly: a code spelling
    /// `dead` is replaced by a random 4-digit number, and any `666` run
    /// becomes `545`. Digits are valid hex, so the result still parses.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let high: u8 = rng.random();
        let low: u8 = rng.random();
        let replacement: u16 = rng.random_range(1000..10000);
        Self::from_parts(high, low, replacement)
    }

    fn from_parts(high: u8, low: u8, replacement: u16) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";

        let mut code = [
            HEX[usize::from(high >> 4)],
            HEX[usize::from(high & 0x0f)],
            HEX[usize::from(low >> 4)],
            HEX[usize::from(low & 0x0f)],
        ];

        if &code == b"dead" {
            let mut n = replacement;
            for slot in code.iter_mut().rev() {
                *slot = b'0' + (n % 10) as u8;
                n /= 10;
            }
        }

        // Leftmost match wins, like a left-to-right string replace.
        if &code[0..3] == b"666" {
            code[0..3].copy_from_slice(b"545");
        } else if &code[1..4] == b"666" {
            code[1..4].copy_from_slice(b"545");
        }

        Self(code)
    }

    /// Returns `true` if `text` is 4 characters from `[0-9a-f]`.
    pub fn is_valid(text: &str) -> bool {
        text.len() == CODE_LEN
            && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl FromStr for InvitationCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(ProtocolError::InvalidCode(s.to_string()));
        }
        let mut code = [0u8; CODE_LEN];
        code.copy_from_slice(s.as_bytes());
        Ok(Self(code))
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}
