//! Hex codec for APDU logging and response matching
//!
//! Two renderings exist for the same bytes: concatenated (`"6A82"`) and
//! space-separated (`"6A 82"`). [`encode`] is the standard form used for matching
//! throughout the workspace; [`encode_spaced`] is only meant for human-readable logs.
//! [`decode`] accepts either form because it strips all whitespace first.

use thiserror::Error;

/// Error returned when a string is not valid hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexError {
    /// Cleaned input has an odd number of digits
    #[error("Hex string has odd length {0}")]
    OddLength(usize),

    /// Cleaned input contains a character outside `[0-9A-Fa-f]`
    #[error("Invalid hex character {character:?} at index {index}")]
    InvalidCharacter {
        /// Offending character
        character: char,
        /// Index into the cleaned string
        index: usize,
    },
}

impl From<::hex::FromHexError> for HexError {
    fn from(error: ::hex::FromHexError) -> Self {
        match error {
            ::hex::FromHexError::InvalidHexCharacter { c, index } => Self::InvalidCharacter {
                character: c,
                index,
            },
            // Only reachable for fixed-size targets, which we never decode into
            ::hex::FromHexError::OddLength | ::hex::FromHexError::InvalidStringLength => {
                Self::OddLength(0)
            }
        }
    }
}

/// Encode bytes as uppercase hex, two digits per byte, no separator
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode_upper(bytes)
}

/// Encode bytes as uppercase hex with a single space between bytes
pub fn encode_spaced(bytes: impl AsRef<[u8]>) -> String {
    let bytes = bytes.as_ref();
    let mut out = String::with_capacity(bytes.len().saturating_mul(3));
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&::hex::encode_upper([*byte]));
    }
    out
}

/// Decode a hex string, ignoring any whitespace
///
/// # Errors
/// Returns [`HexError::OddLength`] if the cleaned string has an odd number of
/// digits and [`HexError::InvalidCharacter`] if it contains a non-hex character.
pub fn decode(input: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        // Report a bad character in preference to the length, it is the more precise error
        if let Some((index, character)) = cleaned
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(HexError::InvalidCharacter { character, index });
        }
        return Err(HexError::OddLength(cleaned.len()));
    }

    ::hex::decode(&cleaned).map_err(HexError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_conventions() {
        let data = [0x00, 0x0A, 0x90, 0xFF];
        assert_eq!(encode(data), "000A90FF");
        assert_eq!(encode_spaced(data), "00 0A 90 FF");
        assert_eq!(encode([]), "");
        assert_eq!(encode_spaced([]), "");
    }

    #[test]
    fn test_decode_strips_whitespace() {
        assert_eq!(decode("90 00").unwrap(), vec![0x90, 0x00]);
        assert_eq!(decode(" ff\nca 00\t00 00 ").unwrap(), vec![0xFF, 0xCA, 0, 0, 0]);
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(
            decode("1G"),
            Err(HexError::InvalidCharacter {
                character: 'G',
                index: 1
            })
        );
        assert_eq!(decode("123"), Err(HexError::OddLength(3)));
        assert_eq!(decode("9 0 0"), Err(HexError::OddLength(3)));
    }

    #[test]
    fn test_round_trip_all_lengths() {
        for len in 0..=256usize {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 + len) as u8).collect();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
            assert_eq!(decode(&encode_spaced(&bytes)).unwrap(), bytes);
        }
    }
}
