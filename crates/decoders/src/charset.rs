//! Text decoding for card fields

use encoding_rs::{BIG5, Encoding, WINDOWS_874};

use crate::error::DecodeError;

/// Decode Big5 text, dropping NUL padding
pub fn big5(field: &'static str, raw: &[u8]) -> Result<String, DecodeError> {
    decode_strict(BIG5, field, raw).map(|text| text.replace('\0', "").trim().to_string())
}

/// Decode TIS-620 text
///
/// Windows-874 is a superset of TIS-620, so every TIS-620 byte decodes the same way.
pub fn tis620(field: &'static str, raw: &[u8]) -> Result<String, DecodeError> {
    decode_strict(WINDOWS_874, field, raw)
}

/// Decode ASCII text, trimming padding
pub fn ascii(field: &'static str, raw: &[u8]) -> Result<String, DecodeError> {
    if !raw.is_ascii() {
        return Err(DecodeError::Encoding {
            field,
            charset: "ASCII",
        });
    }
    Ok(String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string())
}

fn decode_strict(
    encoding: &'static Encoding,
    field: &'static str,
    raw: &[u8],
) -> Result<String, DecodeError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(raw)
        .map(|text| text.into_owned())
        .ok_or(DecodeError::Encoding {
            field,
            charset: encoding.name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_big5_strips_padding() {
        // 王小明 followed by NUL and space padding
        let raw = hex!("A4FDA470A9FA000020");
        assert_eq!(big5("name", &raw).unwrap(), "王小明");
    }

    #[test]
    fn test_tis620() {
        // นาย
        assert_eq!(tis620("name", &hex!("B9D2C2")).unwrap(), "นาย");
    }

    #[test]
    fn test_ascii() {
        assert_eq!(ascii("id", b" A123456789\0\0").unwrap(), "A123456789");
        assert_eq!(
            ascii("id", &[0x41, 0xC8]),
            Err(DecodeError::Encoding {
                field: "id",
                charset: "ASCII"
            })
        );
    }
}
