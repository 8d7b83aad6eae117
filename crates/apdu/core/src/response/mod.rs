//! APDU response parsing
//!
//! A response is the payload returned by the card followed by the two
//! status bytes SW1 SW2.

pub mod error;
pub mod status;

use tracing::trace;

use error::ResponseError;
use status::StatusWord;

/// Split raw response data into its status word and payload
///
/// # Errors
/// Returns an error if the data is too short to contain a status word.
pub fn split_status(data: &[u8]) -> Result<(StatusWord, &[u8]), ResponseError> {
    match data {
        [payload @ .., sw1, sw2] => {
            let status = StatusWord::new(*sw1, *sw2);
            trace!(%status, payload_len = payload.len(), "Split APDU response");
            Ok((status, payload))
        }
        _ => Err(ResponseError::Incomplete(data.len())),
    }
}

/// Payload of a response whose status word is 90 00
///
/// # Errors
/// Returns [`ResponseError::Status`] for any other status word.
pub fn success_payload(data: &[u8]) -> Result<&[u8], ResponseError> {
    let (status, payload) = split_status(data)?;
    if status.is_success() {
        Ok(payload)
    } else {
        Err(ResponseError::Status { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_split_status() {
        let (status, payload) = split_status(&hex!("0102039000")).unwrap();
        assert_eq!(payload, &hex!("010203"));
        assert!(status.is_success());

        let (status, payload) = split_status(&hex!("610D")).unwrap();
        assert!(payload.is_empty());
        assert_eq!(status.remaining_bytes(), Some(0x0D));

        assert_eq!(split_status(&[0x90]), Err(ResponseError::Incomplete(1)));
    }

    #[test]
    fn test_success_payload() {
        assert_eq!(success_payload(&hex!("019000")).unwrap(), &[0x01]);
        assert!(success_payload(&hex!("6A82")).unwrap_err().has_status(0x6A82));
    }
}
