//! APDU command descriptors
//!
//! A [`Command`] bundles the raw bytes of an APDU with the predicate its
//! response has to satisfy and the response buffer capacity the reader should
//! allocate. Decoders declare their command tables as `const` items; commands
//! whose bytes depend on runtime values (offsets, lengths) are built with
//! [`Command::owned`].

use std::fmt;

use bytes::Bytes;

use crate::transport::DEFAULT_BUFFER_SIZE;

/// Predicate a raw response (payload and status word) must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any response is accepted
    Any,
    /// Response must start with these bytes
    Prefix(&'static [u8]),
    /// Response must end with these bytes
    Suffix(&'static [u8]),
}

impl Expect {
    /// Check a raw response against this predicate
    pub fn matches(&self, response: &[u8]) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => response.starts_with(prefix),
            Self::Suffix(suffix) => response.ends_with(suffix),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Prefix(prefix) => write!(f, "prefix {}", crate::hex::encode(prefix)),
            Self::Suffix(suffix) => write!(f, "suffix {}", crate::hex::encode(suffix)),
        }
    }
}

/// A command and what its response must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    apdu: Bytes,
    expect: Expect,
    capacity: usize,
}

impl Command {
    /// Create a command from static bytes, with the default response capacity
    pub const fn new(name: &'static str, apdu: &'static [u8], expect: Expect) -> Self {
        Self {
            name,
            apdu: Bytes::from_static(apdu),
            expect,
            capacity: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a command from bytes computed at runtime
    pub fn owned(name: &'static str, apdu: impl Into<Bytes>, expect: Expect) -> Self {
        Self {
            name,
            apdu: apdu.into(),
            expect,
            capacity: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the response buffer capacity
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Short human-readable name used in logs and errors
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Raw APDU bytes
    pub fn apdu(&self) -> &[u8] {
        &self.apdu
    }

    /// Expected-response predicate
    pub const fn expect(&self) -> Expect {
        self.expect
    }

    /// Response buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check whether a raw response satisfies this command's predicate
    pub fn accepts(&self, response: &[u8]) -> bool {
        self.expect.matches(response)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, crate::hex::encode(&self.apdu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const SELECT: Command = Command::new(
        "select",
        &[0x00, 0xA4, 0x04, 0x00, 0x08, 0xA0, 0x00, 0x00, 0x00, 0x54, 0x48, 0x00, 0x01],
        Expect::Prefix(&[0x61]),
    );

    #[test]
    fn test_expect_matches() {
        assert!(Expect::Prefix(&[0x61, 0x0D]).matches(&hex!("610D")));
        assert!(!Expect::Prefix(&[0x61, 0x0D]).matches(&hex!("6A82")));
        assert!(Expect::Suffix(&[0x90, 0x00]).matches(&hex!("01029000")));
        assert!(!Expect::Suffix(&[0x90, 0x00]).matches(&hex!("90")));
        assert!(Expect::Any.matches(&[]));
    }

    #[test]
    fn test_const_command() {
        assert_eq!(SELECT.name(), "select");
        assert_eq!(SELECT.capacity(), DEFAULT_BUFFER_SIZE);
        assert!(SELECT.accepts(&hex!("6117")));
        assert!(!SELECT.accepts(&hex!("6E00")));
        assert_eq!(SELECT.to_string(), "select [00A4040008A000000054480001]");
    }

    #[test]
    fn test_owned_command() {
        let cmd = Command::owned("read", vec![0xCC, 0x06, 0x00, 0x00, 0x0D], Expect::Any)
            .with_capacity(15);
        assert_eq!(cmd.apdu(), &hex!("CC0600000D"));
        assert_eq!(cmd.capacity(), 15);
    }
}
