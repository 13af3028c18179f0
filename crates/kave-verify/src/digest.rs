use std::fmt;

use crate::error::{Result, VerifyError};
use crate::hasher::Sha3_512Hasher;

/// Length of a SHA3-512 digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 128;

/// Lowercase hex SHA3-512 digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Parse a hex digest as it appears in a manifest line.
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != DIGEST_HEX_LEN {
            return Err(VerifyError::InvalidDigest {
                value: value.to_string(),
                reason: "wrong length",
            });
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VerifyError::InvalidDigest {
                value: value.to_string(),
                reason: "not hex",
            });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn of(data: &[u8]) -> Self {
        Self::from_bytes(&Sha3_512Hasher::digest(data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
