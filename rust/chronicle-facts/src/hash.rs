//! Canonical, content-addressed hashing.
//!
//! A [`Hash`] is the base64url-without-padding encoding of a 32-byte BLAKE3
//! digest over a fact's canonical byte encoding (see [`crate::canonical`]).
//! Two facts with structurally equal canonicalizations always produce the
//! same [`Hash`], regardless of platform (spec §4.1, §6, §8).

use base64::Engine;
use std::fmt;

use crate::FactError;

/// Number of bytes in a digest.
pub const HASH_SIZE: usize = 32;

const ENGINE: base64::engine::GeneralPurpose = base64::engine::GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    base64::engine::general_purpose::NO_PAD,
);

/// A content hash: the BLAKE3 digest of a fact's canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactHash([u8; HASH_SIZE]);

impl FactHash {
    /// Hash `bytes` directly, producing the digest without any
    /// canonicalization. Used by [`crate::Fact::reference`] once the fact's
    /// canonical byte form has already been produced.
    pub fn digest<B: AsRef<[u8]>>(bytes: B) -> Self {
        Self(*blake3::hash(bytes.as_ref()).as_bytes())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// The canonical textual form: base64url, no padding, 43 characters.
    pub fn to_text(&self) -> String {
        ENGINE.encode(self.0)
    }
}

impl fmt::Display for FactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl fmt::Debug for FactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactHash({})", self.to_text())
    }
}

impl From<[u8; HASH_SIZE]> for FactHash {
    fn from(value: [u8; HASH_SIZE]) -> Self {
        Self(value)
    }
}

impl TryFrom<Vec<u8>> for FactHash {
    type Error = FactError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let got = value.len();
        let bytes: [u8; HASH_SIZE] = value
            .try_into()
            .map_err(|_| FactError::InvalidHash { expected: HASH_SIZE, got })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&str> for FactHash {
    type Error = FactError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = ENGINE
            .decode(value)
            .map_err(|error| FactError::InvalidHashText(error.to_string()))?;
        bytes.try_into()
    }
}

impl TryFrom<String> for FactHash {
    type Error = FactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<FactHash> for String {
    fn from(value: FactHash) -> Self {
        value.to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_as_43_characters() {
        let hash = FactHash::digest(b"hello");
        assert_eq!(hash.to_text().len(), 43);
    }

    #[test]
    fn it_round_trips_through_text() {
        let hash = FactHash::digest(b"hello world");
        let text = hash.to_text();
        let parsed = FactHash::try_from(text.as_str()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn it_is_deterministic() {
        assert_eq!(FactHash::digest(b"same"), FactHash::digest(b"same"));
        assert_ne!(FactHash::digest(b"a"), FactHash::digest(b"b"));
    }
}
