//! # Commit Hash
//!
//! Typed identifier for a git object name. Digests are validated once at
//! construction and are immutable afterwards.
//!
//! ## Object Formats
//!
//! - **SHA-1**: 40 hex characters, the default git object format
//! - **SHA-256**: 64 hex characters, repositories created with
//!   `--object-format=sha256`
//!
//! ## Examples
//!
//! ```
//! use provenance_audit::git::hash::CommitHash;
//!
//! let hash: CommitHash = "0b764cd867bff6e471cca0ab009d4874c2b85819".parse().unwrap();
//! assert_eq!(hash.value(), "0b764cd867bff6e471cca0ab009d4874c2b85819");
//! assert_eq!(hash.last(6).unwrap(), "b85819");
//! assert_eq!(format!("{hash:.6}"), "b85819");
//!
//! // Longer than the digest
//! assert!(hash.last(41).is_err());
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Hash algorithm a repository names its objects with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    Sha1,
    Sha256,
}

impl ObjectFormat {
    /// Number of hex characters in a digest of this format
    pub fn hex_len(self) -> usize {
        match self {
            ObjectFormat::Sha1 => 40,
            ObjectFormat::Sha256 => 64,
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(ObjectFormat::Sha1),
            64 => Some(ObjectFormat::Sha256),
            _ => None,
        }
    }
}

/// Full hexadecimal digest of a commit.
///
/// Only ever compared for equality; hashes have no meaningful ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitHash {
    digest: String,
}

impl CommitHash {
    /// Validate and normalise a digest to lowercase.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if ObjectFormat::from_hex_len(value.len()).is_none()
            || !value.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(Error::InvalidCommitHash(value.to_string()));
        }

        Ok(Self {
            digest: value.to_ascii_lowercase(),
        })
    }

    /// The full digest
    pub fn value(&self) -> &str {
        &self.digest
    }

    /// The trailing `n` characters of the digest.
    ///
    /// `n == 0` yields an empty string; `n` beyond the digest length is an
    /// [`Error::OutOfRange`].
    pub fn last(&self, n: usize) -> Result<&str> {
        let length = self.digest.len();
        if n > length {
            return Err(Error::OutOfRange {
                requested: n,
                length,
            });
        }
        Ok(&self.digest[length - n..])
    }

    pub fn format(&self) -> ObjectFormat {
        // Construction guarantees one of the known lengths
        match self.digest.len() {
            64 => ObjectFormat::Sha256,
            _ => ObjectFormat::Sha1,
        }
    }
}

impl FromStr for CommitHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Prints the full digest, or with a precision (`{:.8}`) only that many
/// trailing characters.
impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = match f.precision() {
            Some(n) => &self.digest[self.digest.len().saturating_sub(n)..],
            None => self.digest.as_str(),
        };
        f.write_str(shown)
    }
}

impl AsRef<str> for CommitHash {
    fn as_ref(&self) -> &str {
        &self.digest
    }
}

impl Serialize for CommitHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.digest)
    }
}

impl<'de> Deserialize<'de> for CommitHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        CommitHash::parse(&value).map_err(serde::de::Error::custom)
    }
}
