use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use openssl::hash::{MessageDigest, hash};
use sha2::{Digest, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

/// Digest algorithms that can appear in jar manifests and signature files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse the algorithm part of an attribute such as `SHA-256-Digest`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MD5" => Some(DigestAlgorithm::Md5),
            "SHA" | "SHA1" | "SHA-1" => Some(DigestAlgorithm::Sha1),
            "SHA-256" | "SHA256" => Some(DigestAlgorithm::Sha256),
            "SHA-384" | "SHA384" => Some(DigestAlgorithm::Sha384),
            "SHA-512" | "SHA512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Split `<ALG><suffix>` attribute names, e.g. `SHA-256-Digest-Manifest`
    /// with suffix `-Digest-Manifest`.
    pub fn from_attribute(attribute: &str, suffix: &str) -> Option<Self> {
        let upper = attribute.to_ascii_uppercase();
        let prefix = upper.strip_suffix(&suffix.to_ascii_uppercase())?;
        Self::from_name(prefix)
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            DigestAlgorithm::Sha1 => legacy_digest(MessageDigest::sha1(), data),
            DigestAlgorithm::Md5 => legacy_digest(MessageDigest::md5(), data),
        }
    }

    /// Whether `data` hashes to the base64 encoded `expected` digest.
    pub fn matches(self, data: &[u8], expected: &str) -> bool {
        let expected = match STANDARD.decode(expected.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let calculated = self.digest(data);

        if calculated.len() != expected.len() {
            return false;
        }

        calculated.ct_eq(&expected).into()
    }
}

fn legacy_digest(md: MessageDigest, data: &[u8]) -> Vec<u8> {
    // Only fails when the digest is disabled in the linked openssl, which
    // then can never match
    hash(md, data).map(|d| d.to_vec()).unwrap_or_default()
}

/// Base64 digest of `data`, in the form manifests store it.
pub fn encode_digest(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    STANDARD.encode(algorithm.digest(data))
}
