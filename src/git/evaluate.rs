//! # Signature Evaluators
//!
//! Policies that decide the verdict of a single commit. The repository
//! verdict is the most severe of these per-commit verdicts, see
//! [`crate::status::aggregate`].
//!
//! - [`RecordedVerdict`] trusts whatever the version-control collaborator
//!   reported, which for git means its gpg keyring is the trust anchor.
//! - [`TrustedKeys`] additionally pins the set of keys allowed to produce a
//!   `Good` verdict.
//!
//! ## Examples
//!
//! ```
//! use provenance_audit::git::evaluate::TrustedKeys;
//!
//! let policy = TrustedKeys::new(["4AEE18F83AFDEB23"]);
//! assert!(policy.trusts("4aee18f83afdeb23"));
//! assert!(!policy.trusts("0123456789ABCDEF"));
//! ```

use crate::git::commit::CommitRecord;
use crate::status::SignatureStatus;
use std::collections::HashSet;

/// Short key ids below this length are too collision prone to match on
const MIN_KEY_ID_LEN: usize = 8;

/// Classifies the signing state of one commit
pub trait SignatureEvaluator: Send + Sync {
    fn evaluate(&self, commit: &CommitRecord) -> SignatureStatus;
}

/// Uses the verdict the collaborator attached to the commit
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedVerdict;

impl SignatureEvaluator for RecordedVerdict {
    fn evaluate(&self, commit: &CommitRecord) -> SignatureStatus {
        commit.signature
    }
}

/// Accepts `Good` signatures only from an explicit set of keys.
///
/// Good signatures from any other key become [`SignatureStatus::Untrusted`];
/// every other verdict is passed through unchanged.
#[derive(Debug, Clone, Default)]
pub struct TrustedKeys {
    keys: HashSet<String>,
}

impl TrustedKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys.into_iter().map(|k| normalize_key(k.as_ref())).collect(),
        }
    }

    /// Whether `key` names one of the trusted keys.
    ///
    /// Long fingerprints and short key ids refer to the same key when one is
    /// a suffix of the other.
    pub fn trusts(&self, key: &str) -> bool {
        let key = normalize_key(key);
        if key.len() < MIN_KEY_ID_LEN {
            return false;
        }
        self.keys.iter().any(|trusted| {
            trusted.len() >= MIN_KEY_ID_LEN && (trusted.ends_with(&key) || key.ends_with(trusted))
        })
    }
}

impl SignatureEvaluator for TrustedKeys {
    fn evaluate(&self, commit: &CommitRecord) -> SignatureStatus {
        match commit.signature {
            SignatureStatus::Good => match commit.key.as_deref() {
                Some(key) if self.trusts(key) => SignatureStatus::Good,
                _ => SignatureStatus::Untrusted,
            },
            other => other,
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}
