//! # Signature Status
//!
//! The verdict type shared by commits and whole repositories, and the fold
//! that reduces many verdicts into one.
//!
//! Every variant carries a fixed severity rank. Aggregation keeps the most
//! severe verdict seen, so the result depends only on the multiset of
//! inputs and never on the order they were evaluated in:
//!
//! | rank | variant      | git `%G?` |
//! |------|--------------|-----------|
//! | 0    | `Good`       | `G`       |
//! | 1    | `Untrusted`  | `U`       |
//! | 2    | `Expired`    | `X`       |
//! | 3    | `ExpiredKey` | `Y`       |
//! | 4    | `Unknown`    | `E`       |
//! | 5    | `Unsigned`   | `N`       |
//! | 6    | `Revoked`    | `R`       |
//! | 7    | `Bad`        | `B`       |
//!
//! ## Examples
//!
//! ```
//! use provenance_audit::status::{aggregate, SignatureStatus};
//!
//! let all_good = [SignatureStatus::Good, SignatureStatus::Good];
//! assert_eq!(aggregate(all_good), Some(SignatureStatus::Good));
//!
//! let mixed = [
//!     SignatureStatus::Good,
//!     SignatureStatus::Unsigned,
//!     SignatureStatus::Untrusted,
//! ];
//! assert_eq!(aggregate(mixed), Some(SignatureStatus::Unsigned));
//!
//! // Nothing to fold
//! assert_eq!(aggregate(Vec::new()), None);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cryptographic signing state of a commit, or of a whole history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    /// Valid signature from a trusted key
    Good,
    /// Valid signature, but the validity of the key is unknown
    Untrusted,
    /// Good signature that has expired
    Expired,
    /// Good signature made by a key that has since expired
    ExpiredKey,
    /// A signature is present but cannot be checked, usually a missing key
    Unknown,
    /// No signature at all
    Unsigned,
    /// Good signature made by a revoked key
    Revoked,
    /// Signature does not verify
    Bad,
}

impl SignatureStatus {
    /// Position in the aggregation precedence, higher is worse.
    pub fn severity(self) -> u8 {
        match self {
            SignatureStatus::Good => 0,
            SignatureStatus::Untrusted => 1,
            SignatureStatus::Expired => 2,
            SignatureStatus::ExpiredKey => 3,
            SignatureStatus::Unknown => 4,
            SignatureStatus::Unsigned => 5,
            SignatureStatus::Revoked => 6,
            SignatureStatus::Bad => 7,
        }
    }

    /// Map a `%G?` placeholder from `git log` to a verdict.
    ///
    /// Codes git may add in the future are treated as [`SignatureStatus::Unknown`].
    pub fn from_git_code(code: &str) -> Self {
        match code.trim() {
            "G" => SignatureStatus::Good,
            "U" => SignatureStatus::Untrusted,
            "X" => SignatureStatus::Expired,
            "Y" => SignatureStatus::ExpiredKey,
            "N" => SignatureStatus::Unsigned,
            "R" => SignatureStatus::Revoked,
            "B" => SignatureStatus::Bad,
            _ => SignatureStatus::Unknown,
        }
    }

    pub fn is_good(self) -> bool {
        self == SignatureStatus::Good
    }

    /// The more severe of two verdicts.
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignatureStatus::Good => "GOOD",
            SignatureStatus::Untrusted => "UNTRUSTED",
            SignatureStatus::Expired => "EXPIRED",
            SignatureStatus::ExpiredKey => "EXPIRED_KEY",
            SignatureStatus::Unknown => "UNKNOWN",
            SignatureStatus::Unsigned => "UNSIGNED",
            SignatureStatus::Revoked => "REVOKED",
            SignatureStatus::Bad => "BAD",
        };
        write!(f, "{label}")
    }
}

/// Fold verdicts into the most severe one.
///
/// Returns `None` for an empty input so callers decide what an empty
/// history means instead of getting a silent `Good`. Stops consuming the
/// iterator once `Bad` is seen, since nothing can outrank it.
pub fn aggregate<I>(statuses: I) -> Option<SignatureStatus>
where
    I: IntoIterator<Item = SignatureStatus>,
{
    let mut result: Option<SignatureStatus> = None;
    for status in statuses {
        let current = result.map_or(status, |worst| worst.worst(status));
        result = Some(current);
        if current == SignatureStatus::Bad {
            break;
        }
    }
    result
}
