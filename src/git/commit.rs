use crate::git::hash::CommitHash;
use crate::status::SignatureStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates the fields of one commit in the log output
pub const FIELD_SEPARATOR: char = '\u{1f}';
/// Terminates each commit in the log output
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// `git log --format` string matching [`parse_log`]
pub const LOG_FORMAT: &str = "%H%x1f%P%x1f%an%x1f%ae%x1f%ct%x1f%G?%x1f%GS%x1f%GK%x1f%s%x1e";

const FIELD_COUNT: usize = 9;

/// Commit fields exactly as reported by the version-control collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCommit {
    pub hash: String,
    /// Space separated parent hashes, empty for a root commit
    pub parents: String,
    pub author_name: String,
    pub author_email: String,
    /// Committer time in seconds since the epoch
    pub timestamp: String,
    /// `%G?` placeholder
    pub signature_code: String,
    pub signer: String,
    pub key: String,
    pub subject: String,
}

/// One entry of a repository's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: CommitHash,
    /// Empty for the genesis commit
    pub parents: Vec<CommitHash>,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub signature: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl CommitRecord {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Convert collaborator output into a typed record, describing the
    /// first field that fails to parse.
    pub fn from_raw(raw: RawCommit) -> Result<Self, String> {
        let hash = CommitHash::parse(&raw.hash).map_err(|e| format!("bad commit hash: {e}"))?;

        let parents = raw
            .parents
            .split_whitespace()
            .map(CommitHash::parse)
            .collect::<crate::error::Result<Vec<_>>>()
            .map_err(|e| format!("bad parent of {hash}: {e}"))?;

        let seconds: i64 = raw
            .timestamp
            .trim()
            .parse()
            .map_err(|e| format!("bad timestamp '{}' on {hash}: {e}", raw.timestamp))?;
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| format!("timestamp {seconds} on {hash} is out of range"))?;

        Ok(Self {
            signature: SignatureStatus::from_git_code(&raw.signature_code),
            signer: non_empty(raw.signer),
            key: non_empty(raw.key),
            hash,
            parents,
            author_name: raw.author_name,
            author_email: raw.author_email,
            timestamp,
            subject: raw.subject,
        })
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.10} {} {} <{}> {}",
            self.hash,
            self.signature,
            self.author_name,
            self.author_email,
            self.subject
        )
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split `git log --format=LOG_FORMAT` output into raw commits.
pub fn parse_log(output: &str) -> Result<Vec<RawCommit>, String> {
    let mut commits = Vec::new();

    for record in output.split(RECORD_SEPARATOR) {
        let record = record.trim_start_matches(['\n', '\r']);
        if record.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(format!(
                "expected {FIELD_COUNT} fields per commit, found {} in record {}",
                fields.len(),
                commits.len() + 1
            ));
        }

        commits.push(RawCommit {
            hash: fields[0].to_string(),
            parents: fields[1].to_string(),
            author_name: fields[2].to_string(),
            author_email: fields[3].to_string(),
            timestamp: fields[4].to_string(),
            signature_code: fields[5].to_string(),
            signer: fields[6].to_string(),
            key: fields[7].to_string(),
            subject: fields[8].to_string(),
        });
    }

    Ok(commits)
}
