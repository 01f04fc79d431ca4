//! # Reports
//!
//! Serialisable summaries of a verdict, for printing or archiving next to
//! the artifact they describe.
//!
//! ## Examples
//!
//! ```no_run
//! use provenance_audit::git::Git;
//! use provenance_audit::report::RepositoryReport;
//!
//! let report = RepositoryReport::from_repository(&Git::new("./"))?;
//! println!("{}", report.to_json()?);
//! # Ok::<(), provenance_audit::error::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::git::Git;
use crate::git::hash::CommitHash;
use crate::jar::JarInfo;
use crate::jar::signer::Signer;
use crate::status::{self, SignatureStatus};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryReport {
    pub path: PathBuf,
    pub state: SignatureStatus,
    pub commit_count: usize,
    pub genesis: CommitHash,
    /// Commits with no signature at all
    pub unsigned: Vec<CommitHash>,
    /// Commits whose signature does not verify
    pub bad: Vec<CommitHash>,
}

impl RepositoryReport {
    /// Walk the history once. `state` is judged by the handle's evaluator,
    /// the commit lists use the verdicts reported by the collaborator.
    pub fn from_repository(repo: &Git) -> Result<Self> {
        let commits = repo.list_commits()?;
        let empty = || Error::EmptyHistory(repo.path().to_path_buf());

        let evaluator = repo.evaluator();
        let state =
            status::aggregate(commits.iter().map(|c| evaluator.evaluate(c))).ok_or_else(empty)?;
        let genesis = commits.last().ok_or_else(empty)?.hash.clone();

        let with_status = |wanted: SignatureStatus| {
            commits
                .iter()
                .filter(|c| c.signature == wanted)
                .map(|c| c.hash.clone())
                .collect::<Vec<_>>()
        };

        Ok(Self {
            path: repo.path().to_path_buf(),
            state,
            commit_count: commits.len(),
            genesis,
            unsigned: with_status(SignatureStatus::Unsigned),
            bad: with_status(SignatureStatus::Bad),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub signed: bool,
    pub entry_count: usize,
    pub signed_entry_count: usize,
    pub signers: BTreeSet<Signer>,
}

impl ArchiveReport {
    pub fn from_archive(jar: &JarInfo) -> Result<Self> {
        let entries = jar.walk_files()?;
        let signers: BTreeSet<Signer> = entries
            .iter()
            .flat_map(|entry| entry.signers.iter().cloned())
            .collect();

        Ok(Self {
            path: jar.path().to_path_buf(),
            signed: !signers.is_empty(),
            entry_count: entries.len(),
            signed_entry_count: entries.iter().filter(|e| e.is_signed()).count(),
            signers,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
