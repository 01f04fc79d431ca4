//! # Git Module
//!
//! Walks the history of a git repository and judges whether every commit in
//! it is signed by a trusted key.
//!
//! Constructing a [`Git`] handle never fails. The path is only checked when
//! an operation needs the history, in this order:
//!
//! 1. the path exists ([`Error::NotFound`])
//! 2. the path is a directory ([`Error::NotADirectory`])
//! 3. the directory is a repository ([`Error::NotARepository`])
//!
//! ## Examples
//!
//! ```no_run
//! use provenance_audit::git::Git;
//! use provenance_audit::status::SignatureStatus;
//!
//! let repo = Git::new("./");
//! let commits = repo.list_commits()?;
//! let genesis = commits.last().expect("a repository has at least one commit");
//! println!("genesis: {:.6}", genesis.hash);
//!
//! if repo.get_state()? != SignatureStatus::Good {
//!     eprintln!("history contains commits without a trusted signature");
//! }
//! # Ok::<(), provenance_audit::error::Error>(())
//! ```
//!
//! ```
//! use provenance_audit::git::Git;
//!
//! let err = Git::new("/dev/null").list_commits().unwrap_err();
//! assert_eq!(err.to_string(), "Couldn't list commits, /dev/null is not a directory");
//! ```

pub mod backend;
pub mod commit;
pub mod evaluate;
pub mod hash;

use crate::error::{Error, Result};
use crate::status::{self, SignatureStatus};
use backend::{GitCli, VersionControl};
use commit::CommitRecord;
use evaluate::{RecordedVerdict, SignatureEvaluator};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle on a repository at a filesystem path
#[derive(Clone)]
pub struct Git {
    path: PathBuf,
    backend: Arc<dyn VersionControl>,
    evaluator: Arc<dyn SignatureEvaluator>,
}

impl Git {
    /// Handle using the `git` executable on `PATH`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_backend(path, GitCli::default())
    }

    pub fn with_backend<P, B>(path: P, backend: B) -> Self
    where
        P: AsRef<Path>,
        B: VersionControl + 'static,
    {
        Self {
            path: path.as_ref().to_path_buf(),
            backend: Arc::new(backend),
            evaluator: Arc::new(RecordedVerdict),
        }
    }

    /// Replace the policy [`Git::get_state`] judges commits with
    pub fn with_evaluator<E: SignatureEvaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn evaluator(&self) -> &dyn SignatureEvaluator {
        self.evaluator.as_ref()
    }

    fn check_repository(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(Error::NotFound(self.path.clone()));
        }
        if !self.path.is_dir() {
            return Err(Error::NotADirectory(self.path.clone()));
        }
        if !self.backend.is_repository(&self.path)? {
            return Err(Error::NotARepository(self.path.clone()));
        }
        Ok(())
    }

    /// Every commit reachable from `HEAD`, newest first.
    ///
    /// The last element is the genesis commit. Either the whole history is
    /// returned or an error, never a partial list.
    pub fn list_commits(&self) -> Result<Vec<CommitRecord>> {
        self.check_repository()?;

        let commits = self
            .backend
            .list_commits(&self.path)?
            .into_iter()
            .map(|raw| {
                CommitRecord::from_raw(raw).map_err(|reason| Error::MalformedLog {
                    path: self.path.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("{} has {} commits", self.path.display(), commits.len());
        Ok(commits)
    }

    /// The root of the history
    pub fn genesis(&self) -> Result<CommitRecord> {
        self.list_commits()?
            .pop()
            .ok_or_else(|| Error::EmptyHistory(self.path.clone()))
    }

    /// Verdict for the whole history using the handle's evaluator.
    ///
    /// `Good` only when every commit is `Good`; otherwise the most severe
    /// commit verdict.
    pub fn get_state(&self) -> Result<SignatureStatus> {
        self.get_state_with(self.evaluator.as_ref())
    }

    pub fn get_state_with(&self, evaluator: &dyn SignatureEvaluator) -> Result<SignatureStatus> {
        let commits = self.list_commits()?;
        let state = status::aggregate(commits.iter().map(|c| evaluator.evaluate(c)))
            .ok_or_else(|| Error::EmptyHistory(self.path.clone()))?;

        info!("{} history is {state}", self.path.display());
        Ok(state)
    }
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("path", &self.path).finish()
    }
}
