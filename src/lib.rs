//! # Provenance Audit
//!
//! Provenance verification for two kinds of artifact:
//!
//! - **Git repositories**: walk the full commit history and decide whether
//!   every commit carries a good signature from a trusted key.
//! - **Java archives**: list the files in a jar and work out which of them
//!   are covered by a code-signing certificate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use provenance_audit::git::Git;
//! use provenance_audit::jar::JarInfo;
//!
//! provenance_audit::init_logging().ok();
//!
//! let repo = Git::new("path/to/repo");
//! println!("history: {}", repo.get_state()?);
//!
//! let jar = JarInfo::new("path/to/app.jar");
//! println!("signed: {}", jar.is_signed()?);
//! # Ok::<(), provenance_audit::error::Error>(())
//! ```
//!
//! Repositories use a *universal* policy (the worst commit decides) while
//! archives use an *existential* one (any signer makes the archive signed).

pub mod error;
pub mod git;
pub mod jar;
pub mod report;
pub mod status;
#[cfg(test)]
mod tests;
pub mod utils;

use std::path::PathBuf;

// Re-export error types
pub use error::{Error, Result};

pub use git::Git;
pub use jar::JarInfo;
pub use status::SignatureStatus;

/// Settings for the external tools the library drives
#[derive(Debug, Clone)]
pub struct Config {
    /// git executable, looked up on `PATH` when not absolute
    pub git_binary: PathBuf,
    /// `GNUPGHOME` for signature checks, the user's keyring when unset
    pub gnupg_home: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            gnupg_home: None,
        }
    }
}

/// Initialize logging
///
/// # Examples
///
/// ```
/// use provenance_audit::init_logging;
///
/// // Initialize with default settings
/// let result = init_logging();
/// // Note: This might fail if already initialized
/// assert!(result.is_ok() || result.is_err());
/// ```
pub fn init_logging() -> Result<()> {
    env_logger::try_init().map_err(|e| Error::InitializationError(e.to_string()))
}
