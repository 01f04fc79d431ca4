use crate::Config;
use crate::error::{Error, Result};
use crate::git::commit::{LOG_FORMAT, RawCommit, parse_log};
use log::debug;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Variables that redirect git to a repository other than the one at `-C`
const REPOSITORY_OVERRIDES: [&str; 8] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_COMMON_DIR",
    "GIT_NAMESPACE",
    "GIT_CEILING_DIRECTORIES",
];

/// Source of commit history and signature verdicts for a repository.
///
/// Callers have already checked that `path` exists and is a directory.
pub trait VersionControl: Send + Sync {
    /// Whether `path` is inside a repository this backend understands
    fn is_repository(&self, path: &Path) -> Result<bool>;

    /// Every commit reachable from `HEAD`, newest first, genesis last.
    ///
    /// A repository without any commits yields an empty list.
    fn list_commits(&self, path: &Path) -> Result<Vec<RawCommit>>;
}

/// [`VersionControl`] backed by the `git` executable.
///
/// Signature verdicts come from `git log`'s `%G?` placeholder, so the trust
/// anchors are whatever keyring git's configured gpg program consults.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    gnupg_home: Option<PathBuf>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GitCli {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.git_binary.clone(),
            gnupg_home: config.gnupg_home.clone(),
        }
    }

    fn run<I, S>(&self, path: &Path, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        isolate(&mut command).arg("-C").arg(path).args(args);
        if let Some(home) = &self.gnupg_home {
            command.env("GNUPGHOME", home);
        }

        debug!("Running {command:?}");
        Ok(command.output()?)
    }

    fn has_head(&self, path: &Path) -> Result<bool> {
        let output = self.run(path, ["rev-parse", "--verify", "--quiet", "HEAD"])?;
        Ok(output.status.success())
    }
}

/// Strip inherited settings that would make git answer for a different
/// repository, or print anything besides what was asked for.
pub(crate) fn isolate(command: &mut Command) -> &mut Command {
    for var in REPOSITORY_OVERRIDES {
        command.env_remove(var);
    }
    command
        .env("LC_ALL", "C")
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .args(["-c", "log.showSignature=false"])
}

impl VersionControl for GitCli {
    fn is_repository(&self, path: &Path) -> Result<bool> {
        let output = self.run(path, ["rev-parse", "--git-dir"])?;
        Ok(output.status.success())
    }

    fn list_commits(&self, path: &Path) -> Result<Vec<RawCommit>> {
        if !self.has_head(path)? {
            debug!("{} has no commits yet", path.display());
            return Ok(Vec::new());
        }

        let format = format!("--format={LOG_FORMAT}");
        let args = [
            "log",
            "--no-color",
            "--no-show-signature",
            "--topo-order",
            format.as_str(),
            "HEAD",
        ];

        let output = self.run(path, args)?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                path: path.to_path_buf(),
                command: "log".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let commits = parse_log(&stdout).map_err(|reason| Error::MalformedLog {
            path: path.to_path_buf(),
            reason,
        })?;

        debug!("Read {} commits from {}", commits.len(), path.display());
        Ok(commits)
    }
}
