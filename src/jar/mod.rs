//! # Jar Module
//!
//! Lists the files inside a Java archive and works out which of them are
//! covered by a code-signing certificate.
//!
//! ## Jar Signing
//!
//! A signed jar carries three kinds of files under `META-INF/`:
//!
//! - `MANIFEST.MF` with a digest of every entry's content
//! - one `<NAME>.SF` per signer with a digest of every manifest section
//! - one `<NAME>.RSA`, `.DSA` or `.EC` PKCS#7 block signing the `.SF` file
//!
//! An entry is signed by a certificate only when that whole chain checks out.
//!
//! Unlike repositories, where every commit must be good, an archive counts
//! as signed as soon as any entry has a signer.
//!
//! ## Examples
//!
//! ```no_run
//! use provenance_audit::jar::JarInfo;
//!
//! let jar = JarInfo::new("app.jar");
//! for entry in jar.list_directory("META-INF")? {
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//!
//! let signers = jar.get_total_signers()?;
//! println!("signed: {}", !signers.is_empty());
//! # Ok::<(), provenance_audit::error::Error>(())
//! ```

pub mod digest;
pub mod manifest;
pub mod signer;

use crate::error::{Error, Result};
use crate::utils::safe_open_file;
use log::{debug, warn};
use manifest::Manifest;
use serde::{Deserialize, Serialize};
use signer::{Signer, verify_block};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

const SIGNATURE_BLOCK_EXTENSIONS: [&str; 3] = ["RSA", "DSA", "EC"];

/// A file stored in the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarEntry {
    /// Path inside the archive
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    pub compressed_size: u64,
    pub signers: BTreeSet<Signer>,
}

impl JarEntry {
    pub fn is_signed(&self) -> bool {
        !self.signers.is_empty()
    }
}

/// Handle on a jar file at a filesystem path
#[derive(Debug, Clone)]
pub struct JarInfo {
    path: PathBuf,
}

impl JarInfo {
    /// Never fails, the archive is opened by each operation
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<ZipArchive<File>> {
        let file = safe_open_file(&self.path).map_err(|source| Error::ArchiveOpen {
            path: self.path.clone(),
            source,
        })?;
        ZipArchive::new(file).map_err(|e| Error::MalformedArchive {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn read_entry(&self, archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
        let read_failure = |reason: String| Error::EntryReadFailure {
            path: self.path.clone(),
            entry: name.to_string(),
            reason,
        };

        let mut file = archive
            .by_name(name)
            .map_err(|e| read_failure(e.to_string()))?;
        // Header sizes are untrusted
        let mut data = Vec::with_capacity(file.size().min(1 << 20) as usize);
        file.read_to_end(&mut data)
            .map_err(|e| read_failure(e.to_string()))?;
        Ok(data)
    }

    /// Every file in the archive, in archive order, with its signers.
    ///
    /// Directory entries are skipped.
    pub fn walk_files(&self) -> Result<Vec<JarEntry>> {
        let mut archive = self.open()?;

        let mut listing = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| Error::EntryReadFailure {
                    path: self.path.clone(),
                    entry: format!("#{index}"),
                    reason: e.to_string(),
                })?;
            if !file.is_dir() {
                listing.push((file.name().to_string(), file.size(), file.compressed_size()));
            }
        }

        let coverage = self.signature_coverage(&mut archive, &listing)?;

        let mut entries = Vec::with_capacity(listing.len());
        for (name, size, compressed_size) in listing {
            let signers = match coverage.signers_of(&name) {
                Some(signers) if self.content_matches(&mut archive, &coverage, &name)? => {
                    signers.clone()
                }
                _ => BTreeSet::new(),
            };
            entries.push(JarEntry {
                name,
                size,
                compressed_size,
                signers,
            });
        }

        debug!("{} contains {} files", self.path.display(), entries.len());
        Ok(entries)
    }

    /// Files under `prefix`, e.g. `META-INF`.
    ///
    /// A prefix with no files under it gives an empty list, not an error.
    pub fn list_directory(&self, prefix: &str) -> Result<Vec<JarEntry>> {
        let dir = prefix.trim_matches('/');
        let entries = self.walk_files()?;
        if dir.is_empty() {
            return Ok(entries);
        }

        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry
                    .name
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .collect())
    }

    /// Every certificate that signs at least one entry
    pub fn get_total_signers(&self) -> Result<BTreeSet<Signer>> {
        Ok(self
            .walk_files()?
            .into_iter()
            .flat_map(|entry| entry.signers)
            .collect())
    }

    /// Whether any entry is signed
    pub fn is_signed(&self) -> Result<bool> {
        Ok(!self.get_total_signers()?.is_empty())
    }

    fn content_matches(
        &self,
        archive: &mut ZipArchive<File>,
        coverage: &Coverage,
        name: &str,
    ) -> Result<bool> {
        let Some(section) = coverage.manifest.as_ref().and_then(|m| m.entry(name)) else {
            return Ok(false);
        };

        let data = self.read_entry(archive, name)?;
        let matches = section.verify_digests("-Digest", &data);
        if !matches {
            warn!(
                "{}: {name} does not match its manifest digest",
                self.path.display()
            );
        }
        Ok(matches)
    }

    /// Work out which manifest entries each signature file vouches for.
    fn signature_coverage(
        &self,
        archive: &mut ZipArchive<File>,
        listing: &[(String, u64, u64)],
    ) -> Result<Coverage> {
        let mut coverage = Coverage::default();

        if !listing.iter().any(|(name, _, _)| name == MANIFEST_NAME) {
            return Ok(coverage);
        }
        let manifest_bytes = self.read_entry(archive, MANIFEST_NAME)?;
        let manifest = Manifest::parse(&manifest_bytes).map_err(|reason| {
            Error::MalformedArchive {
                path: self.path.clone(),
                reason: format!("{MANIFEST_NAME}: {reason}"),
            }
        })?;

        for (sf_name, block_name) in signature_pairs(listing) {
            let sf_bytes = self.read_entry(archive, &sf_name)?;
            let block = self.read_entry(archive, &block_name)?;

            let signers = match verify_block(&block, &sf_bytes) {
                Ok(signers) => signers,
                Err(e) => {
                    warn!(
                        "{}: signature block {block_name} does not verify: {e}",
                        self.path.display()
                    );
                    continue;
                }
            };

            let signature_file = match Manifest::parse(&sf_bytes) {
                Ok(sf) => sf,
                Err(reason) => {
                    warn!("{}: unreadable {sf_name}: {reason}", self.path.display());
                    continue;
                }
            };

            let whole_manifest = signature_file
                .main
                .verify_digests("-Digest-Manifest", manifest.raw());

            for (name, sf_section) in signature_file.entries() {
                let vouched = whole_manifest
                    || manifest
                        .entry(name)
                        .is_some_and(|section| sf_section.verify_digests("-Digest", section.raw()));
                if vouched && !is_signature_related(name) {
                    coverage
                        .signers
                        .entry(name.to_string())
                        .or_default()
                        .extend(signers.iter().cloned());
                }
            }

            debug!(
                "{}: {sf_name} signed by {} certificate(s)",
                self.path.display(),
                signers.len()
            );
        }

        coverage.manifest = Some(manifest);
        Ok(coverage)
    }
}

#[derive(Debug, Default)]
struct Coverage {
    manifest: Option<Manifest>,
    signers: HashMap<String, BTreeSet<Signer>>,
}

impl Coverage {
    fn signers_of(&self, name: &str) -> Option<&BTreeSet<Signer>> {
        self.signers.get(name).filter(|signers| !signers.is_empty())
    }
}

/// `.SF` files directly under `META-INF/` paired with their signature block
fn signature_pairs(listing: &[(String, u64, u64)]) -> Vec<(String, String)> {
    let meta_inf: Vec<&str> = listing
        .iter()
        .filter_map(|(name, _, _)| name.strip_prefix("META-INF/"))
        .filter(|rest| !rest.contains('/'))
        .collect();

    meta_inf
        .iter()
        .filter_map(|file| {
            let (base, ext) = file.rsplit_once('.')?;
            if !ext.eq_ignore_ascii_case("SF") {
                return None;
            }
            let block = meta_inf.iter().find(|candidate| {
                candidate.rsplit_once('.').is_some_and(|(b, e)| {
                    b.eq_ignore_ascii_case(base)
                        && SIGNATURE_BLOCK_EXTENSIONS
                            .iter()
                            .any(|known| e.eq_ignore_ascii_case(known))
                })
            })?;
            Some((format!("META-INF/{file}"), format!("META-INF/{block}")))
        })
        .collect()
}

/// Files that make up the signature itself and so are never signed
pub fn is_signature_related(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let Some(file) = upper.strip_prefix("META-INF/") else {
        return false;
    };
    if file.contains('/') {
        return false;
    }

    file == "MANIFEST.MF"
        || file.starts_with("SIG-")
        || file
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext == "SF" || SIGNATURE_BLOCK_EXTENSIONS.contains(&ext))
}
