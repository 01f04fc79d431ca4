use crate::error::{Error, Result};
use crate::git::backend::VersionControl;
use crate::git::commit::RawCommit;
use crate::jar::digest::{DigestAlgorithm, encode_digest};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::{X509, X509NameBuilder};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const GENESIS_HASH: &str = "0b764cd867bff6e471cca0ab009d4874c2b85819";

/// In-memory history standing in for a real repository
pub struct MockVersionControl {
    repository: bool,
    commits: Vec<RawCommit>,
}

impl MockVersionControl {
    pub fn new(commits: Vec<RawCommit>) -> Self {
        Self {
            repository: true,
            commits,
        }
    }

    pub fn not_a_repository() -> Self {
        Self {
            repository: false,
            commits: vec![],
        }
    }
}

impl VersionControl for MockVersionControl {
    fn is_repository(&self, _path: &Path) -> Result<bool> {
        Ok(self.repository)
    }

    fn list_commits(&self, _path: &Path) -> Result<Vec<RawCommit>> {
        Ok(self.commits.clone())
    }
}

/// Raw commit with the given `%G?` code, parented on `parent` if any
pub fn raw_commit(hash: &str, parent: Option<&str>, code: &str) -> RawCommit {
    RawCommit {
        hash: hash.to_string(),
        parents: parent.unwrap_or_default().to_string(),
        author_name: "Test Author".to_string(),
        author_email: "author@example.com".to_string(),
        timestamp: "1700000000".to_string(),
        signature_code: code.to_string(),
        signer: if code == "N" {
            String::new()
        } else {
            "Test Author <author@example.com>".to_string()
        },
        key: if code == "N" {
            String::new()
        } else {
            "4AEE18F83AFDEB23".to_string()
        },
        subject: format!("Commit {}", &hash[..7]),
    }
}

/// Linear history, newest first, ending at [`GENESIS_HASH`]
pub fn linear_history(codes: &[&str]) -> Vec<RawCommit> {
    let hashes: Vec<String> = (0..codes.len())
        .map(|i| {
            if i + 1 == codes.len() {
                GENESIS_HASH.to_string()
            } else {
                format!("{:040x}", i + 1)
            }
        })
        .collect();

    codes
        .iter()
        .enumerate()
        .map(|(i, code)| raw_commit(&hashes[i], hashes.get(i + 1).map(String::as_str), code))
        .collect()
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run git in `dir` isolated from the user's configuration
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    git_with_env(dir, args, &[])
}

/// [`git`] with extra environment variables
pub fn git_with_env(dir: &Path, args: &[&str], envs: &[(&str, &Path)]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .envs(envs.iter().copied())
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_COMMITTER_NAME", "Test Author")
        .env("GIT_COMMITTER_EMAIL", "author@example.com")
        .output()?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            path: dir.to_path_buf(),
            command: args.join(" "),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Fresh repository with one unsigned empty commit per subject, oldest first
pub fn init_repo(subjects: &[&str]) -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    git(dir.path(), &["init", "-q"])?;
    for subject in subjects {
        git(dir.path(), &["commit", "-q", "--allow-empty", "-m", subject])?;
    }
    Ok(dir)
}

pub fn gpg_available() -> bool {
    Command::new("gpg")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Throwaway `GNUPGHOME` holding one passphrase-less signing key
pub struct GpgHome {
    dir: TempDir,
    pub fingerprint: String,
}

impl GpgHome {
    pub fn generate(uid: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        gpg(
            dir.path(),
            &[
                "--pinentry-mode",
                "loopback",
                "--passphrase",
                "",
                "--quick-generate-key",
                uid,
                "ed25519",
                "sign",
                "never",
            ],
        )?;

        let listing = gpg(dir.path(), &["--with-colons", "--list-secret-keys"])?;
        let fingerprint = listing
            .lines()
            .find_map(|line| line.strip_prefix("fpr:"))
            .and_then(|rest| rest.split(':').find(|field| !field.is_empty()))
            .ok_or_else(|| Error::Signature("generated key has no fingerprint".to_string()))?
            .to_string();

        Ok(Self { dir, fingerprint })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Empty commit in `repo` signed with this key
    pub fn signed_commit(&self, repo: &Path, subject: &str) -> Result<String> {
        let signing_key = format!("user.signingkey={}", self.fingerprint);
        git_with_env(
            repo,
            &[
                "-c",
                "gpg.format=openpgp",
                "-c",
                &signing_key,
                "commit",
                "-q",
                "-S",
                "--allow-empty",
                "-m",
                subject,
            ],
            &[("GNUPGHOME", self.path())],
        )
    }
}

fn gpg(home: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("gpg")
        .arg("--batch")
        .args(args)
        .env("GNUPGHOME", home)
        .output()?;
    if !output.status.success() {
        return Err(Error::Signature(format!(
            "gpg {}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl Drop for GpgHome {
    fn drop(&mut self) {
        let _ = Command::new("gpgconf")
            .args(["--kill", "gpg-agent"])
            .env("GNUPGHOME", self.path())
            .output();
    }
}

/// Self-signed code-signing certificate and its key
pub struct TestCertificate {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl TestCertificate {
    pub fn generate(common_name: &str) -> Result<Self> {
        let rsa = Rsa::generate(2048)?;
        let key = PKey::from_rsa(rsa)?;

        let mut name = X509NameBuilder::new()?;
        name.append_entry_by_text("O", "Provenance Test")?;
        name.append_entry_by_text("CN", common_name)?;
        let name = name.build();

        let mut serial = BigNum::new()?;
        serial.rand(64, MsbOption::MAYBE_ZERO, false)?;

        let mut builder = X509::builder()?;
        builder.set_version(2)?;
        let serial = serial.to_asn1_integer()?;
        builder.set_serial_number(&serial)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(&key)?;
        let not_before = Asn1Time::days_from_now(0)?;
        let not_after = Asn1Time::days_from_now(365)?;
        builder.set_not_before(&not_before)?;
        builder.set_not_after(&not_after)?;
        builder.sign(&key, MessageDigest::sha256())?;

        Ok(Self {
            cert: builder.build(),
            key,
        })
    }
}

/// Detached PKCS#7 signature over `content`, as jarsigner writes it
pub fn sign_detached(cert: &TestCertificate, content: &[u8]) -> Result<Vec<u8>> {
    let chain = Stack::<X509>::new()?;
    let pkcs7 = Pkcs7::sign(
        &cert.cert,
        &cert.key,
        &chain,
        content,
        Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY,
    )?;
    Ok(pkcs7.to_der()?)
}

/// Builds jar files signed the way `jarsigner` signs them
pub struct JarBuilder {
    files: Vec<(String, Vec<u8>)>,
    signers: Vec<(String, TestCertificate)>,
    digest_whole_manifest: bool,
    tampered: Vec<(String, Vec<u8>)>,
    added_after_signing: Vec<(String, Vec<u8>)>,
    corrupt_signature_files: bool,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            signers: Vec::new(),
            digest_whole_manifest: true,
            tampered: Vec::new(),
            added_after_signing: Vec::new(),
            corrupt_signature_files: false,
        }
    }

    pub fn file(mut self, name: &str, content: &[u8]) -> Self {
        self.files.push((name.to_string(), content.to_vec()));
        self
    }

    pub fn signed_by(mut self, alias: &str, cert: TestCertificate) -> Self {
        self.signers.push((alias.to_string(), cert));
        self
    }

    /// Leave out `<ALG>-Digest-Manifest` so only per-section digests apply
    pub fn per_section_digests(mut self) -> Self {
        self.digest_whole_manifest = false;
        self
    }

    /// Store different bytes for `name` than the manifest digests
    pub fn tamper(mut self, name: &str, content: &[u8]) -> Self {
        self.tampered.push((name.to_string(), content.to_vec()));
        self
    }

    /// Add a file that is missing from the manifest
    pub fn add_after_signing(mut self, name: &str, content: &[u8]) -> Self {
        self.added_after_signing.push((name.to_string(), content.to_vec()));
        self
    }

    /// Change the `.SF` files after their blocks were produced
    pub fn corrupt_signature_files(mut self) -> Self {
        self.corrupt_signature_files = true;
        self
    }

    pub fn build(self, path: &Path) -> Result<PathBuf> {
        let zip_err = |e: zip::result::ZipError| Error::MalformedArchive {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut manifest =
            String::from("Manifest-Version: 1.0\r\nCreated-By: provenance-audit tests\r\n\r\n");
        let mut sections = Vec::new();
        if !self.signers.is_empty() {
            for (name, content) in &self.files {
                let section = format!(
                    "Name: {name}\r\nSHA-256-Digest: {}\r\n\r\n",
                    encode_digest(DigestAlgorithm::Sha256, content)
                );
                manifest.push_str(&section);
                sections.push((name.clone(), section));
            }
        }

        let mut signature_files = Vec::new();
        for (alias, cert) in &self.signers {
            let mut sf = String::from("Signature-Version: 1.0\r\nCreated-By: provenance-audit tests\r\n");
            if self.digest_whole_manifest {
                sf.push_str(&format!(
                    "SHA-256-Digest-Manifest: {}\r\n",
                    encode_digest(DigestAlgorithm::Sha256, manifest.as_bytes())
                ));
            }
            sf.push_str("\r\n");
            for (name, section) in &sections {
                sf.push_str(&format!(
                    "Name: {name}\r\nSHA-256-Digest: {}\r\n\r\n",
                    encode_digest(DigestAlgorithm::Sha256, section.as_bytes())
                ));
            }

            let block = sign_detached(cert, sf.as_bytes())?;
            if self.corrupt_signature_files {
                sf.push_str("Name: injected.class\r\nSHA-256-Digest: AAAA\r\n\r\n");
            }
            signature_files.push((alias.to_uppercase(), sf, block));
        }

        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(File::create(path)?);

        writer.add_directory("META-INF/", options).map_err(zip_err)?;
        writer
            .start_file("META-INF/MANIFEST.MF", options)
            .map_err(zip_err)?;
        writer.write_all(manifest.as_bytes())?;

        for (alias, sf, block) in &signature_files {
            writer
                .start_file(format!("META-INF/{alias}.SF"), options)
                .map_err(zip_err)?;
            writer.write_all(sf.as_bytes())?;
            writer
                .start_file(format!("META-INF/{alias}.RSA"), options)
                .map_err(zip_err)?;
            writer.write_all(block)?;
        }

        for (name, content) in &self.files {
            let stored = self
                .tampered
                .iter()
                .find(|(tampered, _)| tampered == name)
                .map_or(content, |(_, replacement)| replacement);
            writer.start_file(name.as_str(), options).map_err(zip_err)?;
            writer.write_all(stored)?;
        }

        for (name, content) in &self.added_after_signing {
            writer.start_file(name.as_str(), options).map_err(zip_err)?;
            writer.write_all(content)?;
        }

        writer.finish().map_err(zip_err)?;
        Ok(path.to_path_buf())
    }
}
