use crate::error::Result;
use openssl::nid::Nid;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509NameRef, X509Ref};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of a code-signing certificate.
///
/// Ordered by fingerprint first, so two signers are the same set member
/// exactly when their certificates are identical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signer {
    /// SHA-256 of the DER encoded certificate, lowercase hex
    pub fingerprint: String,
    pub subject: String,
    pub issuer: String,
    /// Certificate serial number, uppercase hex
    pub serial: String,
}

impl Signer {
    pub fn from_certificate(cert: &X509Ref) -> Result<Self> {
        let der = cert.to_der()?;
        let serial = cert.serial_number().to_bn()?.to_hex_str()?.to_string();

        Ok(Self {
            fingerprint: hex::encode(Sha256::digest(&der)),
            subject: format_name(cert.subject_name()),
            issuer: format_name(cert.issuer_name()),
            serial,
        })
    }

    /// The `CN` component of the subject, if any
    pub fn common_name(&self) -> Option<&str> {
        self.subject
            .split(", ")
            .find_map(|part| part.strip_prefix("CN="))
    }
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.subject, &self.fingerprint[..16.min(self.fingerprint.len())])
    }
}

fn format_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = match entry.object().nid() {
                Nid::UNDEF => entry.object().to_string(),
                nid => nid.short_name().unwrap_or("?").to_string(),
            };
            let value = String::from_utf8_lossy(entry.data().as_slice());
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Verify a detached PKCS#7 signature block over the bytes of its `.SF`
/// file and return the certificates that signed it.
///
/// Only the signature is checked. Certificate chains are not validated,
/// deciding which issuers to trust is left to the caller.
pub fn verify_block(block: &[u8], signature_file: &[u8]) -> Result<Vec<Signer>> {
    let pkcs7 = Pkcs7::from_der(block)?;
    let extra_certs = Stack::<X509>::new()?;
    let store = X509StoreBuilder::new()?.build();

    pkcs7.verify(
        &extra_certs,
        &store,
        Some(signature_file),
        None,
        Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
    )?;

    pkcs7
        .signers(&extra_certs, Pkcs7Flags::empty())?
        .iter()
        .map(Signer::from_certificate)
        .collect()
}
