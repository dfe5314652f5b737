use std::{fmt, fs};

use openssl::{nid::Nid, pkcs12::Pkcs12};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The bundle file could not be read from disk.
    #[error("failed to read certificate bundle {path}: {source}")]
    BundleUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The bytes were not a PKCS#12 archive, or the passphrase was wrong.
    #[error("certificate bundle rejected (bad passphrase or malformed PKCS#12): {0}")]
    BadPassphraseOrFormat(String),

    /// The archive decoded cleanly but holds no certificate and key pair.
    #[error("certificate bundle contains no identity entry")]
    EmptyIdentityBundle,
}

/// Client identity decoded from a PKCS#12 bundle.
///
/// Holds the transport-level identity handed to the HTTP client plus a
/// few diagnostics read from the leaf certificate.
#[derive(Clone)]
pub struct ClientIdentity {
    transport: reqwest::Identity,
    subject: Option<String>,
    not_after: String,
    chain_len: usize,
}

impl ClientIdentity {
    /// Read a PKCS#12 bundle from disk and decode it.
    pub fn from_pkcs12_file(path: &str, passphrase: &str) -> Result<Self, IdentityError> {
        let der = fs::read(path).map_err(|source| IdentityError::BundleUnreadable {
            path: path.to_string(),
            source,
        })?;
        Self::from_pkcs12_der(&der, passphrase)
    }

    /// Decode a PKCS#12 archive already held in memory.
    pub fn from_pkcs12_der(der: &[u8], passphrase: &str) -> Result<Self, IdentityError> {
        let archive = Pkcs12::from_der(der)
            .map_err(|err| IdentityError::BadPassphraseOrFormat(err.to_string()))?;
        let parsed = archive
            .parse2(passphrase)
            .map_err(|err| IdentityError::BadPassphraseOrFormat(err.to_string()))?;

        let cert = parsed.cert.as_ref().ok_or(IdentityError::EmptyIdentityBundle)?;
        if parsed.pkey.is_none() {
            return Err(IdentityError::EmptyIdentityBundle);
        }

        let subject = cert
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|cn| cn.to_string());
        let not_after = cert.not_after().to_string();
        let chain_len = parsed.ca.as_ref().map(|stack| stack.len()).unwrap_or(0);

        // Same bytes, decoded a second time into the HTTP client's format.
        let transport = reqwest::Identity::from_pkcs12_der(der, passphrase)
            .map_err(|err| IdentityError::BadPassphraseOrFormat(err.to_string()))?;

        debug!(
            subject = subject.as_deref().unwrap_or("<unknown>"),
            not_after = not_after.as_str(),
            chain_len,
            "decoded client identity bundle"
        );

        Ok(Self {
            transport,
            subject,
            not_after,
            chain_len,
        })
    }

    /// Identity handed to the HTTP client at construction.
    pub fn transport(&self) -> &reqwest::Identity {
        &self.transport
    }

    /// Common name of the leaf certificate's subject, when present.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Expiry timestamp of the leaf certificate, as rendered by OpenSSL.
    pub fn not_after(&self) -> &str {
        &self.not_after
    }

    /// Number of extra CA certificates carried alongside the leaf.
    pub fn chain_len(&self) -> usize {
        self.chain_len
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("subject", &self.subject)
            .field("not_after", &self.not_after)
            .field("chain_len", &self.chain_len)
            .finish_non_exhaustive()
    }
}
