//! RSA key material loading
//!
//! Reads a single PEM-encoded RSA private key (PKCS#1 or PKCS#8) and derives
//! the public half once.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// RS256 signing refuses anything smaller
pub const MIN_KEY_BITS: usize = 2048;

/// Key loading errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Failed to read private key file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse private key: {0}")]
    Unparseable(String),
}

/// An RSA private key and its public half
#[derive(Clone)]
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeyPair {
    /// Read and parse a PEM file
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| KeyError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let pem = std::str::from_utf8(&bytes)
            .map_err(|_| KeyError::Unparseable("key file is not valid UTF-8".to_string()))?;

        Self::from_pem(pem)
    }

    /// Parse PEM text holding an `RSA PRIVATE KEY` or `PRIVATE KEY` block
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let pem = pem.trim();
        let private = match RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|e| KeyError::Unparseable(format!("not an RSA private key: {e}")))?,
        };

        let bits = private.n().bits();
        if bits < MIN_KEY_BITS {
            return Err(KeyError::Unparseable(format!(
                "RSA key is {bits} bits, at least {MIN_KEY_BITS} required"
            )));
        }

        let public = private.to_public_key();
        Ok(Self { private, public })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}
