// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RSA key handling for the KYC envelope.
//!
//! Two key pairs are involved in one exchange:
//!
//! - the **server key**: SATUSEHAT's long-lived public key, shipped as a PEM
//!   file, used to wrap the request's AES key;
//! - the **ephemeral key**: generated per call, its public half travels
//!   inside the encrypted request so the server can wrap the reply's AES key.
//!   The private half lives only in memory and is zeroized on drop.

use std::fmt;
use std::path::{Path, PathBuf};

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::envelope;
use crate::error::{IhsError, IhsResult};

/// Modulus size of the per-call key pair.
pub const EPHEMERAL_KEY_BITS: usize = 2048;

/// Per-call RSA key pair. Never persisted.
pub struct EphemeralKeyPair {
    private_key: RsaPrivateKey,
    public_key_pem: String,
}

impl EphemeralKeyPair {
    /// Generate a fresh 2048-bit pair. CPU-bound; see [`generate_async`](Self::generate_async).
    pub fn generate() -> IhsResult<Self> {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, EPHEMERAL_KEY_BITS)
            .map_err(|e| IhsError::Crypto(format!("RSA key generation failed: {e}")))?;
        let public_key_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IhsError::Crypto(format!("public key encoding failed: {e}")))?;

        Ok(Self {
            private_key,
            public_key_pem,
        })
    }

    /// [`generate`](Self::generate) on the blocking thread pool.
    pub async fn generate_async() -> IhsResult<Self> {
        tokio::task::spawn_blocking(Self::generate)
            .await
            .map_err(|e| IhsError::Crypto(format!("key generation task failed: {e}")))?
    }

    /// SubjectPublicKeyInfo PEM (`-----BEGIN PUBLIC KEY-----`).
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Open an envelope addressed to this key pair.
    pub fn decrypt(&self, message: &str) -> IhsResult<Vec<u8>> {
        envelope::decrypt(message, &self.private_key)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .finish_non_exhaustive()
    }
}

/// Parse an RSA public key from SPKI (`PUBLIC KEY`) or PKCS#1
/// (`RSA PUBLIC KEY`) PEM.
pub fn public_key_from_pem(pem_text: &str) -> IhsResult<RsaPublicKey> {
    parse_public_key(pem_text).map_err(IhsError::Crypto)
}

/// Read the server public key. Relative paths resolve against the current
/// working directory.
pub async fn load_public_key(path: impl AsRef<Path>) -> IhsResult<RsaPublicKey> {
    let path = absolute_path(path.as_ref())?;
    let key_file_error = |reason: String| IhsError::KeyFile {
        path: path.display().to_string(),
        reason,
    };

    let pem_text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| key_file_error(e.to_string()))?;
    parse_public_key(&pem_text).map_err(key_file_error)
}

fn absolute_path(path: &Path) -> IhsResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| IhsError::KeyFile {
        path: path.display().to_string(),
        reason: format!("cannot resolve relative path: {e}"),
    })?;
    Ok(cwd.join(path))
}

fn parse_public_key(pem_text: &str) -> Result<RsaPublicKey, String> {
    let pem = pem::parse(pem_text.trim()).map_err(|e| format!("invalid PEM: {e}"))?;
    match pem.tag() {
        "PUBLIC KEY" => RsaPublicKey::from_public_key_der(pem.contents())
            .map_err(|e| format!("invalid RSA public key: {e}")),
        "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(pem.contents())
            .map_err(|e| format!("invalid PKCS#1 RSA public key: {e}")),
        other => Err(format!("unexpected PEM block \"{other}\", expected a public key")),
    }
}
