// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hybrid RSA-OAEP / AES-256-GCM envelope.
//!
//! ## Wire format
//!
//! ```text
//! -----BEGIN ENCRYPTED MESSAGE-----\r\n
//! base64(payload), wrapped at 76 columns, lines joined by \n
//! \n-----END ENCRYPTED MESSAGE-----
//! ```
//!
//! `payload = wrapped_key || iv || ciphertext || tag`, where `wrapped_key` is
//! the RSA-OAEP(SHA-256) encryption of a random AES-256 key and has the
//! recipient's modulus size, `iv` is 12 bytes and `tag` is the 16-byte GCM
//! tag.
//!
//! ## Security
//!
//! - A fresh AES key and IV per message
//! - AES keys are zeroized after use
//! - Decryption never returns plaintext whose tag did not verify

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64ct::{Base64, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{IhsError, IhsResult};

pub const BEGIN_MARKER: &str = "-----BEGIN ENCRYPTED MESSAGE-----";
pub const END_MARKER: &str = "-----END ENCRYPTED MESSAGE-----";

/// Base64 line width inside the markers.
pub const LINE_WIDTH: usize = 76;

pub const AES_KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` for the holder of `recipient`'s private key and frame it.
pub fn encrypt(plaintext: &[u8], recipient: &RsaPublicKey) -> IhsResult<String> {
    let mut rng = OsRng;

    let mut key = Zeroizing::new([0u8; AES_KEY_LEN]);
    rng.fill_bytes(&mut key[..]);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| IhsError::Crypto(format!("failed to create cipher: {e}")))?;
    // ciphertext || tag
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| IhsError::Crypto("AES-GCM encryption failed".to_string()))?;

    let wrapped_key = recipient
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &key[..])
        .map_err(|e| IhsError::Crypto(format!("RSA-OAEP key wrap failed: {e}")))?;

    let mut payload = Vec::with_capacity(wrapped_key.len() + IV_LEN + sealed.len());
    payload.extend_from_slice(&wrapped_key);
    payload.extend_from_slice(&iv);
    payload.extend_from_slice(&sealed);

    Ok(frame(&payload))
}

/// Open an envelope with the private key its AES key was wrapped for.
pub fn decrypt(message: &str, private_key: &RsaPrivateKey) -> IhsResult<Vec<u8>> {
    let payload = unframe(message)?;

    let key_len = private_key.size();
    if payload.len() < key_len + IV_LEN + TAG_LEN {
        return Err(IhsError::MalformedEnvelope(format!(
            "message is {} bytes, shorter than the {} byte minimum",
            payload.len(),
            key_len + IV_LEN + TAG_LEN
        )));
    }

    let (wrapped_key, rest) = payload.split_at(key_len);
    let (iv, sealed) = rest.split_at(IV_LEN);
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let key = Zeroizing::new(
        private_key
            .decrypt(Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|_| IhsError::Integrity("could not unwrap the message key".to_string()))?,
    );
    if key.len() != AES_KEY_LEN {
        return Err(IhsError::Integrity(format!(
            "unwrapped key is {} bytes, expected {AES_KEY_LEN}",
            key.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| IhsError::Crypto(format!("failed to create cipher: {e}")))?;

    // Zeroized if the tag check fails: the buffer is decrypted before it is verified
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| IhsError::Integrity("authentication tag mismatch".to_string()))?;

    Ok(std::mem::take(&mut *buffer))
}

/// Base64-encode `payload` between the envelope markers.
pub fn frame(payload: &[u8]) -> String {
    let encoded = Base64::encode_string(payload);

    let mut body = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 1);
    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % LINE_WIDTH == 0 {
            body.push('\n');
        }
        body.push(ch);
    }

    format!("{BEGIN_MARKER}\r\n{body}\n{END_MARKER}")
}

/// Strip the markers and whitespace and decode the payload.
pub fn unframe(message: &str) -> IhsResult<Vec<u8>> {
    let rest = message
        .trim_start()
        .strip_prefix(BEGIN_MARKER)
        .ok_or_else(|| IhsError::MalformedEnvelope("missing BEGIN marker".to_string()))?;
    let end = rest
        .find(END_MARKER)
        .ok_or_else(|| IhsError::MalformedEnvelope("missing END marker".to_string()))?;

    let body: String = rest[..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    Base64::decode_vec(&body)
        .map_err(|e| IhsError::MalformedEnvelope(format!("invalid base64 body: {e}")))
}

/// Whether `message` looks like an envelope rather than a plain error body.
pub fn is_envelope(message: &str) -> bool {
    message.trim_start().starts_with(BEGIN_MARKER)
}
