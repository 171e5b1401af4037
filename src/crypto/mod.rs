// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope encryption for the KYC URL-generation call.

pub mod envelope;
pub mod keys;

pub use envelope::{decrypt, encrypt, frame, is_envelope, unframe, BEGIN_MARKER, END_MARKER};
pub use keys::{load_public_key, public_key_from_pem, EphemeralKeyPair, EPHEMERAL_KEY_BITS};
