// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! OAuth2 client-credentials authentication against SATUSEHAT.
//!
//! ## Auth Flow
//!
//! 1. A caller asks for a token (directly or via any API request)
//! 2. The cached token is returned if it is still usable
//! 3. Otherwise `POST /oauth2/v1/accesstoken?grant_type=client_credentials`
//!    with the client secret and secret key as form fields
//! 4. The new token replaces the cached one
//!
//! ## Expiry
//!
//! - Tokens carry `issued_at` (ms) and `expires_in` (s)
//! - A token is retired 300 seconds before its nominal expiry
//! - Tokens with unreadable timestamps are treated as absent

pub mod detail;
pub mod manager;
pub mod store;

pub use detail::{AuthDetail, ANTICIPATION_SECS};
pub use manager::AuthManager;
pub use store::{AuthStore, MemoryAuthStore};
