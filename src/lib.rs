// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SATUSEHAT Client - Indonesian national health-data platform (IHS)
//!
//! This crate manages OAuth2 client-credential tokens, dispatches
//! authenticated calls to the SATUSEHAT API families and performs the
//! RSA-OAEP / AES-256-GCM envelope exchange used by KYC URL generation.
//!
//! ## Modules
//!
//! - `config` - Credentials and mode resolution (overrides, `IHS_*` env)
//! - `auth` - Token acquisition, expiry-aware caching, pluggable token store
//! - `client` - Request dispatcher and per-family URL construction
//! - `crypto` - Hybrid encryption envelope and RSA key handling
//! - `api` - Consent, KYC and KFA resource wrappers
//!
//! ```no_run
//! # async fn run() -> satusehat_client::IhsResult<()> {
//! use satusehat_client::{ConfigOverrides, ConfigResolver, IhsClient};
//!
//! let client = IhsClient::new(ConfigResolver::new(
//!     ConfigOverrides::default()
//!         .client_secret("client-id")
//!         .secret_key("secret")
//!         .mode("sandbox"),
//! ))?;
//! let patient = client
//!     .fhir("/Patient?identifier=https://fhir.kemkes.go.id/id/nik|3174011234567890")
//!     .await?;
//! println!("{}", patient.status());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;

pub use auth::{AuthDetail, AuthStore, MemoryAuthStore};
pub use client::{ApiFamily, IhsClient, RequestSpec, SearchParams};
pub use config::{Config, ConfigOverrides, ConfigResolver, Mode};
pub use error::{IhsError, IhsResult};
