// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the SATUSEHAT client.

use std::sync::Arc;

/// Errors surfaced by the client core.
///
/// Only two conditions are recovered locally and never show up here: an
/// invalid configured mode (falls back to sandbox) and a still-valid cached
/// token (reused instead of fetched).
///
/// Cloneable so one failed token refresh can be reported to every caller
/// that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IhsError {
    #[error(
        "Missing credentials. The \"client_secret\" and \"secret_key\" config values are required"
    )]
    MissingCredentials,

    /// Non-2xx response from the token endpoint. Carries the response body.
    ///
    /// The platform rate-limits to one token request per minute after a
    /// failed attempt; retry pacing is up to the caller.
    #[error("Authentication failed. {0}")]
    AuthenticationFailed(String),

    #[error("transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// 5xx from a resource endpoint, as classified by the resource wrappers.
    #[error("{body}")]
    Server { status: u16, body: String },

    #[error("KYC public key file {path}: {reason}")]
    KeyFile { path: String, reason: String },

    #[error("crypto error: {0}")]
    Crypto(String),

    /// Authentication tag or key unwrap failure. No plaintext is returned.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("malformed encrypted message: {0}")]
    MalformedEnvelope(String),

    #[error("auth store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for IhsError {
    fn from(e: reqwest::Error) -> Self {
        IhsError::Transport(Arc::new(e))
    }
}

impl From<serde_json::Error> for IhsError {
    fn from(e: serde_json::Error) -> Self {
        IhsError::InvalidResponse(e.to_string())
    }
}

impl IhsError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            IhsError::MissingCredentials => "missing_credentials",
            IhsError::AuthenticationFailed(_) => "authentication_failed",
            IhsError::Transport(_) => "transport_error",
            IhsError::InvalidUrl(_) => "invalid_url",
            IhsError::InvalidResponse(_) => "invalid_response",
            IhsError::Server { .. } => "server_error",
            IhsError::KeyFile { .. } => "key_file_error",
            IhsError::Crypto(_) => "crypto_error",
            IhsError::Integrity(_) => "integrity_error",
            IhsError::MalformedEnvelope(_) => "malformed_envelope",
            IhsError::Store(_) => "auth_store_error",
        }
    }
}

/// Result type for client operations.
pub type IhsResult<T> = Result<T, IhsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failed_keeps_upstream_body() {
        let err = IhsError::AuthenticationFailed(r#"{"fault":"invalid_client"}"#.to_string());
        assert_eq!(err.error_code(), "authentication_failed");
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn json_errors_map_to_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: IhsError = json_err.into();
        assert_eq!(err.error_code(), "invalid_response");
    }

    #[test]
    fn clones_keep_message_and_code() {
        let err = IhsError::Server {
            status: 503,
            body: "upstream unavailable".to_string(),
        };
        let copy = err.clone();
        assert_eq!(copy.to_string(), err.to_string());
        assert_eq!(copy.error_code(), "server_error");
    }

    #[test]
    fn key_file_error_names_the_path() {
        let err = IhsError::KeyFile {
            path: "/etc/ihs/publickey.pem".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "KYC public key file /etc/ihs/publickey.pem: not found"
        );
    }
}
