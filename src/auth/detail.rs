// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token record returned by the SATUSEHAT token endpoint.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Seconds shaved off a token's nominal lifetime so it is never presented
/// while expiring server-side.
pub const ANTICIPATION_SECS: i64 = 300;

/// Token record from `POST /oauth2/v1/accesstoken`.
///
/// The platform reports `issued_at` (ms since epoch) and `expires_in`
/// (seconds) as strings. Numeric JSON values are accepted too and kept as
/// their decimal text. Fields not modelled here are preserved in `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthDetail {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub issued_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub expires_in: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthDetail {
    /// Issue time in milliseconds; `None` if missing, unparseable or zero.
    pub fn issued_at_ms(&self) -> Option<i64> {
        parse_positive(&self.issued_at)
    }

    /// Lifetime in seconds; `None` if missing, unparseable or zero.
    pub fn expires_in_secs(&self) -> Option<i64> {
        parse_positive(&self.expires_in)
    }

    /// First instant (ms since epoch) at which the token must no longer be used.
    pub fn refresh_at_ms(&self) -> Option<i64> {
        let issued_at = self.issued_at_ms()?;
        let expires_in = self.expires_in_secs()?;
        let expiration = issued_at.checked_add(expires_in.checked_mul(1000)?)?;
        Some(expiration - ANTICIPATION_SECS * 1000)
    }

    /// `now_ms < issued_at + expires_in*1000 - anticipation*1000`.
    pub fn is_usable_at(&self, now_ms: i64) -> bool {
        self.refresh_at_ms().is_some_and(|deadline| now_ms < deadline)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(chrono::Utc::now().timestamp_millis())
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AuthDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthDetail")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn parse_positive(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|v| *v > 0)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
