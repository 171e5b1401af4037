// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity verification (`{kyc}`).
//!
//! ## Validation URL
//!
//! `generate-url` is the only encrypted exchange on the platform:
//!
//! 1. load the server public key from the configured PEM file
//! 2. generate an ephemeral RSA pair
//! 3. encrypt `{agent_name, agent_nik, public_key}` for the server key
//! 4. POST the envelope as `text/plain`
//! 5. decrypt the reply with the ephemeral private key
//!
//! Replies that are not 2xx or not an envelope are returned as
//! [`KycResult::Failed`] with the raw body. Errors in local steps
//! (missing key file, auth, transport, a reply that fails decryption) are
//! returned as `Err`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::client::{ApiFamily, IhsClient, RequestSpec};
use crate::crypto::{self, EphemeralKeyPair};
use crate::error::IhsResult;

/// Outcome of a KYC call that reached the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum KycResult<T> {
    Success(T),
    Failed(KycFailure),
}

impl<T> KycResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, KycResult::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            KycResult::Success(value) => Some(value),
            KycResult::Failed(_) => None,
        }
    }
}

/// Rejected request, as received.
#[derive(Debug, Clone, PartialEq)]
pub struct KycFailure {
    pub status: u16,
    pub body: String,
    /// `body` parsed as JSON, when it is JSON.
    pub json: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KycValidationUrl {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub agent_nik: String,
    #[serde(default)]
    pub token: String,
    /// Page the agent opens to complete verification.
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KycVerificationCode {
    #[serde(default)]
    pub nik: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ihs_number: String,
    #[serde(default)]
    pub challenge_code: String,
    #[serde(default)]
    pub created_timestamp: Value,
    #[serde(default)]
    pub expired_timestamp: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct Kyc<'a> {
    client: &'a IhsClient,
}

impl<'a> Kyc<'a> {
    pub(crate) fn new(client: &'a IhsClient) -> Self {
        Self { client }
    }

    /// Request a verification page URL for a health worker.
    pub async fn generate_validation_url(
        &self,
        agent_name: &str,
        agent_nik: &str,
    ) -> IhsResult<KycResult<KycValidationUrl>> {
        let config = self.client.config();
        let server_key = crypto::load_public_key(&config.kyc_pem_file).await?;
        let keys = EphemeralKeyPair::generate_async().await?;

        let payload = json!({
            "agent_name": agent_name,
            "agent_nik": agent_nik,
            "public_key": keys.public_key_pem(),
        });
        let envelope = crypto::encrypt(payload.to_string().as_bytes(), &server_key)?;

        let request = RequestSpec::post(ApiFamily::Kyc, "/generate-url").text(envelope);
        let response = self.client.request(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() || !crypto::is_envelope(&body) {
            return Ok(KycResult::Failed(failure("generate-url", status.as_u16(), body)));
        }

        let plaintext = keys.decrypt(&body)?;
        debug!(bytes = plaintext.len(), "Decrypted KYC validation reply");

        let url: KycValidationUrl = parse_data(&plaintext)?;
        info!("KYC validation URL generated");
        Ok(KycResult::Success(url))
    }

    /// Request a challenge code a patient can use to verify their identity.
    pub async fn generate_verification_code(
        &self,
        nik: &str,
        name: &str,
    ) -> IhsResult<KycResult<KycVerificationCode>> {
        let payload = json!({
            "metadata": { "method": "request_per_nik" },
            "data": { "nik": nik, "name": name },
        });
        let request = RequestSpec::post(ApiFamily::Kyc, "/challenge-code").json(&payload);
        let response = self.client.request(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Ok(KycResult::Failed(failure("challenge-code", status.as_u16(), body)));
        }

        Ok(KycResult::Success(parse_data(body.as_bytes())?))
    }
}

fn failure(endpoint: &str, status: u16, body: String) -> KycFailure {
    warn!(endpoint, status, "KYC request rejected");
    let json = serde_json::from_str(&body).ok();
    KycFailure { status, body, json }
}

/// Deserialize `bytes`, unwrapping a top-level `data` object when present.
fn parse_data<T: DeserializeOwned>(bytes: &[u8]) -> IhsResult<T> {
    let value: Value = serde_json::from_slice(bytes)?;
    let value = match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    Ok(serde_json::from_value(value)?)
}
