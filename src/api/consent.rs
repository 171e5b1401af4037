// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Patient consent (`{consent}/Consent`).
//!
//! Both calls always produce a FHIR resource: the platform's `Consent` or
//! `OperationOutcome` for responses below 500, and a locally built
//! `OperationOutcome` with an `exception` issue for 5xx and client errors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::json_unless_server_error;
use crate::client::{ApiFamily, IhsClient, RequestSpec};
use crate::error::IhsResult;

/// Whether the patient allows other facilities to read their records.
///
/// `Optout` does not stop this facility from submitting records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsentAction {
    Optin,
    Optout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUpdate {
    /// IHS patient id.
    pub patient_id: String,
    pub action: ConsentAction,
    /// Name of the staff member requesting consent.
    pub agent: String,
}

pub struct Consent<'a> {
    client: &'a IhsClient,
}

impl<'a> Consent<'a> {
    pub(crate) fn new(client: &'a IhsClient) -> Self {
        Self { client }
    }

    /// Current consent of `patient_id`.
    pub async fn get(&self, patient_id: &str) -> Value {
        let request = RequestSpec::get(ApiFamily::Consent, "/Consent")
            .search_params([("patient_id", patient_id)]);
        self.send(request).await.unwrap_or_else(|e| exception(&e.to_string()))
    }

    /// Record a consent decision.
    pub async fn update(&self, update: &ConsentUpdate) -> Value {
        let body = json!({
            "patient_id": update.patient_id,
            "action": update.action,
            "agent": update.agent,
        });
        let request = RequestSpec::post(ApiFamily::Consent, "/Consent").json(&body);
        self.send(request).await.unwrap_or_else(|e| exception(&e.to_string()))
    }

    async fn send(&self, request: RequestSpec) -> IhsResult<Value> {
        let response = self.client.request(request).await?;
        let (_, json) = json_unless_server_error(response).await?;
        Ok(json)
    }
}

/// `OperationOutcome` with a single `exception` issue.
pub fn exception(text: &str) -> Value {
    let text = if text.is_empty() { "unknown error" } else { text };
    json!({
        "resourceType": "OperationOutcome",
        "issue": [{
            "code": "exception",
            "severity": "error",
            "details": { "text": text }
        }]
    })
}
