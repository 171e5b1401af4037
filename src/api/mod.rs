// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource wrappers over [`IhsClient::request`](crate::IhsClient::request).
//!
//! Each wrapper borrows the client; obtain them with
//! [`IhsClient::consent`](crate::IhsClient::consent),
//! [`IhsClient::kyc`](crate::IhsClient::kyc) and
//! [`IhsClient::kfa`](crate::IhsClient::kfa).

pub mod consent;
pub mod kfa;
pub mod kyc;

pub use consent::{Consent, ConsentAction, ConsentUpdate};
pub use kfa::{
    AlkesQuery, AlkesState, Kfa, PriceJknQuery, ProductDetailQuery, ProductIdentifier,
    ProductsQuery,
};
pub use kyc::{Kyc, KycFailure, KycResult, KycValidationUrl, KycVerificationCode};

use reqwest::Response;
use serde_json::Value;

use crate::error::{IhsError, IhsResult};

/// Parse the JSON body of anything below 500; turn 5xx into [`IhsError::Server`].
async fn json_unless_server_error(response: Response) -> IhsResult<(reqwest::StatusCode, Value)> {
    let status = response.status();
    if status.is_server_error() {
        let body = response.text().await?;
        return Err(IhsError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.bytes().await?;
    let json = serde_json::from_slice(&body)
        .map_err(|e| IhsError::InvalidResponse(format!("{status} response is not JSON: {e}")))?;
    Ok((status, json))
}
