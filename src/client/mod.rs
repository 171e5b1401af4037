// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Dispatcher
//!
//! [`IhsClient`] is the composition root: it owns the configuration
//! resolver, the auth manager and the HTTP client, and hands out the
//! resource wrappers. Every request goes through [`IhsClient::request`],
//! which picks the family base URL for the configured mode, joins the path,
//! applies query parameters and attaches the bearer token.
//!
//! Response status codes are not interpreted here.

pub mod endpoint;
pub mod request;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Response;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub use endpoint::{build_url, ApiFamily};
pub use request::{RequestSpec, SearchParams};

use crate::api::{Consent, Kfa, Kyc};
use crate::auth::{AuthDetail, AuthManager, AuthStore};
use crate::config::{Config, ConfigResolver};
use crate::error::{IhsError, IhsResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// SATUSEHAT API client.
///
/// Cheap to clone; clones share the configuration and the token cache.
#[derive(Clone, Debug)]
pub struct IhsClient {
    config: Arc<ConfigResolver>,
    auth: AuthManager,
    http: reqwest::Client,
}

impl IhsClient {
    pub fn new(config: ConfigResolver) -> IhsResult<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self::with_http_client(config, http))
    }

    /// Client configured from `IHS_*` environment variables only.
    pub fn from_env() -> IhsResult<Self> {
        Self::new(ConfigResolver::from_env())
    }

    pub fn with_http_client(config: ConfigResolver, http: reqwest::Client) -> Self {
        let config = Arc::new(config);
        let auth = AuthManager::new(Arc::clone(&config), http.clone());
        Self { config, auth, http }
    }

    /// Keep tokens in `store` instead of process memory.
    pub fn with_auth_store(mut self, store: Arc<dyn AuthStore>) -> Self {
        self.auth = self.auth.with_store(store);
        self
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.resolve()
    }

    /// Forget the resolved configuration so the next call re-reads it.
    pub fn invalidate_config(&self) {
        self.config.invalidate();
    }

    pub fn auth_manager(&self) -> &AuthManager {
        &self.auth
    }

    /// Current access token, fetched if none is cached.
    pub async fn auth(&self) -> IhsResult<AuthDetail> {
        self.auth.auth().await
    }

    /// Absolute URL of `path` within `api` for the configured mode.
    pub fn url_for(&self, api: ApiFamily, path: &str) -> IhsResult<Url> {
        let config = self.config.resolve();
        Ok(build_url(&api.base_url(&config.base_url), path)?)
    }

    /// Send an authenticated request and return the raw response.
    pub async fn request(&self, request: RequestSpec) -> IhsResult<Response> {
        let RequestSpec {
            api,
            path,
            search_params,
            method,
            headers: extra_headers,
            body,
        } = request;

        let mut url = self.url_for(api, &path)?;
        if let Some(params) = search_params {
            if params.is_empty() {
                url.set_query(None);
            } else {
                url.set_query(Some(&params.to_query_string()));
            }
        }

        let auth = self.auth.auth().await?;
        let mut bearer = HeaderValue::from_str(&auth.bearer()).map_err(|e| {
            IhsError::InvalidResponse(format!("access token is not a valid header value: {e}"))
        })?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.extend(extra_headers);

        debug!(%method, ?api, path = %url.path(), "Dispatching SATUSEHAT request");

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder.send().await?)
    }

    /// `GET {fhir}/{path}`, e.g. `/Patient?identifier=...` or `/Encounter/{id}`.
    pub async fn fhir(&self, path: &str) -> IhsResult<Response> {
        self.request(RequestSpec::get(ApiFamily::Fhir, path)).await
    }

    /// `POST {fhir}/{path}` with a FHIR resource as the JSON body.
    pub async fn fhir_post(&self, path: &str, resource: &Value) -> IhsResult<Response> {
        self.request(RequestSpec::post(ApiFamily::Fhir, path).json(resource))
            .await
    }

    pub fn consent(&self) -> Consent<'_> {
        Consent::new(self)
    }

    pub fn kyc(&self) -> Kyc<'_> {
        Kyc::new(self)
    }

    pub fn kfa(&self) -> Kfa<'_> {
        Kfa::new(self)
    }
}
