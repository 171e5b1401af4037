// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-credentials token acquisition with caching.
//!
//! ## Refresh
//!
//! - A usable cached token is always preferred; no request is made.
//! - Refreshes are serialized: callers arriving while a fetch is in flight
//!   wait for it and then share its outcome, the token or the error.
//! - A failed fetch is not retried here. SATUSEHAT allows one token request
//!   per minute after a failure, so retry pacing belongs to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::detail::AuthDetail;
use super::store::{AuthStore, MemoryAuthStore};
use crate::client::endpoint::token_url;
use crate::config::{Config, ConfigResolver};
use crate::error::{IhsError, IhsResult};

/// Outcome of the last completed fetch, guarded by the refresh lock.
#[derive(Default)]
struct RefreshSlot {
    last_failure: Option<IhsError>,
}

/// Owns the cached access token for one credential pair.
#[derive(Clone)]
pub struct AuthManager {
    config: Arc<ConfigResolver>,
    store: Arc<dyn AuthStore>,
    refresh: Arc<Mutex<RefreshSlot>>,
    /// Bumped, under the refresh lock, each time a fetch completes.
    generation: Arc<AtomicU64>,
    http: reqwest::Client,
}

impl AuthManager {
    /// Manager with the in-process [`MemoryAuthStore`].
    pub fn new(config: Arc<ConfigResolver>, http: reqwest::Client) -> Self {
        Self {
            config,
            store: Arc::new(MemoryAuthStore::new()),
            refresh: Arc::new(Mutex::new(RefreshSlot::default())),
            generation: Arc::new(AtomicU64::new(0)),
            http,
        }
    }

    /// Swap the token store, e.g. for one shared between processes.
    pub fn with_store(mut self, store: Arc<dyn AuthStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    /// Return a usable token, fetching a new one only when none is cached.
    ///
    /// Concurrent callers share a single fetch. If it fails, every caller
    /// that waited on it gets the same error without another request.
    pub async fn auth(&self) -> IhsResult<AuthDetail> {
        let observed = self.generation.load(Ordering::Acquire);

        if let Some(detail) = self.cached().await? {
            debug!("Using cached SATUSEHAT access token");
            return Ok(detail);
        }

        let mut slot = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(detail) = self.cached().await? {
            debug!("Using access token refreshed by a concurrent caller");
            return Ok(detail);
        }
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(err) = &slot.last_failure {
                debug!("Reusing failure of a concurrent token request");
                return Err(err.clone());
            }
        }

        let config = self.config.resolve();
        let result = match self.fetch(&config).await {
            Ok(detail) => self.store.set(detail.clone()).await.map(|()| detail),
            Err(e) => Err(e),
        };

        slot.last_failure = result.as_ref().err().cloned();
        self.generation.fetch_add(1, Ordering::Release);
        result
    }

    /// Whether a usable token is currently cached.
    pub async fn is_cached(&self) -> bool {
        matches!(self.cached().await, Ok(Some(_)))
    }

    async fn cached(&self) -> IhsResult<Option<AuthDetail>> {
        Ok(self.store.get().await?.filter(AuthDetail::is_usable))
    }

    async fn fetch(&self, config: &Config) -> IhsResult<AuthDetail> {
        if !config.has_credentials() {
            return Err(IhsError::MissingCredentials);
        }

        // The platform's "client secret" is the OAuth client id
        let form = [
            ("client_id", config.client_secret.as_str()),
            ("client_secret", config.secret_key.as_str()),
        ];

        let response = self
            .http
            .post(token_url(&config.base_url))
            .query(&[("grant_type", "client_credentials")])
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            warn!(%status, mode = %config.mode, "SATUSEHAT token request rejected");
            return Err(IhsError::AuthenticationFailed(body));
        }

        let detail: AuthDetail = response
            .json()
            .await
            .map_err(|e| IhsError::InvalidResponse(format!("invalid token response: {e}")))?;

        if detail.access_token.trim().is_empty() {
            return Err(IhsError::InvalidResponse(
                "token response did not include access_token".to_string(),
            ));
        }

        info!(
            mode = %config.mode,
            expires_in = %detail.expires_in,
            "Obtained SATUSEHAT access token"
        );
        Ok(detail)
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use mockito::Matcher;
    use serde_json::json;

    const TOKEN_PATH: &str = "/oauth2/v1/accesstoken";

    fn manager(base_url: &str, client_secret: &str, secret_key: &str) -> AuthManager {
        let resolver = ConfigResolver::new(
            ConfigOverrides::default()
                .client_secret(client_secret)
                .secret_key(secret_key)
                .base_url(base_url),
        )
        .with_env_lookup(|_| None);
        AuthManager::new(Arc::new(resolver), reqwest::Client::new())
    }

    fn token_body(access_token: &str, issued_at_ms: i64, expires_in: i64) -> String {
        json!({
            "access_token": access_token,
            "token_type": "BearerToken",
            "issued_at": issued_at_ms.to_string(),
            "expires_in": expires_in.to_string(),
            "client_id": "client-id",
            "organization_name": "RS Contoh",
            "status": "approved",
        })
        .to_string()
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    #[tokio::test]
    async fn second_call_reuses_cached_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("tok-1", now_ms(), 3599))
            .expect(1)
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "secret-key");
        let first = auth.auth().await.unwrap();
        let second = auth.auth().await.unwrap();

        assert_eq!(first.access_token, "tok-1");
        assert_eq!(second, first);
        assert_eq!(first.extra["organization_name"], "RS Contoh");
        assert!(auth.is_cached().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(token_body("shared", now_ms(), 3599))
            .expect(1)
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "secret-key");
        let (a, b, c, d) = tokio::join!(auth.auth(), auth.auth(), auth.auth(), auth.auth());

        for detail in [a, b, c, d] {
            assert_eq!(detail.unwrap().access_token, "shared");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_rejection() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"fault":{"faultstring":"Invalid client identifier"}}"#)
            .expect(1)
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "wrong");
        let (a, b, c, d) = tokio::join!(auth.auth(), auth.auth(), auth.auth(), auth.auth());

        for result in [a, b, c, d] {
            match result {
                Err(IhsError::AuthenticationFailed(body)) => {
                    assert!(body.contains("Invalid client identifier"))
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn later_call_after_failure_fetches_again() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("denied")
            .expect(2)
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "wrong");
        assert!(auth.auth().await.is_err());
        assert!(auth.auth().await.is_err());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn truncated_rejection_body_is_a_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Headers, then the form body announced by Content-Length
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 100\r\n\r\n{\"fault\"")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let auth = manager(&base_url, "client-id", "secret-key");
        let err = auth.auth().await.unwrap_err();

        assert_eq!(err.error_code(), "transport_error");
    }

    #[tokio::test]
    async fn missing_credentials_never_hit_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let auth = manager(&server.url(), "", "");
        let err = auth.auth().await.unwrap_err();

        assert!(matches!(err, IhsError::MissingCredentials));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_surface_the_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"fault":{"faultstring":"Invalid client identifier"}}"#)
            .expect(1)
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "wrong");
        let err = auth.auth().await.unwrap_err();

        match err {
            IhsError::AuthenticationFailed(body) => {
                assert!(body.contains("Invalid client identifier"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!auth.is_cached().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_token_in_custom_store_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(token_body("renewed", now_ms(), 3599))
            .expect(1)
            .create_async()
            .await;

        // A store that never expires anything on its own
        struct StickyStore(Mutex<Option<AuthDetail>>);

        #[async_trait::async_trait]
        impl AuthStore for StickyStore {
            async fn get(&self) -> IhsResult<Option<AuthDetail>> {
                Ok(self.0.lock().await.clone())
            }
            async fn set(&self, detail: AuthDetail) -> IhsResult<()> {
                *self.0.lock().await = Some(detail);
                Ok(())
            }
        }

        let stale: AuthDetail =
            serde_json::from_str(&token_body("stale", now_ms() - 3_600_000, 3599)).unwrap();
        let store = Arc::new(StickyStore(Mutex::new(Some(stale))));
        let auth = manager(&server.url(), "client-id", "secret-key").with_store(store.clone());

        let detail = auth.auth().await.unwrap();

        assert_eq!(detail.access_token, "renewed");
        assert_eq!(store.0.lock().await.as_ref().unwrap().access_token, "renewed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_without_access_token_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(token_body("", now_ms(), 3599))
            .create_async()
            .await;

        let auth = manager(&server.url(), "client-id", "secret-key");
        let err = auth.auth().await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_response");
    }
}
