// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pharmaceutical and medical-device catalog (KFA, Kamus Farmasi dan Alat
//! Kesehatan).
//!
//! Payloads are passed through as JSON. Every call returns an object with a
//! boolean `success`: the platform's body for responses below 500 (with
//! `success` set from the status), or a client-error object shaped like the
//! platform's validation errors otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::json_unless_server_error;
use crate::client::{ApiFamily, IhsClient, RequestSpec, SearchParams};
use crate::error::IhsResult;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 50;

/// `GET {kfa}/farmalkes-price-jkn`
#[derive(Debug, Clone, Default)]
pub struct PriceJknQuery {
    pub kfa_code: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `regional1` through `regional6`.
    pub region_code: Option<String>,
    /// Legal reference the price is based on.
    pub document_ref: Option<String>,
}

impl PriceJknQuery {
    fn to_params(&self) -> SearchParams {
        SearchParams::from([
            ("page", self.page.unwrap_or(DEFAULT_PAGE).to_string()),
            ("limit", self.limit.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
            ("kfa_code", self.kfa_code.clone()),
            ("region_code", self.region_code.clone().unwrap_or_default()),
            ("document_ref", self.document_ref.clone().unwrap_or_default()),
        ])
    }
}

/// Source a product code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductIdentifier {
    /// Marketing authorization number (BPOM).
    Nie,
    /// Government procurement catalog (LKPP).
    Lkpp,
    Kfa,
}

impl ProductIdentifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductIdentifier::Nie => "nie",
            ProductIdentifier::Lkpp => "lkpp",
            ProductIdentifier::Kfa => "kfa",
        }
    }
}

/// `GET {kfa-v2}/products`
#[derive(Debug, Clone)]
pub struct ProductDetailQuery {
    pub identifier: ProductIdentifier,
    pub code: String,
}

/// `GET {kfa-v2}/products/all`
#[derive(Debug, Clone, Default)]
pub struct ProductsQuery {
    /// e.g. `farmasi`
    pub product_type: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// `YYYY-MM-DD`
    pub from_date: Option<String>,
    /// `YYYY-MM-DD`
    pub to_date: Option<String>,
    pub farmalkes_type: Option<String>,
    pub keyword: Option<String>,
    pub template_code: Option<String>,
    pub packaging_code: Option<String>,
}

impl ProductsQuery {
    fn to_params(&self) -> SearchParams {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        SearchParams::from([
            ("page", self.page.unwrap_or(DEFAULT_PAGE).to_string()),
            ("size", self.size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
            ("product_type", self.product_type.clone()),
            ("from_date", optional(&self.from_date)),
            ("to_date", optional(&self.to_date)),
            ("farmalkes_type", optional(&self.farmalkes_type)),
            ("keyword", optional(&self.keyword)),
            ("template_code", optional(&self.template_code)),
            ("packaging_code", optional(&self.packaging_code)),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlkesState {
    Draft,
    #[default]
    Valid,
}

impl AlkesState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlkesState::Draft => "draft",
            AlkesState::Valid => "valid",
        }
    }
}

/// `GET {kfa-v3}/alkes/products`
#[derive(Debug, Clone, Default)]
pub struct AlkesQuery {
    pub state: AlkesState,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

pub struct Kfa<'a> {
    client: &'a IhsClient,
}

impl<'a> Kfa<'a> {
    pub(crate) fn new(client: &'a IhsClient) -> Self {
        Self { client }
    }

    /// JKN (national health insurance) price of a product.
    pub async fn get_price_jkn(&self, query: &PriceJknQuery) -> Value {
        let request = RequestSpec::get(ApiFamily::Kfa, "/farmalkes-price-jkn")
            .search_params(query.to_params());
        self.send(request).await
    }

    pub async fn get_product_detail(&self, query: &ProductDetailQuery) -> Value {
        let request = RequestSpec::get(ApiFamily::KfaV2, "/products").search_params([
            ("identifier", query.identifier.as_str()),
            ("code", query.code.as_str()),
        ]);
        self.send(request).await
    }

    /// Paginated product search.
    pub async fn get_products(&self, query: &ProductsQuery) -> Value {
        let request =
            RequestSpec::get(ApiFamily::KfaV2, "/products/all").search_params(query.to_params());
        self.send(request).await
    }

    /// Medical devices in the given variant state.
    pub async fn get_alkes(&self, query: &AlkesQuery) -> Value {
        let request = RequestSpec::get(ApiFamily::KfaV3, "/alkes/products").search_params([
            ("page", query.page.unwrap_or(DEFAULT_PAGE).to_string()),
            ("size", query.size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
            ("state", query.state.as_str().to_string()),
        ]);
        self.send(request).await
    }

    async fn send(&self, request: RequestSpec) -> Value {
        let path = request.path.clone();
        match self.try_send(request).await {
            Ok(json) => json,
            Err(e) => {
                warn!(%path, error = %e, "KFA request failed");
                client_error(&e.to_string())
            }
        }
    }

    async fn try_send(&self, request: RequestSpec) -> IhsResult<Value> {
        let response = self.client.request(request).await?;
        let (status, mut json) = json_unless_server_error(response).await?;
        match json.as_object_mut() {
            Some(object) => {
                object.insert("success".to_string(), Value::Bool(status.is_success()));
                Ok(json)
            }
            None => Ok(client_error(&json.to_string())),
        }
    }
}

/// `{"success": false, "detail": [{"loc": [], "msg": msg, "type": "unknown"}]}`
pub fn client_error(msg: &str) -> Value {
    json!({
        "success": false,
        "detail": [{ "loc": [], "msg": msg, "type": "unknown" }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{mock_token, test_client};
    use mockito::Matcher;

    #[tokio::test]
    async fn price_jkn_applies_defaults_and_sets_success() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, "tok").await;
        let price = server
            .mock("GET", "/kfa/farmalkes-price-jkn")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("kfa_code".into(), "93001019".into()),
                Matcher::UrlEncoded("region_code".into(), "regional1".into()),
                Matcher::UrlEncoded("document_ref".into(), "".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"total":1,"page":1,"limit":50,"items":{"data":[]}}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .kfa()
            .get_price_jkn(&PriceJknQuery {
                kfa_code: "93001019".to_string(),
                region_code: Some("regional1".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(result["success"], true);
        assert_eq!(result["total"], 1);
        price.assert_async().await;
    }

    #[tokio::test]
    async fn product_detail_client_error_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, "tok").await;
        let _detail = server
            .mock("GET", "/kfa-v2/products")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("identifier".into(), "nie".into()),
                Matcher::UrlEncoded("code".into(), "DKL0000000000A1".into()),
            ]))
            .with_status(422)
            .with_body(
                json!({
                    "detail": [{
                        "loc": ["query", "code"],
                        "msg": "invalid",
                        "type": "value_error"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .kfa()
            .get_product_detail(&ProductDetailQuery {
                identifier: ProductIdentifier::Nie,
                code: "DKL0000000000A1".to_string(),
            })
            .await;

        assert_eq!(result["success"], false);
        assert_eq!(result["detail"][0]["type"], "value_error");
    }

    #[tokio::test]
    async fn products_sends_every_filter() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, "tok").await;
        let products = server
            .mock("GET", "/kfa-v2/products/all")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "3".into()),
                Matcher::UrlEncoded("size".into(), "50".into()),
                Matcher::UrlEncoded("product_type".into(), "alkes".into()),
                Matcher::UrlEncoded("keyword".into(), "glove".into()),
                Matcher::UrlEncoded("from_date".into(), "".into()),
                Matcher::UrlEncoded("packaging_code".into(), "".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"total":0,"page":3,"size":50,"items":{"data":[]}}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .kfa()
            .get_products(&ProductsQuery {
                product_type: "alkes".to_string(),
                page: Some(3),
                keyword: Some("glove".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(result["success"], true);
        products.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_becomes_client_error() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, "tok").await;
        let _alkes = server
            .mock("GET", "/kfa-v3/alkes/products")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "draft".into()),
                Matcher::UrlEncoded("size".into(), "10".into()),
            ]))
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .kfa()
            .get_alkes(&AlkesQuery {
                state: AlkesState::Draft,
                size: Some(10),
                ..Default::default()
            })
            .await;

        assert_eq!(
            result,
            json!({
                "success": false,
                "detail": [{ "loc": [], "msg": "upstream unavailable", "type": "unknown" }]
            })
        );
    }

    #[tokio::test]
    async fn missing_credentials_become_client_error() {
        let server = mockito::Server::new_async().await;
        let resolver = crate::config::ConfigResolver::new(
            crate::config::ConfigOverrides::default().base_url(server.url()),
        )
        .with_env_lookup(|_| None);
        let client = IhsClient::with_http_client(resolver, reqwest::Client::new());

        let result = client.kfa().get_alkes(&AlkesQuery::default()).await;

        assert_eq!(result["success"], false);
        assert_eq!(result["detail"][0]["type"], "unknown");
    }
}
