// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outgoing request description.

use std::collections::{BTreeMap, HashMap};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;

use super::endpoint::ApiFamily;

/// Ordered query parameters. Duplicate keys are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for SearchParams {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for SearchParams {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for SearchParams {
    fn from(map: HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for SearchParams {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

/// One call to a SATUSEHAT API family.
///
/// The bearer header is added by the dispatcher; headers set here are
/// applied afterwards and win on a name clash.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub api: ApiFamily,
    pub path: String,
    pub search_params: Option<SearchParams>,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn new(api: ApiFamily, path: impl Into<String>) -> Self {
        Self {
            api,
            path: path.into(),
            search_params: None,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(api: ApiFamily, path: impl Into<String>) -> Self {
        Self::new(api, path)
    }

    pub fn post(api: ApiFamily, path: impl Into<String>) -> Self {
        Self::new(api, path).method(Method::POST)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replaces the URL query. An empty set clears it.
    pub fn search_params(mut self, params: impl Into<SearchParams>) -> Self {
        self.search_params = Some(params.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with `Content-Type: application/json`.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(value.to_string())
    }

    /// Text body with `Content-Type: text/plain`.
    pub fn text(self, body: impl Into<String>) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .body(body.into())
    }
}
