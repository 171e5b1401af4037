// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API families and URL construction.

use url::Url;

/// Path of the OAuth2 family under the environment root.
pub const AUTH_PREFIX: &str = "oauth2/v1";

/// Backend service a request is addressed to.
///
/// Each family lives under its own prefix of the environment root. `Base`
/// addresses the root itself, for endpoints this crate does not wrap yet
/// (the path must then carry the full prefix, e.g.
/// `/masterdata/v1/mastersaranaindex/mastersarana`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    Base,
    Fhir,
    Consent,
    Kyc,
    Kfa,
    KfaV2,
    KfaV3,
}

impl ApiFamily {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            ApiFamily::Base => None,
            ApiFamily::Fhir => Some("fhir-r4/v1"),
            ApiFamily::Consent => Some("consent/v1"),
            ApiFamily::Kyc => Some("kyc/v1"),
            ApiFamily::Kfa => Some("kfa"),
            ApiFamily::KfaV2 => Some("kfa-v2"),
            ApiFamily::KfaV3 => Some("kfa-v3"),
        }
    }

    /// Base URL of this family under `root`.
    pub fn base_url(self, root: &str) -> String {
        let root = root.trim_end_matches('/');
        match self.prefix() {
            Some(prefix) => format!("{root}/{prefix}"),
            None => root.to_string(),
        }
    }
}

/// Token endpoint under `root`.
pub fn token_url(root: &str) -> String {
    format!("{}/{AUTH_PREFIX}/accesstoken", root.trim_end_matches('/'))
}

/// Join `path` onto `base` without losing any of the base's path segments.
///
/// Plain URL resolution treats a base without a trailing slash as a file and
/// an absolute path as a reset, so `https://host/api/v1` + `/Resource` would
/// become `https://host/Resource`. The base is slash-terminated and the
/// path's leading slashes are stripped first.
pub fn build_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let base = if base.ends_with('/') {
        Url::parse(base)?
    } else {
        Url::parse(&format!("{base}/"))?
    };
    base.join(path.trim_start_matches('/'))
}
