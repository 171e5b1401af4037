// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Configuration
//!
//! Configuration is merged from three layers, highest precedence first:
//! explicit user overrides, environment variables, built-in defaults. Empty
//! values count as unset at every layer.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `IHS_CLIENT_SECRET` | Client secret from the SATUSEHAT API access page | empty |
//! | `IHS_SECRET_KEY` | Secret key from the SATUSEHAT API access page | empty |
//! | `IHS_MODE` | `sandbox` (aliases `development`, `staging`) or `production` | `sandbox` |
//! | `IHS_KYC_PEM_FILE` | Path to the KYC server public key, absolute or relative | `publickey.sandbox.pem` / `publickey.pem` |
//! | `IHS_BASE_URL` | Root URL override, e.g. for a private gateway | mode root URL |

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CLIENT_SECRET_ENV: &str = "IHS_CLIENT_SECRET";
pub const SECRET_KEY_ENV: &str = "IHS_SECRET_KEY";
pub const MODE_ENV: &str = "IHS_MODE";
pub const KYC_PEM_FILE_ENV: &str = "IHS_KYC_PEM_FILE";
pub const BASE_URL_ENV: &str = "IHS_BASE_URL";

pub const SANDBOX_BASE_URL: &str = "https://api-satusehat-stg.dto.kemkes.go.id";
pub const PRODUCTION_BASE_URL: &str = "https://api-satusehat.kemkes.go.id";

pub const SANDBOX_KYC_PEM_FILE: &str = "publickey.sandbox.pem";
pub const PRODUCTION_KYC_PEM_FILE: &str = "publickey.pem";

/// API environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Sandbox,
    Production,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Sandbox => "sandbox",
            Mode::Production => "production",
        }
    }

    /// Root URL of every API family in this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Mode::Sandbox => SANDBOX_BASE_URL,
            Mode::Production => PRODUCTION_BASE_URL,
        }
    }

    /// KYC public key file used when none is configured.
    pub fn default_kyc_pem_file(self) -> &'static str {
        match self {
            Mode::Production => PRODUCTION_KYC_PEM_FILE,
            Mode::Sandbox => SANDBOX_KYC_PEM_FILE,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode \"{0}\"")]
pub struct InvalidMode(pub String);

impl FromStr for Mode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "development" | "staging" => Ok(Mode::Sandbox),
            "production" => Ok(Mode::Production),
            _ => Err(InvalidMode(s.to_string())),
        }
    }
}

/// Partial configuration supplied by the caller.
///
/// Every field left as `None` (or set to an empty string) falls through to
/// the environment and then to the built-in default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub client_secret: Option<String>,
    pub secret_key: Option<String>,
    /// Kept as text so invalid values hit the same fallback as the environment.
    pub mode: Option<String>,
    pub kyc_pem_file: Option<String>,
    pub base_url: Option<String>,
}

impl ConfigOverrides {
    pub fn client_secret(mut self, value: impl Into<String>) -> Self {
        self.client_secret = Some(value.into());
        self
    }

    pub fn secret_key(mut self, value: impl Into<String>) -> Self {
        self.secret_key = Some(value.into());
        self
    }

    pub fn mode(mut self, value: impl ToString) -> Self {
        self.mode = Some(value.to_string());
        self
    }

    pub fn kyc_pem_file(mut self, value: impl Into<String>) -> Self {
        self.kyc_pem_file = Some(value.into());
        self
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }
}

/// Fully resolved, immutable client configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub client_secret: String,
    pub secret_key: String,
    pub mode: Mode,
    pub kyc_pem_file: String,
    pub base_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_secret", &redact(&self.client_secret))
            .field("secret_key", &redact(&self.secret_key))
            .field("mode", &self.mode)
            .field("kyc_pem_file", &self.kyc_pem_file)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Merge overrides over the environment over built-in defaults.
    pub fn resolve(overrides: &ConfigOverrides, env: &dyn Fn(&str) -> Option<String>) -> Self {
        let pick = |user: &Option<String>, name: &str| -> Option<String> {
            non_empty(user.as_deref()).or_else(|| non_empty(env(name).as_deref()))
        };

        let mode = match pick(&overrides.mode, MODE_ENV) {
            None => Mode::default(),
            Some(raw) => raw.parse::<Mode>().unwrap_or_else(|e: InvalidMode| {
                warn!(mode = %e.0, "Invalid mode, falling back to \"sandbox\"");
                Mode::Sandbox
            }),
        };

        let kyc_pem_file = pick(&overrides.kyc_pem_file, KYC_PEM_FILE_ENV)
            .unwrap_or_else(|| mode.default_kyc_pem_file().to_string());

        let base_url = pick(&overrides.base_url, BASE_URL_ENV)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| mode.base_url().to_string());

        Self {
            client_secret: pick(&overrides.client_secret, CLIENT_SECRET_ENV).unwrap_or_default(),
            secret_key: pick(&overrides.secret_key, SECRET_KEY_ENV).unwrap_or_default(),
            mode,
            kyc_pem_file,
            base_url,
        }
    }

    /// Both halves of the client credential pair are present.
    pub fn has_credentials(&self) -> bool {
        !self.client_secret.is_empty() && !self.secret_key.is_empty()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
type OverridesProvider = Arc<dyn Fn() -> ConfigOverrides + Send + Sync>;

/// Lazily resolves and caches a [`Config`].
///
/// The first [`resolve`](Self::resolve) merges the layers and freezes the
/// result; later calls return the same `Arc` until
/// [`invalidate`](Self::invalidate) is called.
pub struct ConfigResolver {
    provider: OverridesProvider,
    env: EnvLookup,
    resolved: RwLock<Option<Arc<Config>>>,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self::with_provider(move || overrides.clone())
    }

    /// Environment and built-in defaults only.
    pub fn from_env() -> Self {
        Self::new(ConfigOverrides::default())
    }

    /// Overrides computed on every resolution, so a re-resolution after
    /// [`invalidate`](Self::invalidate) sees fresh values.
    pub fn with_provider<F>(provider: F) -> Self
    where
        F: Fn() -> ConfigOverrides + Send + Sync + 'static,
    {
        Self {
            provider: Arc::new(provider),
            env: Arc::new(process_env),
            resolved: RwLock::new(None),
        }
    }

    /// Replace the environment lookup (process environment by default).
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn resolve(&self) -> Arc<Config> {
        if let Some(config) = self.read_slot().as_ref() {
            return Arc::clone(config);
        }

        let mut slot = self.resolved.write().unwrap_or_else(|e| e.into_inner());
        if let Some(config) = slot.as_ref() {
            return Arc::clone(config);
        }
        let config = Arc::new(Config::resolve(&(self.provider)(), self.env.as_ref()));
        *slot = Some(Arc::clone(&config));
        config
    }

    /// Drop the frozen configuration; the next `resolve` reads all layers again.
    pub fn invalidate(&self) {
        *self.resolved.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Config>>> {
        self.resolved.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("resolved", &*self.read_slot())
            .finish_non_exhaustive()
    }
}
