// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token storage capability.
//!
//! The auth manager only needs to read and replace one token record, so a
//! store is a two-method trait. The default keeps the record in process
//! memory; a shared cache (Redis, a database row) can be plugged in to reuse
//! one token across processes.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::detail::AuthDetail;
use crate::error::IhsResult;

/// Backing store for the cached access token.
///
/// Returning `Ok(None)` from [`get`](Self::get) triggers a fresh
/// authentication. The manager re-checks expiry on whatever is returned, so
/// stores are free to hand back stale records.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn get(&self) -> IhsResult<Option<AuthDetail>>;

    /// Replace the stored record wholesale.
    async fn set(&self, detail: AuthDetail) -> IhsResult<()>;
}

/// Single-slot in-process token cache.
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    slot: RwLock<Option<AuthDetail>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn get(&self) -> IhsResult<Option<AuthDetail>> {
        let mut slot = self.slot.write().await;
        if slot.as_ref().is_some_and(|detail| !detail.is_usable()) {
            // Expired or about to: forget it
            *slot = None;
        }
        Ok(slot.clone())
    }

    async fn set(&self, detail: AuthDetail) -> IhsResult<()> {
        *self.slot.write().await = Some(detail);
        Ok(())
    }
}
