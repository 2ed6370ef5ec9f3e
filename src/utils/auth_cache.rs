//! Local credential cache
//!
//! Holds the key issued by the Player2 local app together with its expiry.
//! Shared by every call that goes through the same resolver.

use chrono::{DateTime, Utc};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedKey {
    api_key: String,
    expiry: DateTime<Utc>,
}

/// Single-slot key cache
///
/// Concurrent writers race with last-write-wins. The lock is never held
/// across an await point.
#[derive(Debug, Default)]
pub struct LocalAuthCache {
    slot: RwLock<Option<CachedKey>>,
}

impl LocalAuthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key, if still valid at `now`
    pub fn get(&self, now: DateTime<Utc>) -> Option<String> {
        if let Ok(slot) = self.slot.read() {
            match slot.as_ref() {
                Some(entry) if now < entry.expiry => Some(entry.api_key.clone()),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Store a key valid until `expiry`
    pub fn store(&self, api_key: &str, expiry: DateTime<Utc>) {
        if let Ok(mut slot) = self.slot.write() {
            debug!("🔑 Caching local app key until {}", expiry);
            *slot = Some(CachedKey { api_key: api_key.to_string(), expiry });
        }
    }

    /// Drop the cached key
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            if slot.take().is_some() {
                debug!("Cleared cached local app key");
            }
        }
    }

    /// Expiry of the cached key, valid or not
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.slot.read().ok().and_then(|slot| slot.as_ref().map(|e| e.expiry))
    }
}
