//! Time-bounded ban registry.
//!
//! Maps normalized peer addresses to ban entries with a fixed TTL.
//! The registry is the single source of truth for the ban list pushed
//! to the client: entries are created on first detection, never
//! refreshed by repeat detections, and purged lazily by a sweep before
//! every serialization. Access is strictly sequential within a polling
//! cycle, so no locking is needed.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::utils::addr::normalize_peer_address;

/// One banned address. Owned exclusively by the registry.
#[derive(Debug, Clone, Copy)]
pub struct BanEntry {
    created_at: Instant,
    expires_at: Instant,
}

impl BanEntry {
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// TTL-keyed set of banned addresses.
#[derive(Debug)]
pub struct BanRegistry {
    ban_duration: Duration,
    entries: BTreeMap<String, BanEntry>,
}

impl BanRegistry {
    pub fn new(ban_duration: Duration) -> Self {
        Self {
            ban_duration,
            entries: BTreeMap::new(),
        }
    }

    /// Insert an address if absent. Returns `true` when a new entry was
    /// created.
    ///
    /// The address is normalized before use as a key. A repeat
    /// detection before expiry is a no-op: the first-detection
    /// timestamp wins and the TTL is not extended.
    pub fn insert(&mut self, address: &str, now: Instant) -> bool {
        let key = normalize_peer_address(address);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            BanEntry {
                created_at: now,
                expires_at: now + self.ban_duration,
            },
        );
        true
    }

    /// Remove every entry whose TTL has run out. Returns the number of
    /// entries purged.
    ///
    /// Must be called before every serialization so the externally
    /// visible ban list never contains stale entries.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Current non-expired addresses, in stable (sorted) order.
    pub fn snapshot(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Materialize the registry into the newline-delimited wire form
    /// the client's `banned_IPs` preference expects.
    pub fn serialize(&self) -> String {
        let mut banned = String::new();
        for address in self.entries.keys() {
            banned.push_str(address);
            banned.push('\n');
        }
        banned
    }

    pub fn entry(&self, address: &str) -> Option<&BanEntry> {
        self.entries.get(&normalize_peer_address(address))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entry(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
