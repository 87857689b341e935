//! Certificate cache.
//!
//! # Responsibilities
//! - Map SNI hostnames to certificate bundles
//! - Expire entries ahead of certificate expiry
//! - Bridge async certificate loading to the synchronous handshake path
//!
//! # Design Decisions
//! - Entries are replaced, never mutated; readers need no locks
//! - TTL is `notAfter − 1 day` so a bundle is never served into its
//!   final day of validity
//! - `get_sync` waits on a condition variable with a hard deadline; a
//!   miss fails that handshake (fail-closed), it never blocks the
//!   accept path indefinitely

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use std::sync::Arc;

use crate::certs::bundle::CertBundle;

/// Default bound for hot-path lookups from the TLS handshake callback.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Entries expire one day before the certificate itself does.
const EXPIRY_MARGIN: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedCert {
    bundle: Arc<CertBundle>,
    expires_at: SystemTime,
}

/// Hostname-keyed certificate store.
///
/// Writers are async tasks populating certificates; the one latency
/// critical reader is the TLS SNI callback going through [`get_sync`].
///
/// [`get_sync`]: CertificateCache::get_sync
pub struct CertificateCache {
    entries: DashMap<String, CachedCert>,
    version: Mutex<u64>,
    inserted: Condvar,
}

impl CertificateCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            version: Mutex::new(0),
            inserted: Condvar::new(),
        }
    }

    /// Insert or replace the bundle for a hostname.
    ///
    /// A bundle already within [`EXPIRY_MARGIN`] of its expiry is
    /// inserted as immediately stale rather than rejected.
    pub fn set(&self, hostname: &str, bundle: Arc<CertBundle>) {
        let expires_at = bundle
            .not_after
            .checked_sub(EXPIRY_MARGIN)
            .unwrap_or(UNIX_EPOCH);

        tracing::debug!(
            hostname = %hostname,
            expires_at = ?expires_at,
            "Certificate cached"
        );

        self.entries
            .insert(normalize(hostname), CachedCert { bundle, expires_at });

        // Bump under the lock so waiters can't miss the insert.
        let mut version = self
            .version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *version = version.wrapping_add(1);
        self.inserted.notify_all();
    }

    /// Non-blocking lookup. Absent on miss or expiry, never an error.
    pub fn get(&self, hostname: &str) -> Option<Arc<CertBundle>> {
        let key = normalize(hostname);
        let expired = match self.entries.get(&key) {
            Some(entry) if entry.expires_at > SystemTime::now() => {
                return Some(entry.bundle.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
            tracing::debug!(hostname = %key, "Expired certificate evicted");
        }
        None
    }

    /// Bounded synchronous lookup for the TLS handshake hot path.
    ///
    /// Blocks the calling thread for at most `timeout` waiting for a
    /// concurrent load to land. Returns absent on miss or timeout; the
    /// TLS layer then fails that handshake only.
    pub fn get_sync(&self, hostname: &str, timeout: Duration) -> Option<Arc<CertBundle>> {
        let deadline = Instant::now() + timeout;
        let mut version = self
            .version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(bundle) = self.get(hostname) {
                return Some(bundle);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let seen = *version;
            let (guard, result) = self
                .inserted
                .wait_timeout_while(version, deadline - now, |v| *v == seen)
                .unwrap_or_else(PoisonError::into_inner);
            version = guard;
            if result.timed_out() && *version == seen {
                return None;
            }
        }
    }

    /// Explicit eviction, used when a host's certificate source is
    /// reconfigured or the host disappears from the document.
    pub fn remove(&self, hostname: &str) {
        if self.entries.remove(&normalize(hostname)).is_some() {
            tracing::info!(hostname = %hostname, "Certificate removed from cache");
        }
    }

    /// Hostnames currently present, fresh or stale.
    pub fn hostnames(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for CertificateCache {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(hostname: &str) -> String {
    hostname.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn bundle_expiring_at(not_after: SystemTime) -> Arc<CertBundle> {
        let mut params = rcgen::CertificateParams::new(vec!["cache.test".to_string()]).unwrap();
        params.not_after = not_after.into();
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        let pem = format!("{}{}", cert.pem(), key.serialize_pem());
        Arc::new(CertBundle::from_pem(&pem, None).unwrap())
    }

    fn long_lived_bundle() -> Arc<CertBundle> {
        bundle_expiring_at(SystemTime::now() + Duration::from_secs(90 * 24 * 60 * 60))
    }

    #[test]
    fn set_then_get_returns_bundle() {
        let cache = CertificateCache::new();
        cache.set("A.Test", long_lived_bundle());
        // Lookups are case-insensitive.
        assert!(cache.get("a.test").is_some());
        assert!(cache.get("other.test").is_none());
    }

    #[test]
    fn entry_expires_one_day_before_not_after() {
        let cache = CertificateCache::new();
        // x509 times have one-second precision; leave room for truncation.
        let not_after = SystemTime::now() + EXPIRY_MARGIN + Duration::from_secs(2);
        cache.set("short.test", bundle_expiring_at(not_after));
        assert!(cache.get("short.test").is_some());

        std::thread::sleep(Duration::from_millis(2500));
        assert!(cache.get("short.test").is_none());
    }

    #[test]
    fn bundle_inside_margin_is_immediately_stale() {
        let cache = CertificateCache::new();
        let not_after = SystemTime::now() + Duration::from_secs(60 * 60);
        cache.set("stale.test", bundle_expiring_at(not_after));
        assert!(cache.get("stale.test").is_none());
    }

    #[test]
    fn get_sync_returns_within_timeout_on_miss() {
        let cache = CertificateCache::new();
        let started = Instant::now();
        let result = cache.get_sync("missing.test", Duration::from_millis(100));
        assert!(result.is_none());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn get_sync_observes_concurrent_insert() {
        let cache = Arc::new(CertificateCache::new());
        let writer = cache.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            writer.set("late.test", long_lived_bundle());
        });

        let result = cache.get_sync("late.test", Duration::from_secs(2));
        assert!(result.is_some());
        handle.join().unwrap();
    }

    #[test]
    fn hostnames_lists_normalized_entries() {
        let cache = CertificateCache::new();
        cache.set("A.Test", long_lived_bundle());
        cache.set("b.test", long_lived_bundle());

        let mut names = cache.hostnames();
        names.sort();
        assert_eq!(names, vec!["a.test".to_string(), "b.test".to_string()]);
    }

    #[test]
    fn remove_evicts_entry() {
        let cache = CertificateCache::new();
        cache.set("gone.test", long_lived_bundle());
        cache.remove("gone.test");
        assert!(cache.get("gone.test").is_none());
    }
}
