/// Response cache for unfiltered appointment listings
///
/// Keys embed a namespace version; `invalidate` bumps it so every earlier entry
/// becomes unreachable and ages out of the LRU. Cache faults never fail a request.
use clinic_core::{Appointment, Page, Pagination, Scope};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type CachedPage = (Instant, Arc<Page<Appointment>>);

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CachedPage>>,
    version: AtomicU64,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            version: AtomicU64::new(0),
            ttl,
        }
    }

    /// Key for one page of an unfiltered listing as seen by `scope`
    pub fn list_key(&self, scope: Scope, pagination: Pagination) -> String {
        let scope = match scope {
            Scope::All => "all".to_string(),
            Scope::Participant(user) => format!("user:{user}"),
        };
        format!(
            "appointments:v{}:{}:{}:{}",
            self.version.load(Ordering::Acquire),
            scope,
            pagination.limit,
            pagination.offset
        )
    }

    pub fn get(&self, key: &str) -> Option<Arc<Page<Appointment>>> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Response cache unavailable: {}", e);
                return None;
            }
        };

        match entries.get(key) {
            Some((inserted, page)) if inserted.elapsed() < self.ttl => {
                tracing::debug!(key, "Response cache hit");
                Some(Arc::clone(page))
            }
            Some(_) => {
                entries.pop(key);
                tracing::debug!(key, "Response cache entry expired");
                None
            }
            None => {
                tracing::debug!(key, "Response cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: String, page: Arc<Page<Appointment>>) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.put(key, (Instant::now(), page));
            }
            Err(e) => tracing::warn!("Response cache unavailable: {}", e),
        }
    }

    /// Drop every appointment listing
    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(version, "Invalidated appointment listings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::UserId;

    fn page(count: u64) -> Arc<Page<Appointment>> {
        Arc::new(Page {
            count,
            limit: 10,
            offset: 0,
            results: vec![],
        })
    }

    fn first_page() -> Pagination {
        Pagination {
            limit: 10,
            offset: 0,
        }
    }

    #[test]
    fn stores_and_returns_pages() {
        let cache = ResponseCache::new(16, Duration::from_secs(300));
        let key = cache.list_key(Scope::All, first_page());

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), page(3));
        assert_eq!(cache.get(&key).unwrap().count, 3);
    }

    #[test]
    fn keys_separate_scopes_and_windows() {
        let cache = ResponseCache::new(16, Duration::from_secs(300));
        let all = cache.list_key(Scope::All, first_page());
        let user = cache.list_key(Scope::Participant(UserId::new(4)), first_page());
        let other = cache.list_key(Scope::Participant(UserId::new(5)), first_page());
        let second = cache.list_key(
            Scope::All,
            Pagination {
                limit: 10,
                offset: 10,
            },
        );

        assert_ne!(all, user);
        assert_ne!(user, other);
        assert_ne!(all, second);
    }

    #[test]
    fn invalidate_makes_old_entries_unreachable() {
        let cache = ResponseCache::new(16, Duration::from_secs(300));
        let before = cache.list_key(Scope::All, first_page());
        cache.insert(before.clone(), page(1));

        cache.invalidate();

        let after = cache.list_key(Scope::All, first_page());
        assert_ne!(before, after);
        assert!(cache.get(&after).is_none());
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = ResponseCache::new(16, Duration::ZERO);
        let key = cache.list_key(Scope::All, first_page());
        cache.insert(key.clone(), page(1));

        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn zero_capacity_still_works() {
        let cache = ResponseCache::new(0, Duration::from_secs(300));
        let key = cache.list_key(Scope::All, first_page());
        cache.insert(key.clone(), page(2));
        assert_eq!(cache.get(&key).unwrap().count, 2);
    }
}
