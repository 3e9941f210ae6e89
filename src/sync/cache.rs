//! Time-bounded memoization of upstream fetches.
//!
//! Location lists are expensive to fetch and change rarely, so each source
//! keeps the last result per key for a configurable time-to-live. A zero TTL
//! turns caching off.

use {
    anyhow::Result,
    moka::sync::Cache,
    std::time::Duration,
};

/// Upper bound on cached keys; each source caches a handful at most.
const MAX_ENTRIES: u64 = 64;

pub struct TtlCache<T> {
    /// `None` when caching is disabled.
    entries: Option<Cache<String, T>>,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        let entries = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build()
        });
        Self { entries }
    }

    /// Returns the cached value for `key` while it is fresh, otherwise calls
    /// `load` and stores what it returns. The flag is true on a cache hit.
    ///
    /// A failed load is not cached.
    pub fn fetch<F>(&self, key: &str, load: F) -> Result<(T, bool)>
    where
        F: FnOnce() -> Result<T>,
    {
        let Some(entries) = &self.entries else {
            return Ok((load()?, false));
        };

        if let Some(value) = entries.get(key) {
            tracing::debug!(key = %key, "Cache hit.");
            return Ok((value, true));
        }

        let value = load()?;
        entries.insert(key.to_string(), value.clone());
        Ok((value, false))
    }

    pub fn invalidate(&self, key: &str) {
        if let Some(entries) = &self.entries {
            entries.invalidate(key);
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        anyhow::anyhow,
        std::cell::Cell,
    };

    #[test]
    fn test_fetch_is_memoized_within_ttl() -> Result<()> {
        let cache = TtlCache::new(Duration::from_secs(300));
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(vec![1, 2, 3])
        };

        assert_eq!(cache.fetch("locations", load)?, (vec![1, 2, 3], false));
        assert_eq!(cache.fetch("locations", load)?, (vec![1, 2, 3], true));
        assert_eq!(loads.get(), 1);

        // Keys are independent
        assert!(!cache.fetch("other", load)?.1);
        assert_eq!(loads.get(), 2);
        Ok(())
    }

    #[test]
    fn test_invalidate_and_clear() -> Result<()> {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.fetch("a", || Ok(1))?;
        cache.fetch("b", || Ok(2))?;

        cache.invalidate("a");
        assert_eq!(cache.fetch("a", || Ok(10))?, (10, false));
        assert_eq!(cache.fetch("b", || Ok(20))?, (2, true));

        cache.clear();
        assert_eq!(cache.fetch("b", || Ok(20))?, (20, false));
        Ok(())
    }

    #[test]
    fn test_zero_ttl_disables_caching() -> Result<()> {
        let cache = TtlCache::new(Duration::ZERO);
        cache.fetch("a", || Ok(1))?;
        assert_eq!(cache.fetch("a", || Ok(2))?, (2, false));
        cache.clear();
        Ok(())
    }

    #[test]
    fn test_expired_entries_are_reloaded() -> Result<()> {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.fetch("a", || Ok(1))?;
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.fetch("a", || Ok(2))?, (2, false));
        Ok(())
    }

    #[test]
    fn test_failed_load_is_not_cached() -> Result<()> {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(300));
        assert!(cache.fetch("a", || Err(anyhow!("upstream down"))).is_err());
        assert_eq!(cache.fetch("a", || Ok(3))?, (3, false));
        Ok(())
    }
}
