//! Time-bounded cache for device listings.
//!
//! Each credential gets its own slot, valid for [`DEVICE_CACHE_TTL`] after the
//! fetch that filled it. Failed fetches are never cached. Two concurrent misses
//! for the same credential may both hit the network; the later write wins.
//! Expired slots are pruned whenever a fresh listing is stored.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::model::DeviceGroup;

/// How long a fetched device list is served from cache.
pub const DEVICE_CACHE_TTL: Duration = Duration::from_millis(30_000);

/// Anything that can fetch a device listing for a credential.
pub trait DeviceSource: Send + Sync {
    fn fetch_devices(
        &self,
        api_hash: &str,
    ) -> impl Future<Output = Result<Vec<DeviceGroup>>> + Send;
}

struct CacheEntry {
    devices: Arc<Vec<DeviceGroup>>,
    fetched_at: Instant,
}

/// A device listing plus where it came from.
#[derive(Debug, Clone)]
pub struct CachedDevices {
    pub devices: Arc<Vec<DeviceGroup>>,
    pub from_cache: bool,
}

/// Per-credential device cache in front of a [`DeviceSource`].
pub struct DeviceCache<S> {
    source: Arc<S>,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl<S> Clone for DeviceCache<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<S: DeviceSource> DeviceCache<S> {
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEVICE_CACHE_TTL)
    }

    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source: Arc::new(source),
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the device list for `api_hash`, from cache when still fresh.
    pub async fn get_devices(&self, api_hash: &str) -> Result<CachedDevices> {
        let now = Instant::now();

        if let Some(entry) = self.entries.read().await.get(api_hash) {
            if now.duration_since(entry.fetched_at) < self.ttl {
                debug!("Device list served from cache");
                return Ok(CachedDevices {
                    devices: Arc::clone(&entry.devices),
                    from_cache: true,
                });
            }
        }

        let devices = Arc::new(self.source.fetch_devices(api_hash).await?);

        let mut entries = self.entries.write().await;
        entries.retain(|_, e| now.duration_since(e.fetched_at) < self.ttl);
        entries.insert(
            api_hash.to_string(),
            CacheEntry {
                devices: Arc::clone(&devices),
                fetched_at: now,
            },
        );
        drop(entries);
        debug!(groups = devices.len(), "Device list fetched");

        Ok(CachedDevices {
            devices,
            from_cache: false,
        })
    }

    /// Drop every cached listing.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::FleetError;
    use crate::model::Device;

    /// Source that counts calls and names its single device after the hash.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl DeviceSource for CountingSource {
        async fn fetch_devices(&self, api_hash: &str) -> Result<Vec<DeviceGroup>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FleetError::upstream(500, Some("boom".to_string())));
            }
            Ok(vec![DeviceGroup {
                items: vec![Device {
                    name: api_hash.to_string(),
                    ..Default::default()
                }],
            }])
        }
    }

    fn calls(cache: &DeviceCache<CountingSource>) -> usize {
        cache.source().calls.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_is_cached() {
        let cache = DeviceCache::new(CountingSource::default());

        let first = cache.get_devices("hash-a").await.unwrap();
        tokio::time::advance(Duration::from_millis(29_999)).await;
        let second = cache.get_devices("hash-a").await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert!(Arc::ptr_eq(&first.devices, &second.devices));
        assert_eq!(calls(&cache), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let cache = DeviceCache::new(CountingSource::default());

        cache.get_devices("hash-a").await.unwrap();
        tokio::time::advance(Duration::from_millis(30_001)).await;
        let again = cache.get_devices("hash-a").await.unwrap();

        assert!(!again.from_cache);
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_do_not_share_entries() {
        let cache = DeviceCache::new(CountingSource::default());

        let a = cache.get_devices("hash-a").await.unwrap();
        let b = cache.get_devices("hash-b").await.unwrap();

        assert_eq!(a.devices[0].items[0].name, "hash-a");
        assert_eq!(b.devices[0].items[0].name, "hash-b");
        assert!(!b.from_cache);
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let cache = DeviceCache::new(CountingSource {
            fail: true,
            ..Default::default()
        });

        let err = cache.get_devices("hash-a").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(cache.get_devices("hash-a").await.is_err());
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_credentials_are_pruned() {
        let cache = DeviceCache::new(CountingSource::default());

        cache.get_devices("hash-a").await.unwrap();
        cache.get_devices("hash-b").await.unwrap();
        tokio::time::advance(Duration::from_millis(30_001)).await;
        cache.get_devices("hash-c").await.unwrap();

        let entries = cache.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("hash-c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_forces_refetch() {
        let cache = DeviceCache::new(CountingSource::default());

        cache.get_devices("hash-a").await.unwrap();
        cache.clear().await;
        let again = cache.get_devices("hash-a").await.unwrap();

        assert!(!again.from_cache);
    }
}
