//! Region bootstrap.
//!
//! Reads a cached region from local storage, falling back to the first
//! region the backend lists. A fetch failure leaves the region unset;
//! operations that need one get a `Precondition` error until it resolves.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::error::{Result, StoreError};
use crate::http::ApiClient;
use crate::services::regions;
use crate::storage::{KeyValueStore, REGION_KEY};
use crate::types::Region;

/// Selected-region state container.
///
/// Cheaply cloneable; clones share the same region state.
#[derive(Clone)]
pub struct RegionState {
    inner: Arc<RegionStateInner>,
}

struct RegionStateInner {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    region: Mutex<Option<Region>>,
}

impl RegionState {
    /// Create a region container over the shared API client and the
    /// general on-device store.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(RegionStateInner {
                api,
                store,
                region: Mutex::new(None),
            }),
        }
    }

    /// The selected region, if resolved.
    #[must_use]
    pub fn region(&self) -> Option<Region> {
        self.lock_region().clone()
    }

    /// The selected region, or a `Precondition` error for callers that
    /// cannot proceed without one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Precondition`] if no region is resolved yet.
    pub fn require(&self) -> Result<Region> {
        self.region()
            .ok_or_else(|| StoreError::precondition("region not resolved"))
    }

    /// Startup bootstrap: use the cached region if one is stored, otherwise
    /// list regions and pick the first as default, caching it.
    ///
    /// Failure is logged, not surfaced - the region stays unset and
    /// downstream callers see `Precondition` errors.
    pub async fn initialize(&self) {
        if let Some(region) = self.load_cached() {
            *self.lock_region() = Some(region);
            return;
        }

        match regions::list_regions(&self.inner.api).await {
            Ok(regions) => match regions.into_iter().next() {
                Some(region) => {
                    if let Err(err) = self.persist(&region) {
                        warn!(error = %err, "failed to cache region");
                    }
                    *self.lock_region() = Some(region);
                }
                None => warn!("backend returned no regions"),
            },
            Err(err) => {
                warn!(error = %err, "failed to load regions, region stays unset");
            }
        }
    }

    /// Replace the selected region and re-cache it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the region cannot be cached; the
    /// in-memory selection is updated regardless.
    pub fn select(&self, region: Region) -> Result<()> {
        let persisted = self.persist(&region);
        *self.lock_region() = Some(region);
        persisted
    }

    fn load_cached(&self) -> Option<Region> {
        let raw = match self.inner.store.get(REGION_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "failed to read cached region");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(region) => Some(region),
            Err(err) => {
                // A corrupt cache entry is dropped and refetched.
                warn!(error = %err, "cached region is corrupt, discarding");
                if let Err(err) = self.inner.store.remove(REGION_KEY) {
                    warn!(error = %err, "failed to discard corrupt region cache");
                }
                None
            }
        }
    }

    fn persist(&self, region: &Region) -> Result<()> {
        let raw = serde_json::to_string(region)?;
        self.inner.store.set(REGION_KEY, &raw)?;
        Ok(())
    }

    fn lock_region(&self) -> std::sync::MutexGuard<'_, Option<Region>> {
        self.inner
            .region
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
