//! TTL-bounded directory listing cache
//!
//! An entry older than the TTL is treated as absent. A miss starts exactly one
//! fetch; callers arriving while it is in flight await the same shared future
//! instead of issuing their own request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::error::DirectoryError;
use super::types::{DirectoryListing, FileEntry, UploadRequest};
use super::DirectoryApi;

type ListingResult = Result<Arc<DirectoryListing>, DirectoryError>;
type PendingListing = Shared<BoxFuture<'static, ListingResult>>;

struct CacheEntry {
    data: Arc<DirectoryListing>,
    fetched_at: Instant,
}

struct InFlight {
    id: u64,
    future: PendingListing,
}

/// Directory cache keyed by folder slug
pub struct DirectoryCache {
    api: Arc<dyn DirectoryApi>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_id: AtomicU64,
}

impl DirectoryCache {
    pub fn new(api: Arc<dyn DirectoryApi>, ttl: Duration) -> Self {
        Self {
            api,
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh(&self, slug: &str) -> Option<Arc<DirectoryListing>> {
        let entries = self.entries.lock();
        entries
            .get(slug)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Listing for `slug`, served from cache while fresh
    pub async fn get_listing(&self, slug: &str) -> ListingResult {
        if let Some(data) = self.fresh(slug) {
            tracing::debug!(slug = %slug, "Directory cache hit");
            return Ok(data);
        }

        let (id, future) = {
            let mut in_flight = self.in_flight.lock();
            // A fetch may have published between the check above and taking
            // this lock; publishing happens under it, so look again
            if let Some(data) = self.fresh(slug) {
                return Ok(data);
            }
            match in_flight.get(slug) {
                Some(pending) => {
                    tracing::debug!(slug = %slug, "Joining in-flight directory fetch");
                    (pending.id, pending.future.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let api = self.api.clone();
                    let owned = slug.to_string();
                    let future = async move { api.get_listing(&owned).await.map(Arc::new) }
                        .boxed()
                        .shared();
                    in_flight.insert(
                        slug.to_string(),
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    tracing::debug!(slug = %slug, "Directory cache miss, fetching");
                    (id, future)
                }
            }
        };

        let result = future.await;

        // Only the fetch still registered may publish; an invalidate in the
        // meantime unregisters it
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(slug).map(|p| p.id) == Some(id) {
            in_flight.remove(slug);
            match &result {
                Ok(data) => {
                    self.entries.lock().insert(
                        slug.to_string(),
                        CacheEntry {
                            data: data.clone(),
                            fetched_at: Instant::now(),
                        },
                    );
                }
                Err(e) => tracing::warn!(slug = %slug, error = %e, "Directory fetch failed"),
            }
        }

        result
    }

    /// Drop the cached listing and any in-flight fetch for `slug`
    pub fn invalidate(&self, slug: &str) {
        self.entries.lock().remove(slug);
        self.in_flight.lock().remove(slug);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
        self.in_flight.lock().clear();
    }

    /// Upload through the collaborator, then invalidate the folder
    pub async fn upload_file(
        &self,
        slug: &str,
        upload: UploadRequest,
    ) -> Result<FileEntry, DirectoryError> {
        let created = self.api.upload_file(slug, upload).await?;
        self.invalidate(slug);
        Ok(created)
    }

    /// Delete through the collaborator, then invalidate the folder it was in
    /// (every folder when unknown)
    pub async fn delete_file(&self, id: &str, slug: Option<&str>) -> Result<(), DirectoryError> {
        self.api.delete_file(id).await?;
        match slug {
            Some(slug) => self.invalidate(slug),
            None => self.invalidate_all(),
        }
        Ok(())
    }
}
