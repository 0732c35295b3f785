//! Tile fetching: the fetcher seam, one-shot completion handles and the
//! stock fetchers.
//!
//! A [`TileFetcher`] receives a [`TileRequest`] together with a
//! [`CompletionHandle`]. Whatever the fetcher does (spawn a download, queue
//! the request for a test, answer from a cache), the handle eventually reports
//! exactly one [`TileCompletion`] back to the layer over a channel. The layer
//! drains that channel from its own thread.

use super::types::{RequestId, SurfaceId, TileCoord, TileKey};
use crate::prelude::Arc;
use crate::{MapError, Result};
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::sync::Mutex;

#[cfg(feature = "tokio-runtime")]
use super::cache::TileCache;
#[cfg(feature = "tokio-runtime")]
use once_cell::sync::Lazy;

/// Shared async HTTP client for tile fetching
#[cfg(feature = "tokio-runtime")]
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("slippymap/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Everything a fetcher needs to retrieve one tile image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub request_id: RequestId,
    pub surface_id: SurfaceId,
    pub key: TileKey,
    pub coord: TileCoord,
    pub url: String,
}

/// Outcome of one fetch, routed back to the issuing layer
#[derive(Debug)]
pub struct TileCompletion {
    pub request_id: RequestId,
    pub surface_id: SurfaceId,
    pub result: Result<Arc<Vec<u8>>>,
}

/// One-shot reply channel for a single [`TileRequest`].
///
/// Consumed by [`CompletionHandle::resolve`]. A handle dropped without being
/// resolved reports a fetch error, so every request settles exactly once.
#[derive(Debug)]
pub struct CompletionHandle {
    request_id: RequestId,
    surface_id: SurfaceId,
    tx: Option<Sender<TileCompletion>>,
}

impl CompletionHandle {
    pub(crate) fn new(request_id: RequestId, surface_id: SurfaceId, tx: Sender<TileCompletion>) -> Self {
        Self {
            request_id,
            surface_id,
            tx: Some(tx),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn resolve(mut self, result: Result<Arc<Vec<u8>>>) {
        self.send(result);
    }

    pub fn succeed(self, data: Arc<Vec<u8>>) {
        self.resolve(Ok(data));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.resolve(Err(MapError::Fetch(message.into())));
    }

    fn send(&mut self, result: Result<Arc<Vec<u8>>>) {
        if let Some(tx) = self.tx.take() {
            let completion = TileCompletion {
                request_id: self.request_id,
                surface_id: self.surface_id,
                result,
            };
            // the layer may already be gone
            if tx.send(completion).is_err() {
                log::trace!("completion for {} had no receiver", self.request_id);
            }
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.send(Err(MapError::Fetch("request dropped before completing".into())));
        }
    }
}

/// Asynchronous source of tile images
pub trait TileFetcher: Send {
    /// Starts retrieving `request`. Must not block; report through `done`.
    fn fetch(&mut self, request: TileRequest, done: CompletionHandle);
}

/// Fetcher that only records requests; the caller settles them explicitly.
///
/// Clones share the queue, so a test can keep one clone while the layer owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct QueuedFetcher {
    queue: Arc<Mutex<VecDeque<(TileRequest, CompletionHandle)>>>,
}

impl QueuedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Snapshot of the queued requests in issue order
    pub fn requests(&self) -> Vec<TileRequest> {
        self.queue
            .lock()
            .map(|queue| queue.iter().map(|(request, _)| request.clone()).collect())
            .unwrap_or_default()
    }

    /// Removes the oldest queued request and its handle
    pub fn take_next(&self) -> Option<(TileRequest, CompletionHandle)> {
        self.queue.lock().ok()?.pop_front()
    }

    /// Removes the queued request for `key`, if any
    pub fn take(&self, key: &TileKey) -> Option<(TileRequest, CompletionHandle)> {
        let mut queue = self.queue.lock().ok()?;
        let index = queue.iter().position(|(request, _)| request.key == *key)?;
        queue.remove(index)
    }

    pub fn resolve_next(&self, data: Arc<Vec<u8>>) -> Option<TileRequest> {
        let (request, done) = self.take_next()?;
        done.succeed(data);
        Some(request)
    }

    pub fn fail_next(&self, message: &str) -> Option<TileRequest> {
        let (request, done) = self.take_next()?;
        done.fail(message);
        Some(request)
    }

    /// Resolves every queued request with the same payload
    pub fn resolve_all(&self, data: Arc<Vec<u8>>) -> usize {
        let mut resolved = 0;
        while self.resolve_next(Arc::clone(&data)).is_some() {
            resolved += 1;
        }
        resolved
    }
}

impl TileFetcher for QueuedFetcher {
    fn fetch(&mut self, request: TileRequest, done: CompletionHandle) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back((request, done));
        }
    }
}

/// Downloads tiles over HTTP on a tokio runtime, with an LRU byte cache in
/// front of the network.
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct HttpTileFetcher {
    runtime: tokio::runtime::Handle,
    cache: TileCache,
}

#[cfg(feature = "tokio-runtime")]
impl HttpTileFetcher {
    /// Binds to the tokio runtime of the calling context
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MapError::Fetch(format!("no tokio runtime: {}", e)))?;
        Ok(Self::with_handle(runtime))
    }

    pub fn with_handle(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            cache: TileCache::default(),
        }
    }

    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    async fn download_tile(url: &str) -> Result<Arc<Vec<u8>>> {
        let response = HTTP_CLIENT.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MapError::Fetch(format!("HTTP {} for {}", response.status(), url)));
        }

        let data = response.bytes().await?.to_vec();
        Ok(Arc::new(data))
    }
}

#[cfg(feature = "tokio-runtime")]
impl TileFetcher for HttpTileFetcher {
    fn fetch(&mut self, request: TileRequest, done: CompletionHandle) {
        if let Some(data) = self.cache.get(&request.url) {
            #[cfg(feature = "debug")]
            log::trace!("cache hit for {}", request.url);
            done.succeed(data);
            return;
        }

        let cache = self.cache.clone();
        self.runtime.spawn(async move {
            #[cfg(feature = "debug")]
            log::debug!("downloading tile {} from {}", request.key, request.url);
            let result = Self::download_tile(&request.url).await;
            match &result {
                Ok(data) => cache.put(request.url.clone(), Arc::clone(data)),
                Err(e) => log::warn!("tile {} failed: {}", request.key, e),
            }
            done.resolve(result);
        });
    }
}
