//! Cache policy that sits between the todo client and the network fetcher.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::storage::CacheStorage;
use super::traits::{
  Served, NETWORK_ERROR_BODY, NETWORK_ERROR_STATUS, NOT_CACHED_BODY, NOT_CACHED_STATUS,
};
use crate::http::{Fetch, Request, Response};

/// Request-interception layer with a versioned cache.
///
/// Wraps a network [`Fetch`] and is itself a `Fetch`, so callers route every
/// request through it without knowing about caching. Requests are classified
/// by method only, never by URL.
pub struct CachePolicy<S: CacheStorage, F: Fetch> {
  storage: Arc<S>,
  network: F,
  /// Active cache generation
  version: String,
}

impl<S: CacheStorage, F: Fetch> CachePolicy<S, F> {
  pub fn new(storage: S, network: F, version: impl Into<String>) -> Self {
    Self {
      storage: Arc::new(storage),
      network,
      version: version.into(),
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// Pre-populate the active generation with a static manifest.
  ///
  /// Every URL must come back with a success status; otherwise nothing is
  /// stored and the first failure is reported.
  pub async fn install(&self, urls: &[String]) -> Result<usize> {
    let responses =
      futures::future::join_all(urls.iter().map(|url| self.network.fetch(Request::get(url)))).await;

    let mut entries = Vec::with_capacity(urls.len());
    for (url, result) in urls.iter().zip(responses) {
      let request = Request::get(url);
      match result {
        Ok(response) if response.ok() => entries.push((request.cache_key(), response)),
        Ok(response) => {
          return Err(eyre!(
            "Failed to install {}: status {}",
            url,
            response.status
          ))
        }
        Err(e) => return Err(eyre!("Failed to install {}: {}", url, e)),
      }
    }

    self.storage.put_all(&self.version, &entries)?;
    info!(
      generation = %self.version,
      entries = entries.len(),
      "installed static manifest"
    );
    Ok(entries.len())
  }

  /// Make the current generation the only one: register it and evict the rest.
  ///
  /// Returns the names of the evicted generations.
  pub fn activate(&self) -> Result<Vec<String>> {
    self.storage.register_generation(&self.version)?;

    let mut evicted = Vec::new();
    for generation in self.storage.generations()? {
      if generation == self.version {
        continue;
      }
      let removed = self.storage.delete_generation(&generation)?;
      info!(generation = %generation, removed, "evicted cache generation");
      evicted.push(generation);
    }

    Ok(evicted)
  }

  /// Install on first use, then activate.
  ///
  /// A failed install leaves the generation unregistered so the next start
  /// tries again.
  pub async fn prepare(&self, urls: &[String]) -> Result<()> {
    if !self.storage.has_generation(&self.version)? {
      self.install(urls).await?;
    }
    self.activate()?;
    Ok(())
  }

  /// Cache-on-error strategy for read requests.
  pub async fn cache_on_error(&self, request: Request) -> (Response, Served) {
    let key = request.cache_key();

    match self.network.fetch(request).await {
      Ok(response) if response.ok() => {
        if let Err(e) = self.storage.put(&self.version, &key, &response) {
          warn!(key = %key, "failed to cache response: {}", e);
        }
        (response, Served::Network)
      }
      Ok(response) => {
        debug!(key = %key, status = response.status, "read rejected, falling back to cache");
        self.cached(&key)
      }
      Err(e) => {
        debug!(key = %key, "read failed, falling back to cache: {}", e);
        self.cached(&key)
      }
    }
  }

  /// Network-only strategy for mutating requests.
  pub async fn network_only(&self, request: Request) -> (Response, Served) {
    let key = request.cache_key();

    match self.network.fetch(request).await {
      Ok(response) => (response, Served::Network),
      Err(e) => {
        warn!(key = %key, "mutating request failed: {}", e);
        (
          Response::plain_text(NETWORK_ERROR_STATUS, NETWORK_ERROR_BODY),
          Served::Synthesized,
        )
      }
    }
  }

  fn cached(&self, key: &str) -> (Response, Served) {
    match self.storage.match_request(&self.version, key) {
      Ok(Some(cached)) => {
        debug!(key = %key, cached_at = %cached.cached_at, "serving cached response");
        (cached.response, Served::Cache)
      }
      Ok(None) => (
        Response::plain_text(NOT_CACHED_STATUS, NOT_CACHED_BODY),
        Served::CacheMiss,
      ),
      Err(e) => {
        warn!(key = %key, "cache lookup failed: {}", e);
        (
          Response::plain_text(NOT_CACHED_STATUS, NOT_CACHED_BODY),
          Served::CacheMiss,
        )
      }
    }
  }
}

#[async_trait]
impl<S: CacheStorage, F: Fetch> Fetch for CachePolicy<S, F> {
  async fn fetch(&self, request: Request) -> Result<Response> {
    let method = request.method.clone();
    let url = request.url.clone();

    let (response, served) = if method.is_read() {
      self.cache_on_error(request).await
    } else {
      self.network_only(request).await
    };

    debug!(
      method = %method,
      url = %url,
      status = response.status,
      served = served.as_str(),
      "request handled"
    );
    Ok(response)
  }
}
