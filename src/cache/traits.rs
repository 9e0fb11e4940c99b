//! Core types for the caching system.

use chrono::{DateTime, Utc};

use crate::http::Response;

/// Status of the response synthesized when a mutating request cannot reach the network.
pub const NETWORK_ERROR_STATUS: u16 = 408;
pub const NETWORK_ERROR_BODY: &str = "Network error happened";

/// Status of the response synthesized when a read fails and nothing is cached.
pub const NOT_CACHED_STATUS: u16 = 404;
pub const NOT_CACHED_BODY: &str = "Not found in cache";

/// A response stored in a cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub response: Response,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
  /// Completed network response, returned verbatim
  Network,
  /// Network failed or was rejected, previously cached copy returned
  Cache,
  /// Network failed or was rejected and nothing was cached
  CacheMiss,
  /// Mutating request could not reach the network
  Synthesized,
}

impl Served {
  pub fn as_str(&self) -> &'static str {
    match self {
      Served::Network => "network",
      Served::Cache => "cache",
      Served::CacheMiss => "cache_miss",
      Served::Synthesized => "synthesized",
    }
  }
}
