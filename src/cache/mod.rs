//! Request-caching policy engine for offline support.
//!
//! This module sits at the network boundary and decides, per request, whether
//! to answer from the network, from a versioned local cache, or with a
//! synthesized failure:
//! - Read requests (`GET`) use cache-on-error: network first, cache the
//!   fresh success, fall back to the cached copy on failure
//! - Mutating requests go to the network only; a transport failure becomes a
//!   fixed `408` plain-text response
//! - Cache generations are named by a version tag; activating one evicts every
//!   other generation

mod layer;
mod storage;
mod traits;

pub use layer::CachePolicy;
pub use storage::{CacheStorage, SqliteCacheStorage};
pub use traits::{CachedResponse, Served};
