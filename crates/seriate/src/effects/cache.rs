//! Response caching.
//!
//! A cache lets a batch skip requests whose response is already known. The
//! backends here are deliberately not thread-safe; [`CacheGateway`]
//! serializes every call behind one lock for the lifetime of an iterator,
//! and the lock is never held across a network call.

use std::collections::HashMap;
use std::path::Path;

use tokio::sync::Mutex;

use crate::data::{Request, Response};
use crate::error::CacheError;

/// Storage backend for request/response pairs.
///
/// Keyed by [`Request::id`]. Implementations are called from at most one
/// caller at a time and need no internal locking.
pub trait Cache: Send {
    /// Whether a response for this request is stored.
    fn has(&self, request: &Request) -> Result<bool, CacheError>;

    /// The stored response for this request, if any.
    fn get(&self, request: &Request) -> Result<Option<Response>, CacheError>;

    /// Store the response for this request, replacing any previous entry.
    fn set(&mut self, request: &Request, response: &Response) -> Result<(), CacheError>;
}

/// Simple in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Response>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn has(&self, request: &Request) -> Result<bool, CacheError> {
        Ok(self.entries.contains_key(&request.id()))
    }

    fn get(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        Ok(self.entries.get(&request.id()).cloned())
    }

    fn set(&mut self, request: &Request, response: &Response) -> Result<(), CacheError> {
        self.entries.insert(request.id(), response.clone());
        Ok(())
    }
}

/// Disk-backed cache on top of sled, with JSON-encoded values.
pub struct SledCache {
    db: sled::Db,
}

impl SledCache {
    /// Open (or create) the cache at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Ok(Self { db: sled::open(path)? })
    }
}

impl Cache for SledCache {
    fn has(&self, request: &Request) -> Result<bool, CacheError> {
        Ok(self.db.contains_key(request.id())?)
    }

    fn get(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        match self.db.get(request.id())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, request: &Request, response: &Response) -> Result<(), CacheError> {
        self.db.insert(request.id(), serde_json::to_vec(response)?)?;
        Ok(())
    }
}

/// Access-serialized wrapper shared by all workers of one iterator.
pub(crate) struct CacheGateway {
    inner: Mutex<Box<dyn Cache>>,
}

impl CacheGateway {
    pub fn new(cache: Box<dyn Cache>) -> Self {
        Self { inner: Mutex::new(cache) }
    }

    /// Combined has/get under a single lock acquisition.
    pub async fn lookup(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let guard = self.inner.lock().await;
        if guard.has(request)? {
            guard.get(request)
        } else {
            Ok(None)
        }
    }

    pub async fn store(&self, request: &Request, response: &Response) -> Result<(), CacheError> {
        self.inner.lock().await.set(request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Request, Response) {
        let request = Request::get("https://example.org/cached");
        let response = Response {
            ok: true,
            status: 200,
            reason: "OK".into(),
            url: "https://example.org/cached".into(),
            text: "cached body".into(),
        };
        (request, response)
    }

    #[test]
    fn memory_cache_round_trip() {
        let mut cache = MemoryCache::new();
        let (request, response) = sample();

        assert!(!cache.has(&request).unwrap());
        assert_eq!(cache.get(&request).unwrap(), None);

        cache.set(&request, &response).unwrap();

        assert!(cache.has(&request).unwrap());
        assert_eq!(cache.get(&request).unwrap(), Some(response));
    }

    #[test]
    fn memory_cache_misses_on_different_request() {
        let mut cache = MemoryCache::new();
        let (request, response) = sample();
        cache.set(&request, &response).unwrap();

        let other = Request::get("https://example.org/other");
        assert!(!cache.has(&other).unwrap());
    }

    #[test]
    fn sled_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SledCache::open(dir.path().join("cache")).unwrap();
        let (request, response) = sample();

        assert!(!cache.has(&request).unwrap());
        cache.set(&request, &response).unwrap();

        assert!(cache.has(&request).unwrap());
        assert_eq!(cache.get(&request).unwrap(), Some(response));
    }

    #[tokio::test]
    async fn gateway_lookup_and_store() {
        let gateway = CacheGateway::new(Box::new(MemoryCache::new()));
        let (request, response) = sample();

        assert_eq!(gateway.lookup(&request).await.unwrap(), None);
        gateway.store(&request, &response).await.unwrap();
        assert_eq!(gateway.lookup(&request).await.unwrap(), Some(response));
    }
}
