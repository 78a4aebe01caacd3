//! Cache interaction: hits skip the network, results are stored, backend
//! failures surface as structural errors.

use std::sync::{Arc, Mutex};

use seriate::{
    Cache, CacheError, Error, MemoryCache, MockReply, MockTransport, Request, Response,
    ResponseIterator, SledCache,
};

/// Memory cache that can be shared across iterators from a test.
#[derive(Clone, Default)]
struct SharedCache {
    inner: Arc<Mutex<MemoryCache>>,
}

impl Cache for SharedCache {
    fn has(&self, request: &Request) -> Result<bool, CacheError> {
        self.inner.lock().unwrap().has(request)
    }

    fn get(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        self.inner.lock().unwrap().get(request)
    }

    fn set(&mut self, request: &Request, response: &Response) -> Result<(), CacheError> {
        self.inner.lock().unwrap().set(request, response)
    }
}

/// Cache whose backend is broken.
struct FailingCache;

impl Cache for FailingCache {
    fn has(&self, _request: &Request) -> Result<bool, CacheError> {
        Err(CacheError::new("backend unavailable"))
    }

    fn get(&self, _request: &Request) -> Result<Option<Response>, CacheError> {
        Err(CacheError::new("backend unavailable"))
    }

    fn set(&mut self, _request: &Request, _response: &Response) -> Result<(), CacheError> {
        Err(CacheError::new("backend unavailable"))
    }
}

fn routed_transport(urls: &[String]) -> MockTransport {
    let transport = MockTransport::new();
    for (i, url) in urls.iter().enumerate() {
        transport.route(url, MockReply::text(format!("body {i}")));
    }
    transport
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://example.org/{i}")).collect()
}

#[test]
fn cache_hit_skips_the_fetch_and_returns_the_cached_value() {
    let urls = urls(3);
    let transport = routed_transport(&urls);

    let cached = Response {
        ok: true,
        status: 200,
        reason: "OK".into(),
        url: urls[1].clone(),
        text: "from the cache".into(),
    };
    let mut cache = MemoryCache::new();
    cache.set(&Request::get(&urls[1]), &cached).unwrap();

    let iterator = ResponseIterator::with_transport(
        urls.iter().map(Request::get).collect(),
        3,
        transport.clone(),
    )
    .unwrap()
    .with_cache(cache);

    let responses: Vec<Response> = iterator.map(|outcome| outcome.unwrap()).collect();

    assert_eq!(responses[0].text, "body 0");
    assert_eq!(responses[1], cached);
    assert_eq!(responses[2].text, "body 2");
    // Only the two misses hit the network.
    assert_eq!(transport.sends(), 2);
}

#[test]
fn cache_hit_between_failures_keeps_every_index_in_place() {
    let urls = urls(5);
    let transport = routed_transport(&urls);
    transport.route(&urls[1], MockReply::failure("connection reset"));
    transport.route(&urls[3], MockReply::failure("timed out"));

    let cached = Response {
        ok: true,
        status: 200,
        reason: "OK".into(),
        url: urls[2].clone(),
        text: "from the cache".into(),
    };
    let mut cache = MemoryCache::new();
    cache.set(&Request::get(&urls[2]), &cached).unwrap();

    let iterator = ResponseIterator::with_transport(
        urls.iter().map(Request::get).collect(),
        2,
        transport.clone(),
    )
    .unwrap()
    .with_cache(cache);

    let responses: Vec<Response> = iterator.map(|outcome| outcome.unwrap()).collect();

    assert_eq!(responses[0].text, "body 0");
    assert_eq!(responses[1].reason, "connection reset");
    assert_eq!(responses[1].status, 0);
    assert_eq!(responses[2], cached);
    assert_eq!(responses[3].reason, "timed out");
    assert_eq!(responses[4].text, "body 4");
    // The hit at index 2 never touched the network.
    assert_eq!(transport.sends(), 4);
}

#[test]
fn fetched_responses_are_stored_for_the_next_batch() {
    let urls = urls(2);
    let cache = SharedCache::default();

    let transport = routed_transport(&urls);
    let first = ResponseIterator::with_transport(
        urls.iter().map(Request::get).collect(),
        2,
        transport.clone(),
    )
    .unwrap()
    .with_cache(cache.clone());
    assert_eq!(first.count(), 2);
    assert_eq!(transport.sends(), 2);

    let second = ResponseIterator::with_transport(
        urls.iter().map(Request::get).collect(),
        2,
        transport.clone(),
    )
    .unwrap()
    .with_cache(cache);
    let bodies: Vec<String> = second.map(|outcome| outcome.unwrap().text).collect();

    assert_eq!(bodies, vec!["body 0", "body 1"]);
    // Everything came from the cache the second time.
    assert_eq!(transport.sends(), 2);
}

#[test]
fn degraded_responses_are_not_cached() {
    let url = "https://example.org/flaky".to_string();
    let cache = SharedCache::default();

    let transport = MockTransport::new();
    transport.route(&url, MockReply::failure("timed out"));
    let first =
        ResponseIterator::with_transport(vec![Request::get(&url)], 1, transport.clone())
            .unwrap()
            .with_cache(cache.clone());
    let response = first.map(|outcome| outcome.unwrap()).next().unwrap();
    assert_eq!(response.status, 0);

    // The endpoint recovers; the failure must not have been pinned.
    transport.route(&url, MockReply::text("recovered"));
    let second =
        ResponseIterator::with_transport(vec![Request::get(&url)], 1, transport.clone())
            .unwrap()
            .with_cache(cache);
    let response = second.map(|outcome| outcome.unwrap()).next().unwrap();

    assert_eq!(response.text, "recovered");
    assert_eq!(transport.sends(), 2);
}

#[test]
fn cache_backend_failure_is_a_structural_error() {
    let urls = urls(2);
    let transport = routed_transport(&urls);

    let iterator = ResponseIterator::with_transport(
        urls.iter().map(Request::get).collect(),
        2,
        transport,
    )
    .unwrap()
    .with_cache(FailingCache);

    let outcomes: Vec<_> = iterator.collect();
    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes {
        assert!(matches!(outcome, Err(Error::Cache(_))));
    }
}

#[test]
fn sled_cache_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");
    let url = "https://example.org/persistent".to_string();

    {
        let transport = MockTransport::new();
        transport.route(&url, MockReply::text("stored"));
        let iterator =
            ResponseIterator::with_transport(vec![Request::get(&url)], 1, transport)
                .unwrap()
                .with_cache(SledCache::open(&path).unwrap());
        assert_eq!(iterator.count(), 1);
    }

    let transport = MockTransport::new();
    // No route: a network call would fail, so a hit is the only way to
    // produce a healthy response.
    let iterator = ResponseIterator::with_transport(vec![Request::get(&url)], 1, transport)
        .unwrap()
        .with_cache(SledCache::open(&path).unwrap());
    let response = iterator.map(|outcome| outcome.unwrap()).next().unwrap();

    assert_eq!(response.text, "stored");
}
