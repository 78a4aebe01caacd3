//! Scripted transport for tests.
//!
//! The mock resolves requests by URL against a route table and keeps
//! counters that tests assert on: how many requests were sent, the highest
//! number in flight at once, and how often the session was closed. Cloning
//! shares the same route table and counters, so tests can keep a handle
//! after moving the transport into an iterator.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::data::Request;
use crate::effects::http::{RawResponse, Transport};

/// Error produced by [`MockTransport`] for scripted failures and unrouted
/// URLs.
#[derive(Debug)]
pub struct MockError(String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MockError {}

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: Vec<u8>,
    charset: Option<String>,
    delay: Duration,
    failure: Option<String>,
}

impl MockReply {
    /// A `200 OK` reply with the given text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into().into_bytes(),
            charset: Some("utf-8".into()),
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// A reply that fails the transport call instead of answering.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: Vec::new(),
            charset: None,
            delay: Duration::ZERO,
            failure: Some(message.into()),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn charset(mut self, label: Option<&str>) -> Self {
        self.charset = label.map(str::to_owned);
        self
    }

    /// Delay before the reply is produced; used to force completion orders.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct Inner {
    routes: Mutex<HashMap<String, MockReply>>,
    sends: AtomicUsize,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: Mutex::new(HashMap::new()),
                sends: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Register the reply for a URL, replacing any previous route.
    pub fn route(&self, url: impl Into<String>, reply: MockReply) {
        self.inner.routes.lock().unwrap().insert(url.into(), reply);
    }

    /// Number of requests sent so far.
    pub fn sends(&self) -> usize {
        self.inner.sends.load(Ordering::Acquire)
    }

    /// Highest number of requests that were in flight simultaneously.
    pub fn high_water(&self) -> usize {
        self.inner.high_water.load(Ordering::Acquire)
    }

    /// Number of times the session was closed.
    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::Acquire)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    async fn send(&self, request: &Request) -> Result<RawResponse, Self::Error> {
        let reply = self
            .inner
            .routes
            .lock()
            .unwrap()
            .get(request.url())
            .cloned();

        self.inner.sends.fetch_add(1, Ordering::AcqRel);
        let current = self.inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.high_water.fetch_max(current, Ordering::AcqRel);

        let result = match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                match reply.failure {
                    Some(message) => Err(MockError(message)),
                    None => Ok(RawResponse {
                        status: reply.status,
                        reason: if reply.status < 400 { "OK" } else { "Error" }.to_string(),
                        ok: reply.status < 400,
                        url: request.url().to_string(),
                        charset: reply.charset,
                        body: Bytes::from(reply.body),
                    }),
                }
            }
            None => Err(MockError(format!("no route for {}", request.url()))),
        };

        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        result
    }

    async fn close(&self) {
        self.inner.closes.fetch_add(1, Ordering::AcqRel);
    }
}
