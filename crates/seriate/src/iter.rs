//! The public pull interface.
//!
//! [`ResponseIterator`] owns a current-thread tokio runtime and drives the
//! async pipeline forward exactly far enough to produce the next in-order
//! response per [`Iterator::next`] call. The caller's thread blocks for that
//! duration; no extra OS thread is used.

use std::fmt;
use std::sync::Arc;

use crate::data::{Request, Response};
use crate::effects::cache::{Cache, CacheGateway};
use crate::effects::http::Transport;
use crate::effects::pipeline::Pipeline;
use crate::error::{Error, Result};

#[cfg(feature = "reqwest")]
use crate::effects::http::ReqwestTransport;

/// Name of the environment variable that turns on error logging for failed
/// fetches. Read once at construction; any value other than empty or `"0"`
/// enables it.
pub const LOG_ERRORS_ENV: &str = "SERIATE_LOG_ERRORS";

enum TransportState<T> {
    /// Session creation deferred until the first pull.
    Unopened(Box<dyn FnOnce() -> Result<T> + Send>),
    Open(Arc<T>),
    Closed,
}

/// Iterator over responses for a batch of requests.
///
/// Responses come back in submission order regardless of completion order,
/// with at most `batch_size` requests in flight at once. Every per-request
/// failure is an `Ok` item carrying a degraded [`Response`]; `Err` items are
/// reserved for structural failures (cache backend, lost worker).
///
/// Construction starts no network activity. The first call to `next` opens
/// the transport session and spawns the first window of requests; the final
/// call (or dropping the iterator early) tears the session down, aborting
/// and joining outstanding workers first.
///
/// Drive and drop this iterator from a blocking thread; it owns its own
/// runtime and must not be used inside another tokio runtime.
pub struct ResponseIterator<T: Transport> {
    runtime: tokio::runtime::Runtime,
    pipeline: Pipeline<T>,
    transport: TransportState<T>,
    cache: Option<Box<dyn Cache>>,
    log_errors: bool,
    num_requests: usize,
    pending: usize,
}

#[cfg(feature = "reqwest")]
impl ResponseIterator<ReqwestTransport> {
    /// Iterate over `requests` with at most `batch_size` in flight at once,
    /// using the default reqwest transport.
    pub fn new(requests: Vec<Request>, batch_size: usize) -> Result<Self> {
        Self::build(
            requests,
            batch_size,
            TransportState::Unopened(Box::new(ReqwestTransport::new)),
        )
    }
}

impl<T: Transport> ResponseIterator<T> {
    /// Like [`ResponseIterator::new`] but with a caller-supplied transport.
    pub fn with_transport(requests: Vec<Request>, batch_size: usize, transport: T) -> Result<Self> {
        Self::build(requests, batch_size, TransportState::Open(Arc::new(transport)))
    }

    fn build(
        requests: Vec<Request>,
        batch_size: usize,
        transport: TransportState<T>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let num_requests = requests.len();
        Ok(Self {
            runtime,
            pipeline: Pipeline::new(requests, batch_size),
            transport,
            cache: None,
            log_errors: log_errors_enabled(),
            num_requests,
            pending: num_requests,
        })
    }

    /// Attach a cache; requests with a stored response skip the network.
    pub fn with_cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Number of responses not yet yielded.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Total number of requests in the batch.
    pub fn num_requests(&self) -> usize {
        self.num_requests
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.pipeline.is_started() {
            return Ok(());
        }
        let transport = match std::mem::replace(&mut self.transport, TransportState::Closed) {
            TransportState::Unopened(open) => {
                let transport = Arc::new(open()?);
                self.transport = TransportState::Open(transport.clone());
                transport
            }
            TransportState::Open(transport) => {
                self.transport = TransportState::Open(transport.clone());
                transport
            }
            // Unreachable while pending > 0, but harmless to report.
            TransportState::Closed => return Err(Error::Transport("session closed".into())),
        };
        let cache = self.cache.take().map(CacheGateway::new);
        self.pipeline
            .start(self.runtime.handle().clone(), transport, cache, self.log_errors);
        Ok(())
    }

    /// Abort outstanding workers, wait for them to reach a terminal state,
    /// then close the transport. Idempotent.
    fn teardown(&mut self) {
        let workers = self.pipeline.cancel();
        let transport = std::mem::replace(&mut self.transport, TransportState::Closed);
        self.runtime.block_on(async move {
            for worker in workers {
                let _ = worker.await;
            }
            if let TransportState::Open(transport) = transport {
                transport.close().await;
            }
        });
    }
}

impl<T: Transport> Iterator for ResponseIterator<T> {
    type Item = std::result::Result<Response, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending == 0 {
            return None;
        }
        if let Err(error) = self.ensure_started() {
            self.pending = 0;
            return Some(Err(error));
        }

        let runtime = &self.runtime;
        let pipeline = &mut self.pipeline;
        let outcome = runtime.block_on(pipeline.next_ordered())?;

        self.pending -= 1;
        if self.pending == 0 {
            self.teardown();
        }
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending, Some(self.pending))
    }
}

impl<T: Transport> ExactSizeIterator for ResponseIterator<T> {}

impl<T: Transport> Drop for ResponseIterator<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: Transport> fmt::Display for ResponseIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseIterator: {}/{} pending", self.pending, self.num_requests)
    }
}

impl<T: Transport> fmt::Debug for ResponseIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseIterator")
            .field("pending", &self.pending)
            .field("num_requests", &self.num_requests)
            .finish_non_exhaustive()
    }
}

fn log_errors_enabled() -> bool {
    std::env::var(LOG_ERRORS_ENV).is_ok_and(|value| !value.is_empty() && value != "0")
}
