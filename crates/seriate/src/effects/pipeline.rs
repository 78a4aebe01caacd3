//! Concurrency-window scheduler with in-order delivery.
//!
//! Requests become workers in strictly increasing submission-index order,
//! with at most `batch_size` workers active at once. Workers finish in any
//! order; each pushes its outcome into the shared [`OrderedBuffer`] and only
//! then fires its one-shot completion signal. The consumer waits on signals
//! in index order, so when signal `i` fires every smaller index has already
//! been drained and entry `i` is guaranteed to be the buffer minimum.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::core::OrderedBuffer;
use crate::data::{Request, Response};
use crate::effects::cache::CacheGateway;
use crate::effects::fetch::fetch_one;
use crate::effects::http::Transport;
use crate::error::Error;

/// What one worker produced: a response (possibly degraded) or a structural
/// failure of its cache backend.
pub(crate) type Outcome = Result<Response, Error>;

/// A not-yet-started unit of work.
struct Slot {
    index: usize,
    request: Request,
    done: oneshot::Sender<()>,
}

/// State shared between the consumer and all workers.
struct Shared<T> {
    transport: Arc<T>,
    cache: Option<CacheGateway>,
    log_errors: bool,
    buffer: Mutex<OrderedBuffer<Outcome>>,
    active: AtomicUsize,
}

struct Started<T> {
    shared: Arc<Shared<T>>,
    handle: Handle,
}

pub(crate) struct Pipeline<T: Transport> {
    batch_size: usize,
    num_requests: usize,
    cursor: usize,
    slots: VecDeque<Slot>,
    signals: Vec<Option<oneshot::Receiver<()>>>,
    workers: Vec<JoinHandle<()>>,
    started: Option<Started<T>>,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(requests: Vec<Request>, batch_size: usize) -> Self {
        let num_requests = requests.len();
        let mut slots = VecDeque::with_capacity(num_requests);
        let mut signals = Vec::with_capacity(num_requests);
        for (index, request) in requests.into_iter().enumerate() {
            let (done, signal) = oneshot::channel();
            slots.push_back(Slot { index, request, done });
            signals.push(Some(signal));
        }
        Self {
            batch_size,
            num_requests,
            cursor: 0,
            slots,
            signals,
            workers: Vec::with_capacity(num_requests),
            started: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Attach the transport and spawn the first window of workers.
    pub fn start(
        &mut self,
        handle: Handle,
        transport: Arc<T>,
        cache: Option<CacheGateway>,
        log_errors: bool,
    ) {
        self.started = Some(Started {
            shared: Arc::new(Shared {
                transport,
                cache,
                log_errors,
                buffer: Mutex::new(OrderedBuffer::new()),
                active: AtomicUsize::new(0),
            }),
            handle,
        });
        self.refill();
    }

    /// Spawn not-yet-started workers until the window is full.
    ///
    /// Workers decrement the active count as their final action, so the
    /// check here observes removal and count consistently.
    fn refill(&mut self) {
        let Some(started) = &self.started else { return };
        while started.shared.active.load(Ordering::Acquire) < self.batch_size {
            let Some(slot) = self.slots.pop_front() else { break };
            started.shared.active.fetch_add(1, Ordering::AcqRel);
            let worker = run_worker(started.shared.clone(), slot);
            self.workers.push(started.handle.spawn(worker));
        }
    }

    /// Wait for the next in-order outcome.
    ///
    /// The refill on both sides of the signal wait keeps a slot vacated by
    /// an earlier-index completion from sitting idle while we drain the
    /// buffer.
    pub async fn next_ordered(&mut self) -> Option<Outcome> {
        if self.cursor == self.num_requests {
            return None;
        }
        let index = self.cursor;
        self.cursor += 1;

        self.refill();
        let Some(signal) = self.signals[index].take() else {
            return Some(Err(Error::Lost { index }));
        };
        match signal.await {
            Ok(()) => {
                self.refill();
                let popped = self
                    .started
                    .as_ref()
                    .and_then(|started| started.shared.buffer.lock().unwrap().pop());
                self.refill();
                match popped {
                    Some((popped_index, outcome)) => {
                        // The signal protocol makes entry `index` the buffer
                        // minimum here.
                        debug_assert_eq!(popped_index, index);
                        Some(outcome)
                    }
                    None => Some(Err(Error::Lost { index })),
                }
            }
            Err(_) => {
                // The worker was aborted or panicked before pushing; keep
                // the window moving for the remaining indices.
                self.refill();
                Some(Err(Error::Lost { index }))
            }
        }
    }

    /// Abandon queued work and abort running workers.
    ///
    /// Returns the worker handles so the caller can await their terminal
    /// state before closing the transport.
    pub fn cancel(&mut self) -> Vec<JoinHandle<()>> {
        self.slots.clear();
        for worker in &self.workers {
            worker.abort();
        }
        std::mem::take(&mut self.workers)
    }
}

async fn run_worker<T: Transport>(shared: Arc<Shared<T>>, slot: Slot) {
    let Slot { index, request, done } = slot;
    tracing::debug!(index, "worker started");

    let outcome = resolve(&shared, index, &request).await;

    // Push strictly before signaling; in-order delivery depends on it.
    shared.buffer.lock().unwrap().push(index, outcome);
    let _ = done.send(());
    shared.active.fetch_sub(1, Ordering::AcqRel);
    tracing::debug!(index, "worker finished");
}

async fn resolve<T: Transport>(shared: &Shared<T>, index: usize, request: &Request) -> Outcome {
    if let Some(cache) = &shared.cache
        && let Some(hit) = cache.lookup(request).await?
    {
        tracing::debug!(index, "cache hit");
        return Ok(hit);
    }

    let response = fetch_one(shared.transport.as_ref(), request, shared.log_errors).await;

    if let Some(cache) = &shared.cache {
        // A degraded response never reached the server; caching it would pin
        // a transient failure.
        if response.status != 0 {
            cache.store(request, &response).await?;
        }
    }

    Ok(response)
}
