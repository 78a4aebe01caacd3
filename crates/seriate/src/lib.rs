//! Concurrent HTTP batches with responses delivered in submission order.
//!
//! Hand `seriate` an ordered list of requests and a concurrency bound; pull
//! responses back one at a time, in the order the requests were submitted,
//! while up to `batch_size` of them run concurrently behind the scenes. An
//! optional [`Cache`] short-circuits requests whose response is already
//! known.
//!
//! # Example
//!
//! ```no_run
//! let urls = ["https://example.org/a", "https://example.org/b"];
//!
//! for outcome in seriate::get(urls, 2)? {
//!     let response = outcome?;
//!     println!("{} {}", response.status, response.url);
//! }
//! # Ok::<(), seriate::Error>(())
//! ```
//!
//! Per-request failures never abort iteration: they surface as responses
//! with status `0` and `ok == false`. Only structural failures (a broken
//! cache backend, invalid configuration) appear as `Err` items.
//!
//! # Architecture
//!
//! - `data` - immutable request/response types
//! - `core` - pure transformations (decoding, ordering)
//! - `effects` - transport, cache, and the concurrency-window pipeline
//! - [`ResponseIterator`] - the pull bridge from async to sync

mod core;
mod data;
mod effects;
mod error;
mod iter;

pub use data::{Body, Method, Request, Response};
pub use effects::{
    Cache, MemoryCache, MockError, MockReply, MockTransport, RawResponse, SledCache, Transport,
};
pub use error::{CacheError, Error, Result};
pub use iter::{LOG_ERRORS_ENV, ResponseIterator};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

/// Request each of the given requests, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn request(
    requests: Vec<Request>,
    batch_size: usize,
) -> Result<ResponseIterator<ReqwestTransport>> {
    ResponseIterator::new(requests, batch_size)
}

#[cfg(feature = "reqwest")]
fn for_each_url<I>(
    method: Method,
    urls: I,
    batch_size: usize,
) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    request(
        urls.into_iter()
            .map(|url| Request::new(method, url))
            .collect(),
        batch_size,
    )
}

/// Perform a GET request for each URL, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn get<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Get, urls, batch_size)
}

/// Perform a POST request for each URL, at most `batch_size` concurrently.
///
/// Requests needing a body are built with [`Request`] directly and passed
/// to [`request`].
#[cfg(feature = "reqwest")]
pub fn post<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Post, urls, batch_size)
}

/// Perform a PUT request for each URL, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn put<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Put, urls, batch_size)
}

/// Perform a PATCH request for each URL, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn patch<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Patch, urls, batch_size)
}

/// Perform a DELETE request for each URL, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn delete<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Delete, urls, batch_size)
}

/// Perform a HEAD request for each URL, at most `batch_size` concurrently.
#[cfg(feature = "reqwest")]
pub fn head<I>(urls: I, batch_size: usize) -> Result<ResponseIterator<ReqwestTransport>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    for_each_url(Method::Head, urls, batch_size)
}
