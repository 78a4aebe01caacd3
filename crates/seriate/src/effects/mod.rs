//! I/O operations and effectful computations.
//!
//! Everything that touches the network, the cache backend, or the task
//! scheduler lives here, behind trait seams so tests can swap the transport
//! for a scripted mock.

pub(crate) mod cache;
pub(crate) mod fetch;
pub(crate) mod http;
pub(crate) mod mock;
pub(crate) mod pipeline;

pub use cache::{Cache, MemoryCache, SledCache};
pub use http::{RawResponse, Transport};
pub use mock::{MockError, MockReply, MockTransport};

#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
