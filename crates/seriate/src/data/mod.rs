//! Immutable value types for batch HTTP requests.
//!
//! These types describe what to fetch ([`Request`]) and what came back
//! ([`Response`]). Both are plain data: construction happens up front and
//! nothing mutates them while a batch is in flight.

pub mod request;
pub mod response;

pub use request::{Body, Method, Request};
pub use response::Response;
