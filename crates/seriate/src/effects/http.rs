use std::future::Future;

use bytes::Bytes;

use crate::data::Request;

/// What the transport hands back before any text decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for the status code.
    pub reason: String,
    /// True iff the status indicates success (below 400).
    pub ok: bool,
    /// Final URL after any redirects.
    pub url: String,
    /// Encoding label reported by the server, if any.
    pub charset: Option<String>,
    /// Raw body bytes.
    pub body: Bytes,
}

/// Asynchronous HTTP transport abstraction.
///
/// This is the session collaborator of the pipeline: one instance is shared
/// by all concurrently running fetches and closed exactly once when the
/// iterator finishes or is abandoned.
///
/// Implementations handle their own redirect following and connection
/// pooling. [`ReqwestTransport`] is the production implementation;
/// [`MockTransport`](crate::MockTransport) scripts responses for tests.
pub trait Transport: Send + Sync + 'static {
    /// Error type for transport operations.
    type Error: std::error::Error + Send + 'static;

    /// Perform one request and buffer the full response.
    ///
    /// # Errors
    ///
    /// Returns an error for anything that keeps a response from being
    /// produced: DNS failure, refused connection, timeout, protocol error.
    /// The caller converts such errors into degraded responses; they never
    /// travel further.
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, Self::Error>> + Send;

    /// Release the session's resources.
    ///
    /// Called exactly once, after all workers have reached a terminal state.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;
    use crate::data::Body;
    use crate::data::Method;
    use crate::error::Error;

    /// How long `close` waits for the connection pool to settle. reqwest only
    /// requests shutdown; sockets are released in the background.
    const CLOSE_GRACE: Duration = Duration::from_millis(250);

    /// Production HTTP transport backed by reqwest.
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Build a transport with default configuration.
        ///
        /// No connections are opened here; reqwest connects lazily per
        /// request.
        pub fn new() -> Result<Self, Error> {
            reqwest::Client::builder()
                .build()
                .map(|client| Self { client })
                .map_err(|error| Error::Transport(error.to_string()))
        }
    }

    impl From<Method> for reqwest::Method {
        fn from(method: Method) -> Self {
            match method {
                Method::Delete => reqwest::Method::DELETE,
                Method::Get => reqwest::Method::GET,
                Method::Head => reqwest::Method::HEAD,
                Method::Patch => reqwest::Method::PATCH,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
            }
        }
    }

    impl Transport for ReqwestTransport {
        type Error = reqwest::Error;

        async fn send(&self, request: &Request) -> Result<RawResponse, Self::Error> {
            let mut builder = self
                .client
                .request(request.method().into(), request.url());

            if !request.params().is_empty() {
                builder = builder.query(request.params());
            }
            for (name, value) in request.headers() {
                builder = builder.header(name, value);
            }
            builder = match request.payload() {
                Body::Empty => builder,
                Body::Raw(bytes) => builder.body(bytes.clone()),
                Body::Form(fields) => builder.form(fields),
                Body::Json(value) => builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(value.to_string()),
            };
            if let Some(timeout) = request.request_timeout() {
                builder = builder.timeout(timeout);
            }

            let response = builder.send().await?;
            let status = response.status();
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            let url = response.url().to_string();
            let charset = charset_from(response.headers());
            let body = response.bytes().await?;

            Ok(RawResponse {
                status: status.as_u16(),
                reason,
                ok: status.as_u16() < 400,
                url,
                charset,
                body,
            })
        }

        async fn close(&self) {
            tokio::time::sleep(CLOSE_GRACE).await;
        }
    }

    /// Extract the charset parameter from a Content-Type header.
    fn charset_from(headers: &reqwest::header::HeaderMap) -> Option<String> {
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)?
            .to_str()
            .ok()?;
        content_type.split(';').skip(1).find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
