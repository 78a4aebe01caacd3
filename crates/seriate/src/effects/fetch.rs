use crate::core::decode_body;
use crate::data::{Request, Response};
use crate::effects::http::Transport;

/// Perform one network call and normalize any outcome into a [`Response`].
///
/// This function never errors: a transport failure (timeout, refused
/// connection, protocol error) becomes a degraded response with status `0`
/// and the stringified error as the reason. When `log_errors` is set the
/// failure is logged first; logging never changes the outcome.
pub(crate) async fn fetch_one<T: Transport>(
    transport: &T,
    request: &Request,
    log_errors: bool,
) -> Response {
    match transport.send(request).await {
        Ok(raw) => Response {
            ok: raw.ok,
            status: raw.status,
            reason: raw.reason,
            url: raw.url,
            text: decode_body(&raw.body, raw.charset.as_deref()),
        },
        Err(error) => {
            if log_errors {
                tracing::error!(url = request.url(), error = %error, "request failed");
            }
            Response::degraded(error.to_string())
        }
    }
}
