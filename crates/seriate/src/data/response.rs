use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// The outcome of one request in a batch.
///
/// A `Response` is always produced, even when the request never reached the
/// server: transport failures are represented as data (status `0`,
/// `ok == false`, the error message in `reason`) rather than as an error
/// crossing the fetch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// True iff the status code indicates success (below 400).
    pub ok: bool,
    /// HTTP status code; `0` means the request failed locally.
    pub status: u16,
    /// Reason phrase, or the stringified error for a failed fetch.
    pub reason: String,
    /// Final URL after redirects; empty for a failed fetch.
    pub url: String,
    /// Response body decoded to text.
    pub text: String,
}

impl Response {
    /// Build the stand-in response for a fetch that failed locally.
    pub(crate) fn degraded(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: 0,
            reason: reason.into(),
            url: String::new(),
            text: String::new(),
        }
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_response_shape() {
        let response = Response::degraded("connection refused");
        assert_eq!(response.status, 0);
        assert!(!response.ok);
        assert_eq!(response.reason, "connection refused");
        assert!(response.text.is_empty());
        assert!(response.url.is_empty());
    }

    #[test]
    fn json_parses_body() {
        let response = Response {
            ok: true,
            status: 200,
            reason: "OK".into(),
            url: "https://example.org".into(),
            text: r#"{"answer": 42}"#.into(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["answer"], 42);
    }

    #[test]
    fn json_rejects_non_json_body() {
        let response = Response {
            ok: true,
            status: 200,
            reason: "OK".into(),
            url: "https://example.org".into(),
            text: "<html></html>".into(),
        };
        assert!(response.json::<serde_json::Value>().is_err());
    }
}
