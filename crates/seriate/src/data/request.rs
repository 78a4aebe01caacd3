use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Delete,
    Get,
    Head,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Canonical uppercase name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body payload.
///
/// The variants are mutually exclusive; the builder methods on [`Request`]
/// replace the whole body, so the last one called wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Body {
    /// No body is sent.
    #[default]
    Empty,
    /// Raw bytes, sent as-is.
    Raw(Vec<u8>),
    /// URL-encoded form fields (`application/x-www-form-urlencoded`).
    Form(BTreeMap<String, String>),
    /// JSON document (`application/json`).
    Json(serde_json::Value),
}

/// A single HTTP request within a batch.
///
/// Built with consuming setters and immutable once handed to an iterator:
///
/// ```
/// use std::time::Duration;
/// use seriate::{Method, Request};
///
/// let request = Request::new(Method::Get, "https://example.org/search")
///     .param("q", "rust")
///     .header("Accept", "application/json")
///     .timeout(Duration::from_secs(10));
/// assert_eq!(request.url(), "https://example.org/search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    body: Body,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            body: Body::Empty,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Add a single HTTP header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a single query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set a raw byte body, replacing any previous body.
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Raw(bytes.into());
        self
    }

    /// Set a form body, replacing any previous body.
    pub fn form(mut self, fields: impl IntoIterator<Item = (String, String)>) -> Self {
        self.body = Body::Form(fields.into_iter().collect());
        self
    }

    /// Set a JSON body, replacing any previous body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn payload(&self) -> &Body {
        &self.body
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Stable identifier used as the cache key.
    ///
    /// The digest covers method, url, query parameters, and body. Headers and
    /// timeout are deliberately excluded: they shape how a resource is
    /// fetched, not which resource it is. Parameters and form fields are
    /// sorted maps, so insertion order never changes the key, and every
    /// component is length-prefixed so adjacent fields cannot alias.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        feed(&mut hasher, self.method.as_str().as_bytes());
        feed(&mut hasher, self.url.as_bytes());
        for (name, value) in &self.params {
            feed(&mut hasher, name.as_bytes());
            feed(&mut hasher, value.as_bytes());
        }
        match &self.body {
            Body::Empty => feed(&mut hasher, b""),
            Body::Raw(bytes) => {
                feed(&mut hasher, b"raw");
                feed(&mut hasher, bytes);
            }
            Body::Form(fields) => {
                feed(&mut hasher, b"form");
                for (name, value) in fields {
                    feed(&mut hasher, name.as_bytes());
                    feed(&mut hasher, value.as_bytes());
                }
            }
            Body::Json(value) => {
                feed(&mut hasher, b"json");
                feed(&mut hasher, value.to_string().as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn feed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
