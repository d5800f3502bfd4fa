//! Per-request context.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Uri};

use crate::config::Config;
use crate::method::Method;

/// Everything known about the request being handled.
///
/// The body is fully buffered before any handler runs. Cloning is cheap (one
/// reference count), so a handler takes it by value like any other
/// parameter:
///
/// ```rust
/// use easyroute::{Context, Reply};
///
/// async fn whoami(ctx: Context) -> Reply {
///     Reply::ok_data(ctx.header("user-agent").unwrap_or("unknown"))
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    parts: Parts,
    params: HashMap<String, String>,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    config: Arc<Config>,
}

impl Context {
    pub(crate) fn new(
        method: Method,
        parts: Parts,
        params: HashMap<String, String>,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
        config: Arc<Config>,
    ) -> Self {
        Self { inner: Arc::new(Inner { method, parts, params, body, remote_addr, config }) }
    }

    pub fn method(&self) -> Method { self.inner.method }
    pub fn uri(&self) -> &Uri { &self.inner.parts.uri }
    pub fn path(&self) -> &str { self.inner.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.inner.parts.headers }
    pub fn body(&self) -> &Bytes { &self.inner.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.inner.remote_addr }

    /// The raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.inner.parts.uri.query()
    }

    /// Header lookup. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.parts.headers.get(name)?.to_str().ok()
    }

    /// Parsed `content-type` header. Compare with `essence_str()` to ignore
    /// parameters such as `charset`.
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.header(http::header::CONTENT_TYPE.as_str())?.parse().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get(key).map(String::as_str)
    }

    pub(crate) fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.parts.uri)
            .field("params", &self.inner.params)
            .field("body_len", &self.inner.body.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_context(method: Method, uri: &str, content_type: Option<&str>, body: &'static [u8]) -> Context {
    let mut builder = http::Request::builder().method(method.as_str()).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    Context::new(method, parts, HashMap::new(), Bytes::from_static(body), None, Arc::new(Config::new()))
}
