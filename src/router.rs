//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Each route maps to a
//! *chain*: the before-handlers of its group, then the route handler itself.
//! The chain runs in order and stops at the first handler that responds.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use http::request::Parts;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::response::Response;
use crate::server::Server;

type Chain = Vec<BoxedHandler>;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`]. Every registration
/// returns `self` so calls chain naturally.
///
/// Registration is where mistakes surface: a malformed path or one that
/// conflicts with an existing route panics immediately, before the server
/// ever binds.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Chain>>,
    config: Arc<Config>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self { routes: HashMap::new(), config: Arc::new(config) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `ctx.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use easyroute::{Context, Method, Reply, Router};
    /// # async fn get_user(_: Context) -> Reply { Reply::ok() }
    /// # async fn create_user() -> Reply { Reply::ok() }
    /// Router::new()
    ///     .on(Method::Get,  "/users/{id}", get_user)
    ///     .on(Method::Post, "/users",      create_user);
    /// ```
    pub fn on<Args>(self, method: Method, path: &str, handler: impl Handler<Args>) -> Self {
        self.add(method, path, vec![handler.into_boxed_handler()])
    }

    pub fn get<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn head<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Head, path, handler)
    }

    pub fn patch<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn options<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Options, path, handler)
    }

    /// Registers every route of a [`Group`] under `prefix`.
    ///
    /// ```rust
    /// # use easyroute::{Context, Reply, Router};
    /// # async fn require_token(ctx: Context) -> Option<Reply> { None }
    /// # async fn list() -> Reply { Reply::ok() }
    /// # async fn create() -> Reply { Reply::ok() }
    /// Router::new().group("/api", |api| {
    ///     api.before(require_token)
    ///         .get("/items", list)
    ///         .post("/items", create)
    /// });
    /// ```
    pub fn group(mut self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let group = build(Group::new(prefix.to_owned(), Vec::new()));
        for (method, path, chain) in group.routes {
            self = self.add(method, &path, chain);
        }
        self
    }

    /// Binds `addr` and serves until shut down. See [`Server`] for shutdown
    /// hooks.
    pub async fn listen_and_serve(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr)?.serve(self).await
    }

    fn add(mut self, method: Method, path: &str, chain: Chain) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, chain)
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(&[BoxedHandler], HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.as_slice(), params))
    }

    /// Routes one buffered request and produces one response.
    pub(crate) async fn dispatch(&self, parts: Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Response {
        let started = Instant::now();
        let response = self.route(parts, body, remote_addr).await;
        debug!(status = response.status_code().as_u16(), elapsed = ?started.elapsed(), "request done");
        response
    }

    async fn route(&self, parts: Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Response {
        let Ok(method) = Method::try_from(&parts.method) else {
            debug!(method = %parts.method, "unsupported method");
            return Response::status(StatusCode::METHOD_NOT_ALLOWED);
        };
        let Some((chain, params)) = self.lookup(method, parts.uri.path()) else {
            debug!(%method, path = parts.uri.path(), "no route");
            return Response::status(StatusCode::NOT_FOUND);
        };

        let ctx = Context::new(method, parts, params, body, remote_addr, Arc::clone(&self.config));
        for handler in chain {
            if let Some(response) = handler.call(ctx.clone()).await {
                return response;
            }
        }
        Response::status(StatusCode::OK)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// A set of routes sharing a path prefix and before-handlers.
///
/// Created by [`Router::group`] or, nested, by [`Group::group`].
pub struct Group {
    prefix: String,
    before: Chain,
    routes: Vec<(Method, String, Chain)>,
}

impl Group {
    fn new(prefix: String, before: Chain) -> Self {
        Self { prefix, before, routes: Vec::new() }
    }

    /// Adds a handler that runs ahead of every route registered on this group
    /// *after* this call. Return `None` to let the request through, or a
    /// reply to answer it and stop the chain.
    pub fn before<Args>(mut self, handler: impl Handler<Args>) -> Self {
        self.before.push(handler.into_boxed_handler());
        self
    }

    pub fn on<Args>(mut self, method: Method, path: &str, handler: impl Handler<Args>) -> Self {
        let mut chain = self.before.clone();
        chain.push(handler.into_boxed_handler());
        self.routes.push((method, join_paths(&self.prefix, path), chain));
        self
    }

    pub fn get<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn head<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Head, path, handler)
    }

    pub fn patch<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn options<Args>(self, path: &str, handler: impl Handler<Args>) -> Self {
        self.on(Method::Options, path, handler)
    }

    /// A nested group. It inherits this group's prefix and before-handlers.
    pub fn group(mut self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let nested = build(Group::new(join_paths(&self.prefix, prefix), self.before.clone()));
        self.routes.extend(nested.routes);
        self
    }
}

/// Joins a group prefix and a relative path with exactly one `/` between
/// them. A trailing `/` on `relative` is kept.
fn join_paths(prefix: &str, relative: &str) -> String {
    if relative.is_empty() {
        return prefix.to_owned();
    }
    let mut joined = String::with_capacity(prefix.len() + relative.len() + 1);
    joined.push_str(prefix.trim_end_matches('/'));
    joined.push('/');
    joined.push_str(relative.trim_start_matches('/'));
    joined
}
