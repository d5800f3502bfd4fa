//! HTTP server and graceful shutdown.
//!
//! # Shutdown sequence
//!
//! On SIGTERM or Ctrl-C (or [`ShutdownHandle::shutdown`]) the server:
//! 1. Stops `listener.accept()`, so no new connections are made.
//! 2. Asks every open connection to finish its in-flight request and close.
//! 3. Waits for them, but no longer than the grace period
//!    ([`Config::grace_period`](crate::Config::grace_period), 10 s by default).
//!    Whatever is still running after that is aborted.
//! 4. Runs the after-close callbacks registered with [`Server::on_shutdown`],
//!    in registration order.
//! 5. Returns from [`Server::serve`].
//!
//! Installing a custom signal with [`Server::with_signal`] replaces the OS
//! signal listener *and* disables the after-close callbacks: whoever owns the
//! signal owns the cleanup.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::response::Response;
use crate::router::Router;
use crate::shutdown::{ShutdownHandle, State};

type Signal = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type AfterClose = Box<dyn FnOnce() + Send + 'static>;

/// The HTTP server.
///
/// ```rust,no_run
/// use easyroute::{Reply, Router, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), easyroute::Error> {
///     let app = Router::new().get("/ping", || async { Reply::ok_data("pong") });
///
///     Server::bind("0.0.0.0:3000")?
///         .on_shutdown(|| println!("flushing caches"))
///         .serve(app)
///         .await
/// }
/// ```
pub struct Server {
    addr: String,
    signal: Option<Signal>,
    after_close: Vec<AfterClose>,
    handle: ShutdownHandle,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// `addr` is `host:port`, where the host may be an IP literal or a name
    /// resolved at bind time (`localhost:3000`, `[::1]:3000`). A bare `:port`
    /// listens on every IPv4 interface.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = listen_addr(addr)?;
        Ok(Self { addr, signal: None, after_close: Vec::new(), handle: ShutdownHandle::new() })
    }

    /// Registers a callback to run once the server has stopped. Callbacks
    /// accumulate and run in registration order, each exactly once.
    pub fn on_shutdown(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.after_close.push(Box::new(callback));
        self
    }

    /// Replaces the SIGTERM / Ctrl-C listener: shutdown starts when `signal`
    /// resolves. After-close callbacks are not run.
    pub fn with_signal(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.signal = Some(Box::pin(signal));
        self
    }

    /// A handle to trigger shutdown and observe the server's [`State`].
    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Binds, then serves `router` until shut down.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr.as_str()).await?;
        self.serve_on(listener, router).await
    }

    /// Serves `router` on an already-bound listener. The address given to
    /// [`bind`](Server::bind) is ignored.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve_on(self, listener: TcpListener, router: Router) -> Result<(), Error> {
        let Self { signal, after_close, handle, .. } = self;
        let custom_signal = signal.is_some();
        let grace = router.config().get_grace_period();

        // Shared by every connection task without copying the routing table.
        let router = Arc::new(router);

        info!(addr = %listener.local_addr()?, "easyroute listening");

        let mut tasks = JoinSet::new();

        let trigger = wait_for_trigger(signal, handle.clone());
        tokio::pin!(trigger);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM immediately stops
                // accepting, even if more connections are queued.
                biased;

                () = &mut trigger => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };
                    tasks.spawn(serve_connection(Arc::clone(&router), stream, remote_addr, handle.clone()));
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        handle.shutdown();
        handle.set_state(State::Draining);

        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = tasks.len(), ?grace, "grace period elapsed, aborting connections");
            tasks.shutdown().await;
        }

        handle.set_state(State::Stopped);

        if custom_signal {
            if !after_close.is_empty() {
                warn!(count = after_close.len(), "custom signal installed, skipping after-close callbacks");
            }
        } else {
            for callback in after_close {
                callback();
            }
        }

        info!("easyroute stopped");
        Ok(())
    }
}

/// Checks the `host:port` shape and expands `:port` to `0.0.0.0:port`.
/// Name resolution is left to `TcpListener::bind`.
fn listen_addr(addr: &str) -> Result<String, Error> {
    let invalid = |reason| Error::InvalidAddress { addr: addr.to_owned(), reason };

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    port.parse::<u16>().map_err(|_| invalid("port must be a number from 0 to 65535"))?;
    if host.is_empty() {
        return Ok(format!("0.0.0.0:{port}"));
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(invalid("IPv6 hosts must be bracketed"));
    }
    Ok(addr.to_owned())
}

/// One connection: HTTP/1.1 or HTTP/2, whatever the client negotiates.
/// Once shutdown is triggered the connection finishes what it is doing and
/// closes.
async fn serve_connection(router: Arc<Router>, stream: tokio::net::TcpStream, remote_addr: SocketAddr, handle: ShutdownHandle) {
    let io = TokioIo::new(stream);

    // Called once per request on the connection, not once per connection.
    let svc = service_fn(move |req| {
        let router = Arc::clone(&router);
        async move { Ok::<_, Infallible>(dispatch(&router, req, remote_addr).await) }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(io, svc);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        () = handle.triggered() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

/// Buffers the body up to the configured limit, then hands the request to
/// the router.
async fn dispatch(
    router: &Router,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> http::Response<Full<bytes::Bytes>> {
    let (parts, body) = req.into_parts();
    let limit = router.config().get_max_body_size();
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(peer = %remote_addr, limit, "request body too large");
            return Response::status(http::StatusCode::PAYLOAD_TOO_LARGE).into_inner();
        }
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Response::status(http::StatusCode::BAD_REQUEST).into_inner();
        }
    };

    router.dispatch(parts, body, Some(remote_addr)).await.into_inner()
}

/// Resolves on the first shutdown trigger: the custom signal if one is set,
/// otherwise SIGTERM / Ctrl-C; a [`ShutdownHandle::shutdown`] call always
/// counts.
async fn wait_for_trigger(signal: Option<Signal>, handle: ShutdownHandle) {
    let signal = async move {
        match signal {
            Some(custom) => custom.await,
            None => os_signal().await,
        }
    };

    tokio::select! {
        () = signal => {}
        () = handle.triggered() => {}
    }
}

/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
///
/// A listener that cannot be installed is logged and never fires.
async fn os_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves: on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
