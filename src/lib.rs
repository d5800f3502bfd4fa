//! # easyroute
//!
//! A convenience layer for JSON APIs on top of hyper.
//!
//! Handlers are plain async functions. Their parameters say what they need
//! from the request, and their return value says what goes back:
//!
//! - **Binding**: a parameter is any [`FromRequest`](extract::FromRequest)
//!   type. [`Context`] for the raw request, [`Bind`](extract::Bind) for a
//!   body decoded by content type, [`Arg`](extract::Arg) for query values
//!   taken in order, [`Query`](extract::Query) for the query by name.
//!   A request that does not bind gets a `400` envelope and the handler never
//!   runs.
//! - **Replies**: [`Reply`] renders the `{"code","message","data"}` envelope.
//!   Envelopes are pooled; a `Reply` hands its envelope back when dropped.
//! - **Business codes**: [`CodeError`] carries a numeric code and message.
//!   A [`CodeMessager`] installed on the [`Config`] can translate codes into
//!   messages at render time.
//! - **Chains**: a [`Group`] runs `before` handlers ahead of each route. The
//!   first handler in the chain that responds wins.
//! - **Shutdown**: SIGTERM / Ctrl-C drains in-flight requests within a grace
//!   period, then runs the callbacks registered with [`Server::on_shutdown`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use easyroute::extract::{Arg, Bind};
//! use easyroute::{CodeError, Context, Reply, Router, Server};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! const NOT_FOUND: CodeError = CodeError::from_static(1004, "user not found");
//!
//! #[tokio::main]
//! async fn main() -> Result<(), easyroute::Error> {
//!     let app = Router::new()
//!         .get("/user", get_user)
//!         .post("/user", create_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! // GET /user?id=7
//! async fn get_user(Arg(id): Arg<i64>) -> Reply {
//!     if id != 7 {
//!         return Reply::fail(&NOT_FOUND);
//!     }
//!     Reply::ok_data(User { id, name: "ferris".into() })
//! }
//!
//! async fn create_user(ctx: Context, Bind(user): Bind<User>) -> Reply {
//!     tracing::info!(peer = ?ctx.remote_addr(), id = user.id, "creating user");
//!     Reply::ok_data(user)
//! }
//! ```

mod code;
mod config;
mod context;
mod error;
mod handler;
mod method;
mod pool;
mod query;
mod reply;
mod responder;
mod response;
mod router;
mod server;
mod shutdown;

pub mod extract;

pub use code::{BusinessError, CodeError, SUCCESS_CODE, UNKNOWN_ERROR_CODE, as_business_error, is_business_error, is_success};
pub use config::{CodeMessager, Config, ConfigError, GRACE_PERIOD_ENV, MAX_BODY_SIZE_ENV};
pub use context::Context;
pub use error::{BindError, Error};
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use query::{QueryError, QueryValues};
pub use reply::Reply;
pub use responder::Responder;
pub use response::{Response, ResponseBuilder};
pub use router::{Group, Router};
pub use server::Server;
pub use shutdown::{ShutdownHandle, State};
