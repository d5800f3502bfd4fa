//! Minimal easyroute service: JSON envelopes, positional query binding, a
//! guarded route group and a shutdown hook.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/query?id=1&name=aabb'
//!   curl -X POST http://localhost:3000/post \
//!        -H 'content-type: application/json' \
//!        -d '{"id":1,"username":"aabb"}'
//!   curl -X POST http://localhost:3000/post -d 'id=2&username=form'
//!   curl http://localhost:3000/api/users/7 -H 'x-token: secret'
//!   curl http://localhost:3000/api/users/7

use easyroute::extract::{Arg, Bind};
use easyroute::{CodeError, Config, Context, Reply, Router, Server};
use serde::{Deserialize, Serialize};

const TOKEN_MISSING: CodeError = CodeError::from_static(1001, "token missing");
const USER_NOT_FOUND: CodeError = CodeError::from_static(1004, "user not found");

#[derive(Debug, Deserialize, Serialize)]
struct User {
    id: i64,
    username: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?.code_messager(|code: i32| match code {
        0 => Some("ok".to_owned()),
        _ => None,
    });

    let app = Router::with_config(config)
        .get("/query", query)
        .post("/post", post)
        .group("/api", |api| {
            api.before(require_token)
                .get("/users/{id}", get_user)
        });

    Server::bind("0.0.0.0:3000")?
        .on_shutdown(|| tracing::info!("bye"))
        .serve(app)
        .await?;
    Ok(())
}

async fn query(Arg(id): Arg<i64>, Arg(name): Arg<String>) -> Reply {
    Reply::ok_data(format!("id={id} name={name}"))
}

async fn post(Bind(user): Bind<User>) -> Reply {
    Reply::ok_data(user)
}

async fn require_token(ctx: Context) -> Option<Reply> {
    match ctx.header("x-token") {
        Some("secret") => None,
        _ => Some(Reply::fail(&TOKEN_MISSING)),
    }
}

async fn get_user(ctx: Context) -> Result<Reply, CodeError> {
    let id: i64 = ctx
        .param("id")
        .and_then(|id| id.parse().ok())
        .ok_or(USER_NOT_FOUND)?;
    if id != 7 {
        return Err(USER_NOT_FOUND);
    }
    Ok(Reply::ok_data(User { id, username: "ferris".to_owned() }))
}
