//! Conversion of handler return values into HTTP responses.
//!
//! A handler may decline to respond: returning `None` or `()` produces no
//! response, and the next handler in the route's chain runs. When the whole
//! chain declines, the client gets `200 OK` with an empty body.

use http::StatusCode;

use crate::code::CodeError;
use crate::context::Context;
use crate::error::BindError;
use crate::reply::Reply;
use crate::response::Response;

/// Implemented by every type a handler may return.
///
/// The usual return type is [`Reply`]; `Option<Reply>` lets a handler opt out
/// of responding, and `Result<Reply, CodeError>` lets it use `?` on business
/// errors.
pub trait Responder {
    fn respond_to(self, ctx: &Context) -> Option<Response>;
}

impl Responder for Reply {
    fn respond_to(self, ctx: &Context) -> Option<Response> {
        Some(self.render(ctx.config()))
    }
}

impl Responder for Response {
    fn respond_to(self, _ctx: &Context) -> Option<Response> {
        Some(self)
    }
}

impl Responder for CodeError {
    fn respond_to(self, ctx: &Context) -> Option<Response> {
        Reply::fail(&self).respond_to(ctx)
    }
}

impl Responder for BindError {
    fn respond_to(self, ctx: &Context) -> Option<Response> {
        Reply::bind_failure(&self).respond_to(ctx)
    }
}

/// A bare status, no body.
impl Responder for StatusCode {
    fn respond_to(self, _ctx: &Context) -> Option<Response> {
        Some(Response::status(self))
    }
}

impl Responder for &'static str {
    fn respond_to(self, _ctx: &Context) -> Option<Response> {
        Some(Response::text(self))
    }
}

impl Responder for String {
    fn respond_to(self, _ctx: &Context) -> Option<Response> {
        Some(Response::text(self))
    }
}

impl Responder for () {
    fn respond_to(self, _ctx: &Context) -> Option<Response> {
        None
    }
}

impl<T: Responder> Responder for Option<T> {
    fn respond_to(self, ctx: &Context) -> Option<Response> {
        self?.respond_to(ctx)
    }
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn respond_to(self, ctx: &Context) -> Option<Response> {
        match self {
            Ok(t) => t.respond_to(ctx),
            Err(e) => e.respond_to(ctx),
        }
    }
}
