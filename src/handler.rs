//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* types (different parameter lists,
//! different return types) in one routing tree. Each one is erased behind
//! `dyn ErasedHandler` once, when the route is registered.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn get_user(ctx: Context, Arg(id): Arg<u64>) -> Reply { … }  ← user writes this
//!        ↓ router.get("/user", get_user)
//! get_user.into_boxed_handler()                        ← Handler<(Context, Arg<u64>)> impl
//!        ↓
//! Arc::new(FnHandler { f: get_user, .. })              ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time                   ← one vtable dispatch
//!        ↓
//! extract Context, then Arg<u64>                       ← FromRequest, in order
//!        ↓
//! Box::pin(async { get_user(..).await.respond_to(&ctx) })
//! ```
//!
//! A handler whose signature does not fit simply does not implement
//! [`Handler`] and the registration fails to compile. There is nothing left to
//! validate at runtime.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::extract::{FromRequest, RequestParts};
use crate::responder::Responder;
use crate::response::Response;

/// A heap-allocated, type-erased future resolving to the handler's response,
/// or `None` when the handler declined to respond.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Option<Response>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure of up to 12 parameters where
///
/// - every parameter implements [`FromRequest`](crate::extract::FromRequest)
///   ([`Context`], [`Bind`](crate::extract::Bind),
///   [`Arg`](crate::extract::Arg), ...), in any order;
/// - it returns a `Future` whose output implements [`Responder`]
///   (usually [`Reply`](crate::Reply)).
///
/// ```text
/// async fn name() -> Reply
/// async fn name(ctx: Context) -> Reply
/// async fn name(ctx: Context, Bind(user): Bind<User>) -> Reply
/// async fn name(Arg(id): Arg<i64>, Arg(name): Arg<String>) -> Option<Reply>
/// ```
///
/// The trait is **sealed**: only the blanket impls below can satisfy it.
pub trait Handler<Args>: private::Sealed<Args> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed<Args> {}
}

/// Holds a concrete handler `F` and implements [`ErasedHandler`], bridging the
/// typed world to the trait-object world.
///
/// `fn(Args)` keeps the wrapper `Send + Sync` whatever the argument types are.
struct FnHandler<F, Args> {
    f: F,
    _args: PhantomData<fn(Args)>,
}

/// Implements `Handler` for `Fn` of every arity from 0 to 12.
///
/// For two parameters, the generated `call` reads:
///
/// ```text
/// let mut req = RequestParts::new(ctx.clone());
/// let A = match A::from_request(&mut req) { Ok(v) => v, Err(e) => return bind_failure(e, &ctx) };
/// let B = match B::from_request(&mut req) { Ok(v) => v, Err(e) => return bind_failure(e, &ctx) };
/// let fut = (self.f)(A, B);
/// Box::pin(async move { fut.await.respond_to(&ctx) })
/// ```
macro_rules! impl_handler_for_fn ({ $($param:ident)* } => {
    impl<F, Fut, R, $($param,)*> private::Sealed<($($param,)*)> for F
    where
        F: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + 'static,
        $($param: FromRequest + 'static,)*
    {
    }

    impl<F, Fut, R, $($param,)*> Handler<($($param,)*)> for F
    where
        F: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + 'static,
        $($param: FromRequest + 'static,)*
    {
        fn into_boxed_handler(self) -> BoxedHandler {
            Arc::new(FnHandler::<F, ($($param,)*)> { f: self, _args: PhantomData })
        }
    }

    impl<F, Fut, R, $($param,)*> ErasedHandler for FnHandler<F, ($($param,)*)>
    where
        F: Fn($($param),*) -> Fut + Send + Sync,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder,
        $($param: FromRequest,)*
    {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        fn call(&self, ctx: Context) -> BoxFuture {
            let mut req = RequestParts::new(ctx.clone());
            $(
                let $param = match $param::from_request(&mut req) {
                    Ok(value) => value,
                    Err(e) => return bind_failure(e, &ctx),
                };
            )*
            drop(req);

            let fut = (self.f)($($param),*);
            Box::pin(async move { fut.await.respond_to(&ctx) })
        }
    }
});

fn bind_failure(err: crate::error::BindError, ctx: &Context) -> BoxFuture {
    debug!(method = %ctx.method(), path = ctx.path(), "request binding failed: {err}");
    Box::pin(std::future::ready(err.respond_to(ctx)))
}

impl_handler_for_fn! {}
impl_handler_for_fn! { A }
impl_handler_for_fn! { A B }
impl_handler_for_fn! { A B C }
impl_handler_for_fn! { A B C D }
impl_handler_for_fn! { A B C D E }
impl_handler_for_fn! { A B C D E G }
impl_handler_for_fn! { A B C D E G H }
impl_handler_for_fn! { A B C D E G H I }
impl_handler_for_fn! { A B C D E G H I J }
impl_handler_for_fn! { A B C D E G H I J K }
impl_handler_for_fn! { A B C D E G H I J K L }
impl_handler_for_fn! { A B C D E G H I J K L M }

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::context::test_context;
    use crate::extract::{Arg, Bind};
    use crate::method::Method;
    use crate::reply::Reply;

    fn assert_is_handler<Args, H: Handler<Args>>(_handler: H) {
        // no op
    }

    fn boxed<Args, H: Handler<Args>>(handler: H) -> BoxedHandler {
        handler.into_boxed_handler()
    }

    #[derive(Deserialize)]
    struct User {
        id: i64,
    }

    async fn no_params() -> Reply { Reply::ok() }
    async fn ctx_only(_ctx: Context) -> Reply { Reply::ok() }
    async fn ctx_last(_user: Bind<User>, _ctx: Context) -> Option<Reply> { None }
    async fn scalars(_ctx: Context, _id: Arg<i64>, _name: Arg<String>) -> Reply { Reply::ok() }
    async fn must_not_run(_id: Arg<i64>) -> Reply { unreachable!("handler must not run") }

    #[test]
    fn fn_shapes_are_handlers() {
        assert_is_handler(no_params);
        assert_is_handler(ctx_only);
        assert_is_handler(ctx_last);
        assert_is_handler(scalars);
        assert_is_handler(|| async {});
    }

    #[tokio::test]
    async fn call_binds_then_invokes() {
        let handler = boxed(|Bind(user): Bind<User>, Arg(name): Arg<String>| async move {
            Reply::ok_data(format!("{}:{name}", user.id))
        });

        let ctx = test_context(Method::Get, "/?id=5&name=x", None, b"");
        // Bind reads the whole query; Arg still starts at the first key.
        let response = handler.call(ctx).await.unwrap();
        assert_eq!(response.body().as_ref(), br#"{"code":0,"message":"success","data":"5:5"}"#);
    }

    #[tokio::test]
    async fn binding_failure_skips_the_handler() {
        let handler = boxed(must_not_run);

        let response = handler.call(test_context(Method::Get, "/", None, b"")).await.unwrap();
        assert_eq!(response.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(response.body().as_ref(), br#"{"code":-1,"message":"query is empty","data":null}"#);
    }
}
