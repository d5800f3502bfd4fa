//! Argument binding: how handler parameters are filled from a request.
//!
//! Every parameter type of a handler implements [`FromRequest`]. Parameters
//! are extracted one after another, in the order the handler declares them,
//! before the handler body runs. The first failure aborts the request with a
//! 4xx reply and the handler is never called.
//!
//! | Parameter | Filled from |
//! |---|---|
//! | [`Context`] | the request itself |
//! | [`Bind<T>`] | query string if the body is empty, else JSON or form body by content type |
//! | [`Json<T>`] / [`Form<T>`] | the body, regardless of content type |
//! | [`Query<T>`] | the query string, by field name |
//! | [`Arg<T>`] | the *next* query key, by position |
//! | `Option<E>` | `E`, or `None` if `E` fails |

mod body;
mod query;

pub use body::{Bind, Form, Json};
pub use query::{Arg, Query, Scalar};

use crate::context::Context;
use crate::error::BindError;
use crate::query::QueryValues;

/// Extraction state for one handler invocation.
///
/// Holds the request context and the positional cursor used by [`Arg`].
/// A fresh `RequestParts` is built for every handler call, so the cursor
/// always starts at the first query key.
pub struct RequestParts {
    ctx: Context,
    query: Option<QueryValues>,
    cursor: usize,
}

impl RequestParts {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx, query: None, cursor: 0 }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Takes the next not-yet-consumed query key and its first value.
    ///
    /// The query string is parsed on first use.
    pub(crate) fn next_query_pair(&mut self) -> Result<(&str, &str), BindError> {
        if self.query.is_none() {
            let raw = self.ctx.query().unwrap_or_default();
            if raw.is_empty() {
                return Err(BindError::QueryEmpty);
            }
            let (values, err) = QueryValues::parse(raw);
            if let Some(err) = err {
                return Err(err.into());
            }
            self.query = Some(values);
        }

        let values = self.query.as_ref().ok_or(BindError::QueryEmpty)?;
        let key = values.keys().get(self.cursor).ok_or(BindError::QueryEmpty)?;
        self.cursor += 1;
        if key.is_empty() {
            return Err(BindError::EmptyKey);
        }
        Ok((key, values.get(key).unwrap_or_default()))
    }
}

/// Types that can be built from an incoming request.
///
/// Implement it for your own types to take them as handler parameters:
///
/// ```rust
/// use easyroute::extract::{FromRequest, RequestParts};
/// use easyroute::BindError;
///
/// struct Token(String);
///
/// impl FromRequest for Token {
///     fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
///         let raw = req.context().header("x-token").unwrap_or_default();
///         Ok(Token(raw.to_owned()))
///     }
/// }
/// ```
pub trait FromRequest: Sized {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError>;
}

impl FromRequest for Context {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        Ok(req.ctx.clone())
    }
}

impl<T: FromRequest> FromRequest for Option<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        Ok(T::from_request(req).ok())
    }
}
