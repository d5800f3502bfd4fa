//! Struct binding from the request body (or the query string when there is
//! no body).

use serde::de::DeserializeOwned;

use crate::error::BindError;
use crate::extract::{FromRequest, RequestParts};

/// Binds a struct from wherever the request carries it.
///
/// - no body: the query string, by field name (`?id=1&username=aabb`);
/// - `application/json` (or any `+json` type): the JSON body;
/// - `application/x-www-form-urlencoded`: the form body;
/// - anything else is rejected with `415 Unsupported Media Type`.
///
/// `Bind<Box<T>>` binds exactly like `Bind<T>`, on the heap.
///
/// ```rust
/// use easyroute::{Reply, extract::Bind};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, serde::Serialize)]
/// struct User {
///     id: u32,
///     username: String,
/// }
///
/// async fn create_user(Bind(user): Bind<User>) -> Reply {
///     Reply::ok_data(user)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind<T>(pub T);

/// The body decoded as JSON, whatever its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// The body decoded as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Bind<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        let ctx = req.context();
        if ctx.body().is_empty() {
            let query = ctx.query().unwrap_or_default();
            return Ok(Bind(serde_urlencoded::from_str(query)?));
        }

        let content_type = ctx.content_type();
        match content_type.as_ref() {
            Some(ct) if is_json(ct) => Ok(Bind(serde_json::from_slice(ctx.body())?)),
            Some(ct) if ct.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
                Ok(Bind(serde_urlencoded::from_bytes(ctx.body())?))
            }
            Some(ct) => Err(BindError::UnsupportedMediaType(ct.essence_str().to_owned())),
            None => Err(BindError::UnsupportedMediaType(
                ctx.header(http::header::CONTENT_TYPE.as_str()).unwrap_or_default().to_owned(),
            )),
        }
    }
}

impl<T: DeserializeOwned> FromRequest for Json<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        Ok(Json(serde_json::from_slice(req.context().body())?))
    }
}

impl<T: DeserializeOwned> FromRequest for Form<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        Ok(Form(serde_urlencoded::from_bytes(req.context().body())?))
    }
}

fn is_json(ct: &mime::Mime) -> bool {
    ct.essence_str() == mime::APPLICATION_JSON.essence_str() || ct.suffix() == Some(mime::JSON)
}
