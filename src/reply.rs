//! The reply envelope every handler hands back.
//!
//! On the wire a reply is always
//!
//! ```text
//! {"code":<int>,"message":"<string>","data":<payload or null>}
//! ```
//!
//! in exactly that field order, with `content-type: application/json`.
//!
//! Replies are never built field by field: use one of the constructors. Each
//! one draws an envelope from a shared pool, and dropping the `Reply` (which
//! the framework does right after rendering it) resets the envelope and puts
//! it back.

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use serde::Serialize;
use serde_json::value::{RawValue, to_raw_value};
use tracing::error;

use crate::code::{BusinessError, CodeError, SUCCESS_CODE, UNKNOWN_ERROR_CODE, as_business_error};
use crate::config::Config;
use crate::error::BindError;
use crate::pool::{ENVELOPES, Envelope};
use crate::response::Response;

const SUCCESS_MESSAGE: &str = "success";

static EMPTY: Envelope = Envelope {
    status: StatusCode::OK,
    code: SUCCESS_CODE,
    message: String::new(),
    resolvable: false,
    data: None,
};

/// A pooled response envelope.
///
/// ```rust
/// use easyroute::{CodeError, Reply};
///
/// # #[derive(serde::Serialize)] struct User { id: u32 }
/// async fn get_user() -> Reply {
///     Reply::ok_data(User { id: 1 })
/// }
///
/// async fn delete_user() -> Reply {
///     Reply::fail(&CodeError::new(3, "user is locked"))
/// }
/// ```
pub struct Reply {
    envelope: Option<Box<Envelope>>,
}

#[derive(Serialize)]
struct Wire<'a> {
    code: i32,
    message: &'a str,
    data: Option<&'a RawValue>,
}

impl Reply {
    /// `200`, success code, no data.
    pub fn ok() -> Self {
        Self::alloc(StatusCode::OK, SUCCESS_CODE, SUCCESS_MESSAGE, true, None)
    }

    /// `200`, success code, `data` as payload.
    pub fn ok_data(data: impl Serialize) -> Self {
        Self::ok_code_data(SUCCESS_CODE, data)
    }

    /// `200` with a custom business code and no data.
    pub fn ok_code(code: i32) -> Self {
        Self::alloc(StatusCode::OK, code, SUCCESS_MESSAGE, true, None)
    }

    /// `200` with a custom business code and `data` as payload.
    pub fn ok_code_data(code: i32, data: impl Serialize) -> Self {
        match to_raw_value(&data) {
            Ok(data) => Self::alloc(StatusCode::OK, code, SUCCESS_MESSAGE, true, Some(data)),
            Err(e) => Self::unserializable(e),
        }
    }

    /// `200` carrying a business error's code and message.
    pub fn fail(err: &dyn BusinessError) -> Self {
        Self::alloc(StatusCode::OK, err.code(), err.message(), false, None)
    }

    /// Like [`Reply::fail`], with a payload.
    pub fn fail_data(err: &dyn BusinessError, data: impl Serialize) -> Self {
        match to_raw_value(&data) {
            Ok(data) => Self::alloc(StatusCode::OK, err.code(), err.message(), false, Some(data)),
            Err(e) => Self::unserializable(e),
        }
    }

    /// A bare HTTP status: unknown business code, the status' reason phrase
    /// as message.
    pub fn error(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or_default();
        Self::alloc(status, UNKNOWN_ERROR_CODE, reason, true, None)
    }

    /// Fails with `err`'s own code if it is a [`CodeError`], or with
    /// [`UNKNOWN_ERROR_CODE`] and its text otherwise.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        match as_business_error(err) {
            Some(business) => Self::fail(business),
            None => Self::fail(&CodeError::from_error(err)),
        }
    }

    pub(crate) fn bind_failure(err: &BindError) -> Self {
        Self::alloc(err.status(), UNKNOWN_ERROR_CODE, &err.to_string(), false, None)
    }

    fn unserializable(err: serde_json::Error) -> Self {
        error!("reply data could not be serialized: {err}");
        let message = format!("reply data could not be serialized: {err}");
        Self::alloc(StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN_ERROR_CODE, &message, false, None)
    }

    fn alloc(status: StatusCode, code: i32, message: &str, resolvable: bool, data: Option<Box<RawValue>>) -> Self {
        let mut envelope = ENVELOPES.get();
        envelope.status = status;
        envelope.code = code;
        envelope.message.push_str(message);
        envelope.resolvable = resolvable;
        envelope.data = data;
        Self { envelope: Some(envelope) }
    }

    fn envelope(&self) -> &Envelope {
        self.envelope.as_deref().unwrap_or(&EMPTY)
    }

    pub fn status(&self) -> StatusCode {
        self.envelope().status
    }

    pub fn code(&self) -> i32 {
        self.envelope().code
    }

    /// The message as constructed, before any code messager is applied.
    pub fn message(&self) -> &str {
        &self.envelope().message
    }

    /// The payload as encoded JSON text, `"null"` when there is none.
    pub fn data(&self) -> &str {
        self.envelope().data.as_deref().map_or("null", RawValue::get)
    }

    /// Serializes the envelope, resolving the message through `config`.
    pub(crate) fn render(&self, config: &Config) -> Response {
        let envelope = self.envelope();
        let resolved = envelope
            .resolvable
            .then(|| config.message_for(envelope.code))
            .flatten();
        let wire = Wire {
            code: envelope.code,
            message: resolved.as_deref().unwrap_or(envelope.message.as_str()),
            data: envelope.data.as_deref(),
        };

        match serde_json::to_vec(&wire) {
            Ok(body) => Response::builder().status(envelope.status).json(body),
            Err(e) => {
                error!("reply could not be serialized: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(envelope) = self.envelope.take() {
            ENVELOPES.put(envelope);
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let envelope = self.envelope();
        f.debug_struct("Reply")
            .field("status", &envelope.status)
            .field("code", &envelope.code)
            .field("message", &envelope.message)
            .field("data", &envelope.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(reply: Reply, config: &Config) -> String {
        let response = reply.render(config);
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    #[derive(Serialize)]
    struct UserInfo {
        id: u32,
        username: &'static str,
    }

    #[test]
    fn wire_field_order_is_fixed() {
        let config = Config::new();
        assert_eq!(body(Reply::ok(), &config), r#"{"code":0,"message":"success","data":null}"#);
        assert_eq!(
            body(Reply::fail_data(&CodeError::new(2, "fail"), "failed"), &config),
            r#"{"code":2,"message":"fail","data":"failed"}"#
        );
        assert_eq!(
            body(Reply::ok_data(UserInfo { id: 1, username: "aabb" }), &config),
            r#"{"code":0,"message":"success","data":{"id":1,"username":"aabb"}}"#
        );
    }

    #[test]
    fn constructors_fill_status_and_code() {
        let reply = Reply::ok_code_data(5, [1, 2]);
        assert_eq!((reply.status(), reply.code()), (StatusCode::OK, 5));
        assert_eq!(reply.data(), "[1,2]");

        let reply = Reply::error(StatusCode::NOT_FOUND);
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        assert_eq!(reply.code(), UNKNOWN_ERROR_CODE);
        assert_eq!(reply.message(), "Not Found");

        let response = Reply::ok_code(4).render(&Config::new());
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn reused_envelopes_do_not_leak() {
        let first = Reply::fail_data(&CodeError::new(9, "first request"), "secret");
        drop(first);

        let second = Reply::ok();
        assert_eq!(second.code(), SUCCESS_CODE);
        assert_eq!(second.message(), "success");
        assert_eq!(second.data(), "null");
        assert_eq!(body(second, &Config::new()), r#"{"code":0,"message":"success","data":null}"#);
    }

    #[test]
    fn code_messager_replaces_only_resolvable_messages() {
        let config = Config::new().code_messager(|code: i32| match code {
            0 => Some("ok".to_owned()),
            12 => Some("quota exceeded".to_owned()),
            _ => None,
        });

        assert_eq!(body(Reply::ok(), &config), r#"{"code":0,"message":"ok","data":null}"#);
        assert_eq!(body(Reply::ok_code(12), &config), r#"{"code":12,"message":"quota exceeded","data":null}"#);
        assert_eq!(body(Reply::ok_code(13), &config), r#"{"code":13,"message":"success","data":null}"#);
        assert_eq!(
            body(Reply::fail(&CodeError::new(12, "explicit")), &config),
            r#"{"code":12,"message":"explicit","data":null}"#
        );
    }

    #[test]
    fn from_error_keeps_business_codes() {
        let business = CodeError::new(1, "username invalid");
        let reply = Reply::from_error(&business);
        assert_eq!((reply.code(), reply.message()), (1, "username invalid"));

        let opaque = std::io::Error::other("broken pipe");
        let reply = Reply::from_error(&opaque);
        assert_eq!((reply.code(), reply.message()), (UNKNOWN_ERROR_CODE, "broken pipe"));
    }

    #[derive(Serialize)]
    struct Person {
        name: &'static str,
        age: u8,
    }

    #[test]
    fn payload_keeps_field_order_and_wide_numbers() {
        let config = Config::new();
        assert_eq!(
            body(Reply::ok_data(Person { name: "z", age: 3 }), &config),
            r#"{"code":0,"message":"success","data":{"name":"z","age":3}}"#
        );

        let reply = Reply::ok_data(u128::MAX);
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(
            body(reply, &config),
            r#"{"code":0,"message":"success","data":340282366920938463463374607431768211455}"#
        );
    }

    #[test]
    fn unserializable_data_is_500() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple keys are not json");
        let reply = Reply::ok_data(map);
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.code(), UNKNOWN_ERROR_CODE);
        assert_eq!(reply.data(), "null");
    }

    #[test]
    fn messages_are_escaped() {
        let reply = Reply::fail(&CodeError::new(1, r#"bad "name""#));
        assert_eq!(body(reply, &Config::new()), r#"{"code":1,"message":"bad \"name\"","data":null}"#);
    }
}
