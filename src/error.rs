//! Unified error types.

use http::StatusCode;
use thiserror::Error;

use crate::query::QueryError;

/// The error type returned by easyroute's fallible infrastructure operations.
///
/// Application-level failures are expressed as [`Reply`](crate::Reply)
/// envelopes, not as `Error`s. This type surfaces infrastructure failures:
/// a malformed listen address, binding to a port, accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address `{addr}`: {reason}")]
    InvalidAddress { addr: String, reason: &'static str },
}

/// A request could not be bound to a handler's parameters.
///
/// The handler is never called. The client receives a reply envelope carrying
/// the error text with the status returned by [`BindError::status`].
#[derive(Debug, Error)]
pub enum BindError {
    #[error("query is empty")]
    QueryEmpty,

    #[error("query key is empty")]
    EmptyKey,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid value `{value}` for query key `{key}`: {reason}")]
    Scalar {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form data: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("unsupported content type `{0}`")]
    UnsupportedMediaType(String),
}

impl BindError {
    /// HTTP status sent back for this failure. Always a 4xx.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
