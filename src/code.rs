//! Business errors: failures that carry a caller-meaningful numeric code.
//!
//! A business error is sent to the client inside the reply envelope with
//! `200 OK`. Anything else (I/O, parsing, a third-party error) is opaque and
//! gets [`UNKNOWN_ERROR_CODE`] when turned into a reply.

use std::borrow::Cow;
use std::error::Error as StdError;

use thiserror::Error;

/// Code carried by every successful reply.
pub const SUCCESS_CODE: i32 = 0;

/// Code used for errors that have no business code of their own.
pub const UNKNOWN_ERROR_CODE: i32 = -1;

/// An error with a numeric code and a client-facing message.
pub trait BusinessError: StdError {
    fn code(&self) -> i32;
    fn message(&self) -> &str;
}

/// The stock [`BusinessError`].
///
/// ```rust
/// use easyroute::{BusinessError, CodeError};
///
/// const USERNAME_INVALID: CodeError = CodeError::from_static(1, "username invalid");
///
/// assert_eq!(USERNAME_INVALID.code(), 1);
/// assert_eq!(USERNAME_INVALID.to_string(), "[1]username invalid");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("[{code}]{message}")]
pub struct CodeError {
    code: i32,
    message: Cow<'static, str>,
}

impl CodeError {
    /// The success value: code `0`, message `"success"`.
    pub const SUCCESS: CodeError = CodeError::from_static(SUCCESS_CODE, "success");

    pub fn new(code: i32, message: impl Into<Cow<'static, str>>) -> Self {
        Self { code, message: message.into() }
    }

    pub const fn from_static(code: i32, message: &'static str) -> Self {
        Self { code, message: Cow::Borrowed(message) }
    }

    /// Wraps an opaque error under [`UNKNOWN_ERROR_CODE`], keeping its text.
    pub fn from_error(err: &dyn StdError) -> Self {
        Self::new(UNKNOWN_ERROR_CODE, err.to_string())
    }
}

impl BusinessError for CodeError {
    fn code(&self) -> i32 {
        self.code
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Builds a [`CodeError`] with a formatted message.
///
/// ```rust
/// let err = easyroute::code_error!(7, "user {} not found", 42);
/// assert_eq!(err.to_string(), "[7]user 42 not found");
/// ```
#[macro_export]
macro_rules! code_error {
    ($code:expr, $($arg:tt)+) => {
        $crate::CodeError::new($code, ::std::format!($($arg)+))
    };
}

/// Returns `err` as a [`CodeError`] if that is what it is.
pub fn as_business_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a CodeError> {
    err.downcast_ref::<CodeError>()
}

pub fn is_business_error(err: &(dyn StdError + 'static)) -> bool {
    as_business_error(err).is_some()
}

pub fn is_success(err: &dyn BusinessError) -> bool {
    err.code() == SUCCESS_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_code_then_message() {
        let err = CodeError::new(2, "fail");
        assert_eq!(err.to_string(), "[2]fail");
        assert_eq!(err.code(), 2);
        assert_eq!(err.message(), "fail");
    }

    #[test]
    fn downcast_finds_business_errors_only() {
        let business: Box<dyn StdError> = Box::new(CodeError::new(1, "username invalid"));
        let opaque: Box<dyn StdError> = Box::new(std::io::Error::other("disk on fire"));

        assert_eq!(as_business_error(business.as_ref()).map(|e| e.code()), Some(1));
        assert!(is_business_error(business.as_ref()));
        assert!(as_business_error(opaque.as_ref()).is_none());

        let wrapped = CodeError::from_error(opaque.as_ref());
        assert_eq!(wrapped.code(), UNKNOWN_ERROR_CODE);
        assert_eq!(wrapped.message(), "disk on fire");
    }

    #[test]
    fn success_is_code_zero() {
        assert!(is_success(&CodeError::SUCCESS));
        assert!(!is_success(&code_error!(3, "nope {}", 1)));
    }
}
