//! Query-string extraction: by field name ([`Query`]) or by position ([`Arg`]).

use serde::de::DeserializeOwned;

use crate::error::BindError;
use crate::extract::{FromRequest, RequestParts};

/// A struct deserialized from the query string, by field name.
///
/// A request without a query string deserializes from `""`, so structs whose
/// fields all have defaults still bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Query<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        let query = req.context().query().unwrap_or_default();
        Ok(Query(serde_urlencoded::from_str(query)?))
    }
}

/// One scalar taken from the query string **by position**.
///
/// Each `Arg` consumes the next query key, in the order keys first appear in
/// the URL, and parses that key's first value. The parameter's name plays no
/// part, so the handler must declare its `Arg`s in the same order the client
/// sends the keys:
///
/// ```rust
/// use easyroute::{Reply, extract::Arg};
///
/// // GET /query?id=1&name=aabb
/// async fn lookup(Arg(id): Arg<i64>, Arg(name): Arg<String>) -> Reply {
///     Reply::ok_data((id, name))
/// }
/// ```
///
/// Prefer [`Query`] when the client may reorder keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<T>(pub T);

impl<T: Scalar> FromRequest for Arg<T> {
    fn from_request(req: &mut RequestParts) -> Result<Self, BindError> {
        let (key, value) = req.next_query_pair()?;
        T::parse_scalar(value).map(Arg).map_err(|reason| BindError::Scalar {
            key: key.to_owned(),
            value: value.to_owned(),
            reason,
        })
    }
}

/// Values an [`Arg`] can hold: integers and strings.
pub trait Scalar: Sized {
    /// Parses a decoded query value; the error is a human-readable reason.
    fn parse_scalar(value: &str) -> Result<Self, String>;
}

impl Scalar for String {
    fn parse_scalar(value: &str) -> Result<Self, String> {
        Ok(value.to_owned())
    }
}

macro_rules! impl_scalar_for_int {
    ($($ty:ty)*) => {
        $(
            impl Scalar for $ty {
                fn parse_scalar(value: &str) -> Result<Self, String> {
                    value.parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

impl_scalar_for_int! { i8 i16 i32 i64 i128 isize u8 u16 u32 u64 u128 usize }

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::context::test_context;
    use crate::method::Method;

    fn parts(uri: &str) -> RequestParts {
        RequestParts::new(test_context(Method::Get, uri, None, b""))
    }

    #[test]
    fn ordered_scalars_bind_positionally() {
        let mut req = parts("/query?id=1&name=aabb");
        let Arg(id) = Arg::<i32>::from_request(&mut req).unwrap();
        let Arg(name) = Arg::<String>::from_request(&mut req).unwrap();
        assert_eq!((id, name.as_str()), (1, "aabb"));
    }

    #[test]
    fn missing_key_runs_out() {
        let mut req = parts("/query?id=1");
        Arg::<i32>::from_request(&mut req).unwrap();
        let err = Arg::<String>::from_request(&mut req).unwrap_err();
        assert_eq!(err.to_string(), "query is empty");
    }

    #[test]
    fn malformed_and_overflowing_ints_fail() {
        let err = Arg::<i64>::from_request(&mut parts("/q?id=abc")).unwrap_err();
        assert!(matches!(&err, BindError::Scalar { key, value, .. } if key == "id" && value == "abc"));

        assert!(Arg::<u8>::from_request(&mut parts("/q?n=300")).is_err());
        assert!(Arg::<u32>::from_request(&mut parts("/q?n=-1")).is_err());
        assert_eq!(Arg::<i8>::from_request(&mut parts("/q?n=-128")).unwrap(), Arg(-128));
    }

    #[test]
    fn duplicate_keys_use_first_value() {
        let mut req = parts("/q?a=1&a=2&b=3");
        assert_eq!(Arg::<u64>::from_request(&mut req).unwrap(), Arg(1));
        assert_eq!(Arg::<u64>::from_request(&mut req).unwrap(), Arg(3));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        #[serde(default)]
        page: u32,
        #[serde(default)]
        size: u32,
    }

    #[test]
    fn query_binds_by_name_in_any_order() {
        let Query(page) = Query::<Page>::from_request(&mut parts("/list?size=20&page=2")).unwrap();
        assert_eq!(page, Page { page: 2, size: 20 });

        let Query(page) = Query::<Page>::from_request(&mut parts("/list")).unwrap();
        assert_eq!(page, Page { page: 0, size: 0 });
    }
}
