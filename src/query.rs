//! `application/x-www-form-urlencoded` query-string parsing.
//!
//! Unlike a plain map, [`QueryValues`] remembers the order in which keys were
//! first seen. Positional scalar binding ([`Arg`](crate::extract::Arg))
//! depends on that order.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid semicolon separator in query")]
    Semicolon,

    #[error("invalid URL escape {0:?}")]
    Escape(String),

    #[error("invalid UTF-8 in query component")]
    Utf8,
}

/// Parsed query string: every value per key, plus first-seen key order.
#[derive(Clone, Debug, Default)]
pub struct QueryValues {
    values: HashMap<String, Vec<String>>,
    keys: Vec<String>,
}

impl QueryValues {
    /// Parses `query` (without the leading `?`).
    ///
    /// Parsing never stops early. A segment containing `;` or a bad
    /// percent-escape is skipped and the rest of the query is still parsed;
    /// the first such error is returned next to whatever did parse.
    ///
    /// ```rust
    /// use easyroute::QueryValues;
    ///
    /// let (values, err) = QueryValues::parse("a=1;b=2&c=3");
    /// assert!(err.is_some());
    /// assert_eq!(values.get("c"), Some("3"));
    /// assert_eq!(values.get("a"), None);
    /// ```
    pub fn parse(query: &str) -> (Self, Option<QueryError>) {
        let segments = query.bytes().filter(|&b| b == b'&').count() + 1;
        let mut out = Self {
            values: HashMap::with_capacity(segments),
            keys: Vec::with_capacity(segments),
        };
        let mut first_err = None;

        for segment in query.split('&') {
            if segment.contains(';') {
                first_err.get_or_insert(QueryError::Semicolon);
                continue;
            }
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let decoded = unescape(key).and_then(|k| Ok((k, unescape(value)?)));
            match decoded {
                Ok((key, value)) => out.push(key, value),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        (out, first_err)
    }

    fn push(&mut self, key: String, value: String) {
        match self.values.get_mut(&key) {
            Some(values) => values.push(value),
            None => {
                self.keys.push(key.clone());
                self.values.insert(key, vec![value]);
            }
        }
    }

    /// Keys in the order they first appeared.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.first().map(String::as_str)
    }

    /// Every value for `key`, in query order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Decodes `+` as space and `%XX` as a byte. The result must be UTF-8.
fn unescape(s: &str) -> Result<String, QueryError> {
    if !s.bytes().any(|b| b == b'%' || b == b'+') {
        return Ok(s.to_owned());
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                let byte = hex.and_then(|h| Some(hex_val(h[0])? << 4 | hex_val(h[1])?));
                match byte {
                    Some(b) => out.push(b),
                    None => {
                        let end = (i + 3).min(bytes.len());
                        return Err(QueryError::Escape(String::from_utf8_lossy(&bytes[i..end]).into_owned()));
                    }
                }
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8(out).map_err(|_| QueryError::Utf8)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_keep_first_seen_order() {
        let (values, err) = QueryValues::parse("a=1&a=2");
        assert!(err.is_none());
        assert_eq!(values.keys(), ["a"]);
        assert_eq!(values.get_all("a"), ["1", "2"]);
        assert_eq!(values.get("a"), Some("1"));
    }

    #[test]
    fn keys_follow_query_order() {
        let (values, _) = QueryValues::parse("id=1&name=aabb&id=3&extra");
        assert_eq!(values.keys(), ["id", "name", "extra"]);
        assert_eq!(values.get("extra"), Some(""));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn semicolon_segment_is_rejected_rest_survives() {
        let (values, err) = QueryValues::parse("a=1;b=2");
        assert_eq!(err, Some(QueryError::Semicolon));
        assert!(values.is_empty());

        let (values, err) = QueryValues::parse("x=0&a=1;b=2&c=3");
        assert_eq!(err, Some(QueryError::Semicolon));
        assert_eq!(values.keys(), ["x", "c"]);
    }

    #[test]
    fn only_first_error_is_reported() {
        let (values, err) = QueryValues::parse("a=%zz&b;c&d=4");
        assert_eq!(err, Some(QueryError::Escape("%zz".into())));
        assert_eq!(values.keys(), ["d"]);
    }

    #[test]
    fn percent_and_plus_are_decoded() {
        let (values, err) = QueryValues::parse("first+name=J%C3%BCrgen&q=a%26b%3Dc");
        assert!(err.is_none());
        assert_eq!(values.get("first name"), Some("Jürgen"));
        assert_eq!(values.get("q"), Some("a&b=c"));
    }

    #[test]
    fn truncated_escape_and_bad_utf8_fail() {
        assert_eq!(QueryValues::parse("a=%4").1, Some(QueryError::Escape("%4".into())));
        assert_eq!(QueryValues::parse("a=%ff").1, Some(QueryError::Utf8));
    }

    #[test]
    fn empty_segments_are_skipped() {
        let (values, err) = QueryValues::parse("&&a=1&");
        assert!(err.is_none());
        assert_eq!(values.keys(), ["a"]);
        assert!(QueryValues::parse("").0.is_empty());
    }
}
