//! Router and server configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Environment variable read by [`Config::from_env`]: whole seconds.
pub const GRACE_PERIOD_ENV: &str = "EASYROUTE_GRACE_PERIOD_SECS";

/// Environment variable read by [`Config::from_env`]: bytes.
pub const MAX_BODY_SIZE_ENV: &str = "EASYROUTE_MAX_BODY_BYTES";

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);
const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Maps a business code to a client-facing message.
///
/// Consulted when rendering replies built from a bare code (`Reply::ok`,
/// `Reply::ok_code`, `Reply::error`, ...). Returning `None` keeps the
/// reply's default message. Replies built from a
/// [`BusinessError`](crate::BusinessError) always keep the error's message.
pub trait CodeMessager: Send + Sync {
    fn message(&self, code: i32) -> Option<String>;
}

impl<F> CodeMessager for F
where
    F: Fn(i32) -> Option<String> + Send + Sync,
{
    fn message(&self, code: i32) -> Option<String> {
        self(code)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected whole seconds, got `{value}`")]
    InvalidGracePeriod { var: &'static str, value: String },

    #[error("{var}: expected a byte count, got `{value}`")]
    InvalidMaxBodySize { var: &'static str, value: String },
}

/// Settings shared by a [`Router`](crate::Router) and the
/// [`Server`](crate::Server) that runs it.
///
/// ```rust
/// use std::time::Duration;
/// use easyroute::{Config, Router};
///
/// let config = Config::new()
///     .grace_period(Duration::from_secs(5))
///     .code_messager(|code: i32| (code == 404).then(|| "no such thing".to_owned()));
///
/// let app = Router::with_config(config);
/// ```
#[derive(Clone)]
pub struct Config {
    grace_period: Duration,
    max_body_size: usize,
    code_messager: Option<Arc<dyn CodeMessager>>,
}

impl Config {
    pub fn new() -> Self {
        Self { grace_period: DEFAULT_GRACE_PERIOD, max_body_size: DEFAULT_MAX_BODY_SIZE, code_messager: None }
    }

    /// Defaults, overridden by [`GRACE_PERIOD_ENV`] and [`MAX_BODY_SIZE_ENV`]
    /// when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        if let Some(value) = lookup(GRACE_PERIOD_ENV) {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidGracePeriod { var: GRACE_PERIOD_ENV, value })?;
            config.grace_period = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(MAX_BODY_SIZE_ENV) {
            config.max_body_size = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidMaxBodySize { var: MAX_BODY_SIZE_ENV, value })?;
        }
        Ok(config)
    }

    /// How long in-flight requests get to finish once shutdown starts.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Largest request body buffered for a handler, 4 MiB by default.
    /// Larger bodies are answered with `413 Payload Too Large`.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn code_messager(mut self, messager: impl CodeMessager + 'static) -> Self {
        self.code_messager = Some(Arc::new(messager));
        self
    }

    pub fn get_grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn get_max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub(crate) fn message_for(&self, code: i32) -> Option<String> {
        self.code_messager.as_ref()?.message(code)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("grace_period", &self.grace_period)
            .field("max_body_size", &self.max_body_size)
            .field("code_messager", &self.code_messager.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.get_grace_period(), Duration::from_secs(10));
        assert_eq!(config.get_max_body_size(), 4 * 1024 * 1024);
        assert_eq!(config.message_for(0), None);
    }

    #[test]
    fn grace_period_from_env() {
        let config = Config::from_lookup(|var| (var == GRACE_PERIOD_ENV).then(|| " 3 ".into())).unwrap();
        assert_eq!(config.get_grace_period(), Duration::from_secs(3));

        let err = Config::from_lookup(|var| (var == GRACE_PERIOD_ENV).then(|| "soon".into())).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn max_body_size_from_env() {
        let config = Config::from_lookup(|var| (var == MAX_BODY_SIZE_ENV).then(|| "1024".into())).unwrap();
        assert_eq!(config.get_max_body_size(), 1024);
        assert_eq!(config.get_grace_period(), Duration::from_secs(10));

        let err = Config::from_lookup(|var| (var == MAX_BODY_SIZE_ENV).then(|| "1MB".into())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxBodySize { .. }));
    }

    #[test]
    fn messager_is_consulted() {
        let config = Config::new().code_messager(|code: i32| (code == 7).then(|| "seven".to_owned()));
        assert_eq!(config.message_for(7).as_deref(), Some("seven"));
        assert_eq!(config.message_for(8), None);
    }
}
