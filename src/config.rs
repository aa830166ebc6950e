//! Runtime configuration for the facade crate.

use serde::Deserialize;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "WATERDOM_LOG";

/// Filter used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration of [`logging::init_with`](crate::logging::init_with).
///
/// Every field is optional in serialized form.
///
/// ```rust
/// use waterdom::config::LogConfig;
///
/// let config = LogConfig::from_json(r#"{ "filter": "waterdom_core=trace" }"#)?;
/// assert_eq!(config.filter, "waterdom_core=trace");
/// assert!(config.ansi);
/// # Ok::<(), waterdom::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, such as `info` or `waterdom_core=trace,warn`.
    pub filter: String,
    /// Emit ANSI colors.
    pub ansi: bool,
    /// Print the target of every event.
    pub with_target: bool,
    /// Log panics through `tracing` before the previous panic hook runs.
    pub capture_panics: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_LEVEL.to_string(),
            ansi: true,
            with_target: true,
            capture_panics: true,
        }
    }
}

/// Failure to read a [`LogConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document is malformed or has fields of the wrong type.
    #[error("invalid log configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl LogConfig {
    /// Defaults, with the filter taken from `WATERDOM_LOG` when it is set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_filter_var(std::env::var(LOG_ENV).ok())
    }

    fn from_filter_var(value: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = value.filter(|filter| !filter.trim().is_empty()) {
            config.filter = filter;
        }
        config
    }

    /// Parses a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document cannot be deserialized.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replaces the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}
