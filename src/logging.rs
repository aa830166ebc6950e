//! Installs a `tracing` subscriber for applications built on waterdom.
//!
//! Installation is idempotent. The filter comes from [`LogConfig`], which reads
//! `WATERDOM_LOG` in [`init`] and [`try_init`].

use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{DEFAULT_LOG_LEVEL, LogConfig};

static TRACING_INSTALLED: Once = Once::new();
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Installs the subscriber configured from the environment.
pub fn init() {
    init_with(&LogConfig::from_env());
}

/// Installs the subscriber configured from the environment, reporting failure.
///
/// # Errors
///
/// Fails if another global subscriber is already installed.
pub fn try_init() -> Result<(), TryInitError> {
    try_init_with(&LogConfig::from_env())
}

/// Installs the subscriber described by `config` (idempotent).
pub fn init_with(config: &LogConfig) {
    TRACING_INSTALLED.call_once(|| {
        if let Err(error) = try_init_with(config) {
            eprintln!("waterdom tracing failed to initialize: {error}");
        }
    });
}

/// Installs the subscriber described by `config`.
///
/// # Errors
///
/// Fails if another global subscriber is already installed.
pub fn try_init_with(config: &LogConfig) -> Result<(), TryInitError> {
    let console = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_filter(filter(config));
    tracing_subscriber::registry().with(console).try_init()?;
    if config.capture_panics {
        install_panic_hook();
    }
    Ok(())
}

fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_new(&config.filter).unwrap_or_else(|error| {
        eprintln!(
            "invalid log filter `{}` ({error}), using `{DEFAULT_LOG_LEVEL}`",
            config.filter
        );
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    })
}

/// Logs panics through `tracing`, then runs the previous hook (idempotent).
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "waterdom::panic", message = %panic_message(info), location = ?info.location());
            previous(info);
        }));
    });
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directives_fall_back_to_the_default_level() {
        let config = LogConfig::default().with_filter("waterdom_core=loud");
        assert_eq!(filter(&config).to_string(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn repeated_installation_is_harmless() {
        let config = LogConfig {
            capture_panics: false,
            ..LogConfig::default()
        };
        init_with(&config);
        init_with(&config);
        assert!(try_init_with(&config).is_err());
    }
}
