//! Logging setup for voicelight applications
//!
//! Libraries in this workspace only emit `tracing` events. Applications pick
//! how they are rendered by calling one of the initializers here once, early.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Levels accepted by [`init_logging_with_level`]
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output, for applications that own the terminal
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose output with source locations
    Debug,
    /// One JSON object per line, for log collectors
    Json,
}

impl LoggingMode {
    fn default_level(self) -> &'static str {
        match self {
            LoggingMode::Silent => "off",
            LoggingMode::Development | LoggingMode::Json => "info",
            LoggingMode::Debug => "debug",
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),

    #[error("Invalid log level '{0}', expected one of error, warn, info, debug, trace")]
    InvalidLevel(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `VOICELIGHT_LOG_LEVEL`: filter directive, e.g. `debug` or `voice_state=trace`
/// - `RUST_LOG`: used when `VOICELIGHT_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    if mode == LoggingMode::Silent {
        return Ok(());
    }
    let filter = create_env_filter(mode.default_level())?;
    install(mode, filter)
}

/// Initialize logging with an explicit level, ignoring the environment
pub fn init_logging_with_level(mode: LoggingMode, level: &str) -> Result<(), LoggingError> {
    let level = validate_level(level)?;
    if mode == LoggingMode::Silent {
        return Ok(());
    }
    install(mode, EnvFilter::new(level))
}

/// Initialize logging from environment variables
///
/// Reads `VOICELIGHT_LOG_MODE`: "development", "debug" or "json". Anything
/// else, including unset, means silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_env(std::env::var("VOICELIGHT_LOG_MODE").ok().as_deref()))
}

fn mode_from_env(value: Option<&str>) -> LoggingMode {
    match value {
        Some("development") => LoggingMode::Development,
        Some("debug") => LoggingMode::Debug,
        Some("json") => LoggingMode::Json,
        _ => LoggingMode::Silent,
    }
}

/// Check a level name against [`LOG_LEVELS`], case-insensitively
pub fn validate_level(level: &str) -> Result<&'static str, LoggingError> {
    let lower = level.trim().to_ascii_lowercase();
    LOG_LEVELS
        .iter()
        .copied()
        .find(|known| *known == lower)
        .ok_or_else(|| LoggingError::InvalidLevel(level.to_string()))
}

fn install(mode: LoggingMode, filter: EnvFilter) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let result = match mode {
        LoggingMode::Silent => return Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            )
            .with(filter)
            .try_init(),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init(),
        LoggingMode::Json => Registry::default()
            .with(fmt::layer().json().with_current_span(false))
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Create an environment filter with fallback to default level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var("VOICELIGHT_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directive, e)))
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[test]
    fn test_mode_from_env() {
        assert_eq!(mode_from_env(Some("debug")), LoggingMode::Debug);
        assert_eq!(mode_from_env(Some("json")), LoggingMode::Json);
        assert_eq!(mode_from_env(Some("loud")), LoggingMode::Silent);
        assert_eq!(mode_from_env(None), LoggingMode::Silent);
    }

    #[test]
    fn test_validate_level() {
        assert_eq!(validate_level("WARN").unwrap(), "warn");
        assert_eq!(validate_level(" trace ").unwrap(), "trace");
        assert!(matches!(
            validate_level("verbose"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_silent_still_validates_level() {
        assert!(init_logging_with_level(LoggingMode::Silent, "info").is_ok());
        assert!(init_logging_with_level(LoggingMode::Silent, "loud").is_err());
    }
}
