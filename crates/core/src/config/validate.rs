use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Translator thread count is at least 1
/// - Event inbox capacity is at least 1
/// - Lock timeout is positive and the stale threshold outlives a poll tick
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.translate.default_threads == 0 {
        return Err(ConfigError::ValidationError(
            "translate.default_threads must be at least 1".to_string(),
        ));
    }

    if config.events.inbox_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "events.inbox_capacity must be at least 1".to_string(),
        ));
    }

    if config.locks.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "locks.timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.locks.stale_after() <= config.locks.poll_interval() {
        return Err(ConfigError::ValidationError(
            "locks.stale_after_secs must exceed locks.poll_interval_ms".to_string(),
        ));
    }

    Ok(())
}
