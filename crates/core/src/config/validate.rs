use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Provider domain and API token are present
/// - At least one worker may run
/// - Poll interval is not 0
/// - Page size is within the directory's accepted range
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.provider.domain.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "provider.domain cannot be empty".to_string(),
        ));
    }

    if config.provider.api_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "provider.api_token cannot be empty".to_string(),
        ));
    }

    if config.drill.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "drill.max_concurrent must be at least 1".to_string(),
        ));
    }

    if config.drill.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "drill.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if !(1..=200).contains(&config.directory.page_size) {
        return Err(ConfigError::ValidationError(format!(
            "directory.page_size must be between 1 and 200, got {}",
            config.directory.page_size
        )));
    }

    Ok(())
}
