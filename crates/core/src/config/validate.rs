use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0 and uploads are allowed at all
/// - At least one conversion may run at a time
/// - Engine timeout is positive and JPEG quality is within 1-100
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if config.server.max_upload_mb == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_upload_mb must be greater than 0".to_string(),
        ));
    }

    // Workspace validation
    if config.workspace.max_parallel_conversions == 0 {
        return Err(ConfigError::ValidationError(
            "workspace.max_parallel_conversions must be greater than 0".to_string(),
        ));
    }

    // Engine validation
    if config.engines.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engines.timeout_secs must be greater than 0".to_string(),
        ));
    }
    if !(1..=100).contains(&config.engines.jpeg_quality) {
        return Err(ConfigError::ValidationError(format!(
            "engines.jpeg_quality must be between 1 and 100, got {}",
            config.engines.jpeg_quality
        )));
    }

    Ok(())
}
