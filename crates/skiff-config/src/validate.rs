//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for any timeout, one day.
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_gateway(config)?;
    validate_timeout("upload.timeout_secs", config.upload.timeout_secs)?;
    validate_depot(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_timeout(field: &str, secs: u64) -> ConfigResult<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(
            field,
            format!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}"),
        ));
    }
    Ok(())
}

fn validate_gateway(config: &Config) -> ConfigResult<()> {
    let g = &config.gateway;
    if !(g.url.starts_with("https://") || g.url.starts_with("http://")) {
        return Err(invalid(
            "gateway.url",
            format!("'{}' is not an http(s) URL", g.url),
        ));
    }
    validate_timeout("gateway.timeout_secs", g.timeout_secs)?;
    if g.max_block_size == 0 {
        return Err(invalid("gateway.max_block_size", "must be positive"));
    }
    Ok(())
}

fn validate_depot(config: &Config) -> ConfigResult<()> {
    let d = &config.depot;
    if d.namespace.is_empty() || d.namespace.contains('\0') || d.namespace.contains(':') {
        return Err(invalid(
            "depot.namespace",
            "must be non-empty and contain neither ':' nor NUL",
        ));
    }
    if d.store_path.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("depot.store_path", "must not be empty when set"));
    }
    validate_timeout("depot.fetch_timeout_secs", d.fetch_timeout_secs)
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }
    Ok(())
}
