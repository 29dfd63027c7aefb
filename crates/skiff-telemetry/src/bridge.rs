//! Conversion from the `[logging]` config section.

use skiff_config::LoggingSection;

use crate::error::TelemetryError;
use crate::logging::LogConfig;

impl TryFrom<&LoggingSection> for LogConfig {
    type Error = TelemetryError;

    fn try_from(section: &LoggingSection) -> Result<Self, Self::Error> {
        let mut config = LogConfig::new(section.level.clone()).with_format(section.format.parse()?);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }
}

impl LogConfig {
    /// Build from a `[logging]` section, keeping the default target.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] for an unknown format.
    pub fn from_section(section: &LoggingSection) -> Result<Self, TelemetryError> {
        Self::try_from(section)
    }
}
