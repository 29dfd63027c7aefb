#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for skiff.
//!
//! # Usage
//!
//! ```rust,no_run
//! use skiff_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("gateway: {}", resolved.config.gateway.url);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`SKIFF_*`)
//! 2. **Explicit file** passed to [`Config::load`]
//! 3. **User** (`~/.skiff/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other skiff crate. Library crates convert the
//! sections into their own option types behind their `config` feature.

use std::path::Path;

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

/// A loaded configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// The merged configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(&self.config).map_err(|e| ConfigError::ValidationError {
            field: "<root>".to_owned(),
            message: e.to_string(),
        })
    }
}

impl Config {
    /// Load with full precedence, reading `explicit` on top of the user file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load with `home_dir` standing in for `~/.skiff`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(explicit: Option<&Path>, home_dir: &Path) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(home_dir))
    }

    /// Load a single file, without layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_renders_toml() {
        let resolved = ResolvedConfig {
            config: Config::default(),
            field_sources: FieldSources::new(),
            loaded_files: Vec::new(),
        };
        let rendered = resolved.to_toml().unwrap();
        assert!(rendered.contains("[gateway]"));
        let back: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(back, Config::default());
    }
}
