//! Skiff Telemetry - logging setup.
//!
//! This crate provides:
//! - [`LogConfig`] with pretty, compact, JSON and full formats
//! - Stdout, stderr or daily rolling file output
//! - A conversion from the `[logging]` config section behind the `config`
//!   feature
//!
//! # Example
//!
//! ```rust,no_run
//! use skiff_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), skiff_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("skiff_depot=debug");
//!
//! let _guard = setup_logging(&config)?;
//! tracing::info!("depot ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

#[cfg(feature = "config")]
mod bridge;
mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogGuard, LogTarget, setup_default_logging, setup_logging};
