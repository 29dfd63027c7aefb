//! Commonly used types.
//!
//! ```rust,no_run
//! use skiff_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! let _guard = setup_logging(&LogConfig::new("debug").with_format(LogFormat::Json))?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

pub use crate::{TelemetryError, TelemetryResult};

pub use crate::{LogConfig, LogFormat, LogGuard, LogTarget};

pub use crate::{setup_default_logging, setup_logging};
