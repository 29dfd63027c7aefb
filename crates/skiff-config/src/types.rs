//! Configuration types.
//!
//! Nothing here depends on other skiff crates. Library crates mirror these
//! sections in their own option types and convert at the boundary. Every
//! section implements [`Default`] so a bare `[section]` header is a working
//! configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote block gateway.
    pub gateway: GatewaySection,
    /// Remote upload service.
    pub upload: UploadSection,
    /// Local block store and tracker.
    pub depot: DepotSection,
    /// Logging level, format and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// GatewaySection
// ---------------------------------------------------------------------------

/// Block gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Base URL; blocks are fetched from `{url}/ipfs/{cid}?format=raw`.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Largest block accepted from the gateway, in bytes.
    pub max_block_size: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            url: "https://w3s.link".to_owned(),
            timeout_secs: 30,
            max_block_size: 4_194_304,
        }
    }
}

// ---------------------------------------------------------------------------
// UploadSection
// ---------------------------------------------------------------------------

/// Upload service settings. The transport itself is supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Upper bound on one upload call, in seconds.
    pub timeout_secs: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

// ---------------------------------------------------------------------------
// DepotSection
// ---------------------------------------------------------------------------

/// Local depot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotSection {
    /// Prefix of the key-value namespaces used by the depot.
    pub namespace: String,
    /// Directory of the persistent store. `None` keeps blocks in memory.
    pub store_path: Option<String>,
    /// Upper bound on one gateway fetch, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for DepotSection {
    fn default() -> Self {
        Self {
            namespace: "skiff".to_owned(),
            store_path: None,
            fetch_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate directives (e.g. `["skiff_depot=debug", "hyper=warn"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
