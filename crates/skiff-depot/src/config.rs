//! Conversions from `skiff-config` sections.

use std::time::Duration;

use skiff_config::{Config, DepotSection, GatewaySection};

use crate::depot::DepotOptions;
use crate::gateway::GatewayConfig;

impl From<&GatewaySection> for GatewayConfig {
    fn from(section: &GatewaySection) -> Self {
        Self {
            url: section.url.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            max_block_size: section.max_block_size,
        }
    }
}

impl From<&Config> for DepotOptions {
    fn from(config: &Config) -> Self {
        let depot: &DepotSection = &config.depot;
        Self {
            namespace: depot.namespace.clone(),
            fetch_timeout: Duration::from_secs(depot.fetch_timeout_secs),
            upload_timeout: Duration::from_secs(config.upload.timeout_secs),
        }
    }
}
