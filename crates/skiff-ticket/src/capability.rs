//! Capabilities: an action (`can`) over a resource URI (`with`).

use serde::{Deserialize, Serialize};

/// Unrestricted authority over the resource.
pub const WILDCARD: &str = "*";

/// File system authority scoped to a `wnfs://` path URI.
pub const FS_WILDCARD: &str = "fs/*";

/// URI scheme for file system resources.
pub const WNFS_SCHEME: &str = "wnfs://";

/// A single capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// The action, e.g. `*` or `fs/*`.
    pub can: String,
    /// The resource URI, e.g. a space DID or `wnfs://did:key:z.../private/`.
    pub with: String,
}

impl Capability {
    /// Create a capability.
    pub fn new(can: impl Into<String>, with: impl Into<String>) -> Self {
        Self {
            can: can.into(),
            with: with.into(),
        }
    }

    /// `*` over `with`.
    pub fn wildcard(with: impl Into<String>) -> Self {
        Self::new(WILDCARD, with)
    }

    /// `fs/*` over `with`.
    pub fn file_system(with: impl Into<String>) -> Self {
        Self::new(FS_WILDCARD, with)
    }

    /// Whether this grants unrestricted authority.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.can == WILDCARD
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.can, self.with)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard() {
        let cap = Capability::wildcard("did:key:zSpace");
        assert!(cap.is_wildcard());
        assert_eq!(cap.to_string(), "* on did:key:zSpace");
        assert!(!Capability::file_system("wnfs://did:key:z/").is_wildcard());
    }

    #[test]
    fn test_serde_field_names() {
        let cap = Capability::file_system("wnfs://did:key:zA/docs/");
        let json = serde_json::to_string(&cap).unwrap();
        assert_eq!(json, r#"{"can":"fs/*","with":"wnfs://did:key:zA/docs/"}"#);
    }
}
