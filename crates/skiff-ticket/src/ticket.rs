//! Portable tickets.

use serde::{Deserialize, Serialize};
use skiff_crypto::{Cid, Did};

/// Content identifier of a delegation, used as a proof reference.
pub type Link = Cid;

/// A signed delegation in portable form.
///
/// `issuer` and `audience` are carried in the clear so inventories can
/// index tickets without decoding the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    /// Who granted the capabilities.
    pub issuer: Did,
    /// Who received them.
    pub audience: Did,
    /// The encoded delegation.
    pub token: String,
}

impl Ticket {
    /// Create a ticket.
    #[must_use]
    pub fn new(issuer: Did, audience: Did, token: String) -> Self {
        Self {
            issuer,
            audience,
            token,
        }
    }
}

/// Inventory category of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Tickets granting authority over an account's space.
    Account,
    /// Tickets delegating to the local agent.
    Agent,
}

impl Category {
    /// The category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
