//! Authority error types.

use skiff_ticket::TicketError;
use thiserror::Error;

/// Errors from resolving or issuing authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// No account ticket grants `*` over a space.
    #[error("configuration error: no space")]
    NoSpace,

    /// The inventory holds no agent tickets.
    #[error("configuration error: no agent delegation")]
    NoAgentDelegation,

    /// No proof is addressed to the given identity.
    #[error("no proof addressed to {0}")]
    ProofNotFound(String),

    /// A delegation carries no capabilities to build on.
    #[error("delegation {0} has no capabilities")]
    EmptyCapabilities(String),

    /// Decoding or issuing a ticket failed.
    #[error(transparent)]
    Ticket(#[from] TicketError),
}

impl AuthorityError {
    /// Whether this is a configuration error, i.e. the inventory does not
    /// yet hold enough tickets to act remotely.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::NoSpace | Self::NoAgentDelegation)
    }
}

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;
