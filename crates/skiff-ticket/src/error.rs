//! Ticket error types.

use skiff_crypto::{CryptoError, Did};
use thiserror::Error;

/// Errors from decoding, encoding or issuing tickets.
#[derive(Debug, Error)]
pub enum TicketError {
    /// The token is not a well-formed signed delegation.
    #[error("failed to decode ticket: {0}")]
    Decode(String),

    /// The delegation could not be archived into a token.
    #[error("failed to encode ticket: {0}")]
    Encode(String),

    /// The proofs of a ticket on a proof chain could not be read.
    #[error("proof chain broken at ticket {issuer} -> {audience}: {source}")]
    BrokenChain {
        /// Issuer of the ticket that failed.
        issuer: Did,
        /// Audience of the ticket that failed.
        audience: Did,
        /// Why its proofs could not be read.
        #[source]
        source: Box<TicketError>,
    },

    /// The inventory could not be updated.
    #[error("inventory unavailable: {0}")]
    Inventory(String),

    /// Signing or signature verification failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type for ticket operations.
pub type TicketResult<T> = Result<T, TicketError>;
