//! Capability issuance.
//!
//! Every delegation issued here never expires.

use skiff_crypto::{Did, KeySigner, Signer};
use skiff_ticket::{
    Capability, Delegation, Expiration, FsPath, Ticket, TicketResult, WNFS_SCHEME, codec,
};
use tracing::debug;

use crate::error::{AuthorityError, AuthorityResult};

/// Grant `fs/*` over `path` of a brand new file system to `audience`.
///
/// The file system is identified by a single-use key pair generated here and
/// dropped after signing; the resulting ticket carries no proofs.
///
/// # Errors
///
/// Returns a ticket error if signing or encoding fails.
pub fn issue_file_system_origin(path: &FsPath, audience: &Did) -> AuthorityResult<Ticket> {
    let origin = KeySigner::generate();
    let resource = format!("{WNFS_SCHEME}{}{}", origin.did(), path.to_posix(true));
    debug!(origin = %origin.did(), resource = %resource, "issuing file system origin");

    let ticket = Delegation::builder(audience.clone())
        .capability(Capability::file_system(resource))
        .expiration(Expiration::Never)
        .sign(&origin)?
        .to_ticket()?;
    Ok(ticket)
}

/// Re-delegate `ticket`'s exact capabilities to `remote`, signed by
/// `identity`, with the original as the only proof.
///
/// # Errors
///
/// Returns a decode error if `ticket` cannot be decoded, or a ticket error
/// if signing fails.
pub fn delegate_ticket(
    ticket: &Ticket,
    identity: &dyn Signer,
    remote: &Did,
) -> AuthorityResult<Ticket> {
    let original = codec::decode(ticket)?;
    let delegated = Delegation::builder(remote.clone())
        .capabilities(original.capabilities().iter().cloned())
        .proof(*original.link())
        .expiration(Expiration::Never)
        .sign(identity)?
        .to_ticket()?;
    Ok(delegated)
}

/// Delegate `*` over the identity's resource to `agent`.
///
/// The resource is the primary capability's `with` of the first proof
/// addressed to `identity`. All `proofs` are attached.
///
/// # Errors
///
/// [`AuthorityError::ProofNotFound`] if no proof is addressed to the
/// identity, [`AuthorityError::EmptyCapabilities`] if that proof grants
/// nothing, and ticket errors from decoding or signing.
pub fn identity_to_agent_delegation(
    identity: &dyn Signer,
    agent: &Did,
    proofs: &[Ticket],
) -> AuthorityResult<Ticket> {
    let addressed = proofs
        .iter()
        .find(|t| &t.audience == identity.did())
        .ok_or_else(|| AuthorityError::ProofNotFound(identity.did().to_string()))?;

    let decoded = codec::decode(addressed)?;
    let resource = decoded
        .primary_capability()
        .map(|c| c.with.clone())
        .ok_or_else(|| AuthorityError::EmptyCapabilities(decoded.link().to_string()))?;

    let links = proofs
        .iter()
        .map(codec::link_of)
        .collect::<TicketResult<Vec<_>>>()?;

    let ticket = Delegation::builder(agent.clone())
        .capability(Capability::wildcard(resource))
        .proofs(links)
        .expiration(Expiration::Never)
        .sign(identity)?
        .to_ticket()?;
    Ok(ticket)
}

/// Matches tickets granting exactly `fs/*` over one file system path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTicketMatcher {
    expected: Capability,
}

impl FsTicketMatcher {
    /// The capability a matching ticket must contain.
    #[must_use]
    pub fn expected(&self) -> &Capability {
        &self.expected
    }

    /// Whether `ticket` contains the expected capability.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the ticket cannot be decoded.
    pub fn matches(&self, ticket: &Ticket) -> TicketResult<bool> {
        Ok(codec::decode(ticket)?
            .capabilities()
            .iter()
            .any(|c| c == &self.expected))
    }
}

/// Build a matcher for `fs/*` over `wnfs://<did>/<relative path>`.
///
/// Matching is exact string equality on the resource URI.
#[must_use]
pub fn matches_file_system_ticket(path: &FsPath, did: &Did) -> FsTicketMatcher {
    FsTicketMatcher {
        expected: Capability::file_system(format!("{WNFS_SCHEME}{did}/{}", path.to_posix(false))),
    }
}
