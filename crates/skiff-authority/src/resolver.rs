//! Authority resolution.
//!
//! The resolver answers one question: does an identity hold `*` over some
//! space, as witnessed by the tickets in an [`Inventory`]? It keeps no state
//! about tickets and caches nothing; every call re-reads the inventory.
//! Tickets that fail to decode during a scan are skipped, logged and
//! counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use skiff_crypto::{Did, Signer};
use skiff_ticket::{
    Category, CodecProofResolver, Delegation, Inventory, Ticket, TicketError, codec,
};
use tracing::{debug, warn};

use crate::error::{AuthorityError, AuthorityResult};

/// Reason reported when no root proof is found.
pub const LACKING_AUTHORITY: &str = "Not authenticated yet, lacking authority.";

/// Outcome of [`Authority::has_sufficient_authority`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sufficiency {
    /// A root proof grants `*`.
    Sufficient,
    /// No qualifying root proof.
    Insufficient {
        /// Human-readable explanation.
        reason: String,
    },
}

impl Sufficiency {
    /// Whether authority suffices.
    #[must_use]
    pub fn suffices(&self) -> bool {
        matches!(self, Self::Sufficient)
    }

    /// The reason authority is lacking, if it is.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Sufficient => None,
            Self::Insufficient { reason } => Some(reason),
        }
    }
}

/// Polled authentication state for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityStatus {
    /// No root proof grants `*`.
    Unauthenticated,
    /// A root proof grants `*` over `space`.
    Authenticated {
        /// The resource of the root's primary capability.
        space: String,
        /// The account that issued the root proof.
        account: Did,
    },
}

/// Everything a remote invocation needs: who signs, over which space, with
/// which proofs. Recomputed on demand, never stored.
#[derive(Clone)]
pub struct InvocationConfig {
    /// The signer invoking on the space.
    pub issuer: Arc<dyn Signer>,
    /// The space DID.
    pub with: Did,
    /// The agent delegations proving the issuer's authority.
    pub proofs: Vec<Delegation>,
}

impl std::fmt::Debug for InvocationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationConfig")
            .field("issuer", self.issuer.did())
            .field("with", &self.with)
            .field("proofs", &self.proofs.len())
            .finish()
    }
}

/// The authority resolver.
#[derive(Debug, Default)]
pub struct Authority {
    undecodable: AtomicU64,
}

impl Authority {
    /// Create a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tickets skipped because they could not be decoded.
    #[must_use]
    pub fn undecodable_skips(&self) -> u64 {
        self.undecodable.load(Ordering::Relaxed)
    }

    fn skip(&self, ticket: &Ticket, error: &TicketError) {
        self.undecodable.fetch_add(1, Ordering::Relaxed);
        warn!(
            issuer = %ticket.issuer,
            audience = %ticket.audience,
            error = %error,
            "skipping undecodable ticket"
        );
    }

    fn skip_chain(&self, start: &Ticket, error: &TicketError) {
        self.undecodable.fetch_add(1, Ordering::Relaxed);
        warn!(
            chain_issuer = %start.issuer,
            chain_audience = %start.audience,
            error = %error,
            "skipping ticket whose proof chain does not resolve"
        );
    }

    fn decode_or_skip(&self, ticket: &Ticket) -> Option<Delegation> {
        codec::decode(ticket)
            .inspect_err(|e| self.skip(ticket, e))
            .ok()
    }

    /// Find the root proof granting `*` to `audience`.
    ///
    /// Tickets addressed to `audience` are tried in inventory order; for each
    /// the inventory's root ticket is decoded and accepted if its primary
    /// capability is `*`. The first accepted root is returned.
    #[doc(alias = "find_root_proof")]
    pub fn resolve(&self, audience: &Did, inventory: &dyn Inventory) -> Option<Ticket> {
        for ticket in inventory.tickets_by_audience(audience) {
            let root = match inventory.root_ticket(&ticket, &CodecProofResolver) {
                Ok(Some(root)) => root,
                Ok(None) => continue,
                Err(e) => {
                    self.skip_chain(&ticket, &e);
                    continue;
                },
            };

            if self
                .decode_or_skip(&root)
                .is_some_and(|d| d.grants_wildcard())
            {
                debug!(audience = %audience, root_issuer = %root.issuer, "resolved root proof");
                return Some(root);
            }
        }
        None
    }

    /// Whether `identity` currently holds sufficient authority.
    pub fn has_sufficient_authority(
        &self,
        identity: &Did,
        inventory: &dyn Inventory,
    ) -> Sufficiency {
        if self.resolve(identity, inventory).is_some() {
            Sufficiency::Sufficient
        } else {
            Sufficiency::Insufficient {
                reason: LACKING_AUTHORITY.to_string(),
            }
        }
    }

    /// Account tickets addressed to `identity` that directly grant `*`.
    ///
    /// Unlike [`resolve`](Self::resolve) this looks at the tickets
    /// themselves, not at the roots of their proof chains.
    pub fn provide_authority(&self, identity: &Did, inventory: &dyn Inventory) -> Vec<Ticket> {
        inventory
            .tickets_by_category(Category::Account)
            .into_iter()
            .filter(|t| &t.audience == identity)
            .filter(|t| {
                self.decode_or_skip(t)
                    .is_some_and(|d| d.grants_wildcard())
            })
            .collect()
    }

    /// The space DID: the resource of the first account ticket whose
    /// primary capability is `*`.
    ///
    /// # Errors
    ///
    /// [`AuthorityError::NoSpace`] if no account ticket qualifies (or its
    /// resource is not a DID), then [`AuthorityError::NoAgentDelegation`] if
    /// the inventory holds no agent tickets.
    pub fn resolve_space_did(&self, inventory: &dyn Inventory) -> AuthorityResult<Did> {
        let space = inventory
            .tickets_by_category(Category::Account)
            .iter()
            .filter_map(|t| self.decode_or_skip(t))
            .find_map(|d| match d.primary_capability() {
                Some(cap) if cap.is_wildcard() => Some(cap.with.clone()),
                _ => None,
            })
            .ok_or(AuthorityError::NoSpace)?;

        let space = Did::parse(space.as_str()).map_err(|e| {
            warn!(resource = %space, error = %e, "space resource is not a DID");
            AuthorityError::NoSpace
        })?;

        if inventory.tickets_by_category(Category::Agent).is_empty() {
            return Err(AuthorityError::NoAgentDelegation);
        }
        Ok(space)
    }

    /// Build the invocation configuration for `agent`.
    ///
    /// # Errors
    ///
    /// Configuration errors from [`resolve_space_did`](Self::resolve_space_did),
    /// or a decode error if any agent ticket cannot be decoded.
    pub fn configuration(
        &self,
        inventory: &dyn Inventory,
        agent: Arc<dyn Signer>,
    ) -> AuthorityResult<InvocationConfig> {
        let with = self.resolve_space_did(inventory)?;
        let proofs = inventory
            .tickets_by_category(Category::Agent)
            .iter()
            .map(codec::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InvocationConfig {
            issuer: agent,
            with,
            proofs,
        })
    }

    /// The account DID: the issuer of `identity`'s root proof.
    ///
    /// # Errors
    ///
    /// [`AuthorityError::ProofNotFound`] if there is no root proof.
    pub fn account_did(&self, identity: &Did, inventory: &dyn Inventory) -> AuthorityResult<Did> {
        self.resolve(identity, inventory)
            .map(|root| root.issuer)
            .ok_or_else(|| AuthorityError::ProofNotFound(identity.to_string()))
    }

    /// Current authentication state of `identity`.
    pub fn status(&self, identity: &Did, inventory: &dyn Inventory) -> AuthorityStatus {
        let Some(root) = self.resolve(identity, inventory) else {
            return AuthorityStatus::Unauthenticated;
        };
        match self
            .decode_or_skip(&root)
            .and_then(|d| d.primary_capability().map(|c| c.with.clone()))
        {
            Some(space) => AuthorityStatus::Authenticated {
                space,
                account: root.issuer,
            },
            None => AuthorityStatus::Unauthenticated,
        }
    }
}
