//! Ticket fixtures.

use std::sync::Arc;

use skiff_authority::identity_to_agent_delegation;
use skiff_crypto::{Did, KeySigner, Signer};
use skiff_ticket::{
    Capability, Category, Delegation, Expiration, Link, MemoryInventory, Ticket, codec,
};

/// Sign a ticket granting `capability` to `audience` with the given proofs.
///
/// # Panics
///
/// Panics if signing or encoding fails.
#[must_use]
pub fn test_ticket(
    issuer: &dyn Signer,
    audience: &Did,
    capability: Capability,
    proofs: &[Link],
) -> Ticket {
    Delegation::builder(audience.clone())
        .capability(capability)
        .proofs(proofs.iter().copied())
        .expiration(Expiration::Never)
        .sign(issuer)
        .and_then(|d| d.to_ticket())
        .unwrap_or_else(|e| panic!("failed to mint test ticket: {e}"))
}

/// A ticket whose token does not decode.
#[must_use]
pub fn garbage_ticket(audience: &Did) -> Ticket {
    Ticket::new(
        KeySigner::generate().did().clone(),
        audience.clone(),
        "bm90IGEgdGlja2V0".to_string(),
    )
}

/// A space, the account that owns it, and an agent acting for the account.
#[derive(Debug)]
pub struct SpaceFixture {
    /// Signer whose DID names the space.
    pub space: KeySigner,
    /// The account holding `*` over the space.
    pub account: KeySigner,
    /// The agent device.
    pub agent: Arc<KeySigner>,
}

impl Default for SpaceFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaceFixture {
    /// Fresh keys for all three parties.
    #[must_use]
    pub fn new() -> Self {
        Self {
            space: KeySigner::generate(),
            account: KeySigner::generate(),
            agent: Arc::new(KeySigner::generate()),
        }
    }

    /// The space DID.
    #[must_use]
    pub fn space_did(&self) -> &Did {
        self.space.did()
    }

    /// The agent DID.
    #[must_use]
    pub fn agent_did(&self) -> &Did {
        self.agent.did()
    }

    /// The agent as a shareable signer.
    #[must_use]
    pub fn agent_signer(&self) -> Arc<dyn Signer> {
        Arc::clone(&self.agent) as Arc<dyn Signer>
    }

    /// The space's grant of `*` to the account.
    #[must_use]
    pub fn account_ticket(&self) -> Ticket {
        test_ticket(
            &self.space,
            self.account.did(),
            Capability::wildcard(self.space_did().as_str()),
            &[],
        )
    }

    /// The account's delegation of `*` to the agent, with the account
    /// ticket as proof.
    ///
    /// # Panics
    ///
    /// Panics if issuing fails.
    #[must_use]
    pub fn agent_ticket(&self, account_ticket: &Ticket) -> Ticket {
        identity_to_agent_delegation(
            &self.account,
            self.agent_did(),
            std::slice::from_ref(account_ticket),
        )
        .unwrap_or_else(|e| panic!("failed to delegate to agent: {e}"))
    }

    /// An inventory where the agent holds authority over the space.
    ///
    /// # Panics
    ///
    /// Panics if a ticket cannot be added.
    #[must_use]
    pub fn authorized_inventory(&self) -> MemoryInventory {
        let account = self.account_ticket();
        let agent = self.agent_ticket(&account);
        let inventory = MemoryInventory::new();
        for (category, ticket) in [(Category::Account, account), (Category::Agent, agent)] {
            inventory
                .add(category, ticket)
                .unwrap_or_else(|e| panic!("failed to add ticket: {e}"));
        }
        inventory
    }

    /// An inventory with the account ticket only.
    ///
    /// # Panics
    ///
    /// Panics if the ticket cannot be added.
    #[must_use]
    pub fn account_only_inventory(&self) -> MemoryInventory {
        let inventory = MemoryInventory::new();
        inventory
            .add(Category::Account, self.account_ticket())
            .unwrap_or_else(|e| panic!("failed to add ticket: {e}"));
        inventory
    }

    /// The link of `ticket`.
    ///
    /// # Panics
    ///
    /// Panics if the token does not decode.
    #[must_use]
    pub fn link(ticket: &Ticket) -> Link {
        codec::link_of(ticket).unwrap_or_else(|e| panic!("undecodable ticket: {e}"))
    }
}
