//! Ticket inventories.
//!
//! An [`Inventory`] is the set of tickets a client knows about, indexed by
//! category, by audience and by link. The authority resolver only reads
//! from it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use skiff_crypto::Did;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{TicketError, TicketResult};
use crate::ticket::{Category, Link, Ticket};

/// Resolves the proof links of a ticket.
pub trait ProofResolver: Send + Sync {
    /// The ticket's proof links, in order.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the ticket cannot be read.
    fn proof_links(&self, ticket: &Ticket) -> TicketResult<Vec<Link>>;
}

impl<F> ProofResolver for F
where
    F: Fn(&Ticket) -> TicketResult<Vec<Link>> + Send + Sync,
{
    fn proof_links(&self, ticket: &Ticket) -> TicketResult<Vec<Link>> {
        self(ticket)
    }
}

/// [`ProofResolver`] that decodes tokens with the ticket codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecProofResolver;

impl ProofResolver for CodecProofResolver {
    fn proof_links(&self, ticket: &Ticket) -> TicketResult<Vec<Link>> {
        codec::proof_links(ticket)
    }
}

/// A queryable collection of tickets.
pub trait Inventory: Send + Sync {
    /// Tickets in `category`, in insertion order.
    fn tickets_by_category(&self, category: Category) -> Vec<Ticket>;

    /// Tickets addressed to `audience`, in insertion order.
    fn tickets_by_audience(&self, audience: &Did) -> Vec<Ticket>;

    /// The ticket whose link is `link`.
    fn ticket_by_link(&self, link: &Link) -> Option<Ticket>;

    /// Follow proof links from `ticket` to its terminal ancestor.
    ///
    /// At each step the first proof present in the inventory is followed; a
    /// ticket with no resolvable proof is the root. A cycle yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::BrokenChain`] naming the ticket on the chain
    /// whose proofs could not be resolved.
    fn root_ticket(
        &self,
        ticket: &Ticket,
        resolver: &dyn ProofResolver,
    ) -> TicketResult<Option<Ticket>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = ticket.clone();

        loop {
            if !visited.insert(current.token.clone()) {
                warn!(
                    issuer = %current.issuer,
                    audience = %current.audience,
                    "proof chain contains a cycle, no root"
                );
                return Ok(None);
            }

            let links = resolver
                .proof_links(&current)
                .map_err(|e| TicketError::BrokenChain {
                    issuer: current.issuer.clone(),
                    audience: current.audience.clone(),
                    source: Box::new(e),
                })?;
            let parent = links
                .iter()
                .find_map(|link| self.ticket_by_link(link));

            match parent {
                Some(parent) => current = parent,
                None => {
                    debug!(root_issuer = %current.issuer, depth = visited.len(), "found root ticket");
                    return Ok(Some(current));
                },
            }
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    tickets: Vec<(Category, Ticket)>,
    by_link: HashMap<Link, usize>,
}

/// In-memory [`Inventory`].
///
/// Tickets are kept in insertion order; adding a ticket twice is a no-op.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    entries: RwLock<Entries>,
}

impl MemoryInventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ticket under `category`, returning its link.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the token is not base64url, or
    /// [`TicketError::Inventory`] if the lock is poisoned.
    pub fn add(&self, category: Category, ticket: Ticket) -> TicketResult<Link> {
        let link = codec::link_of(&ticket)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| TicketError::Inventory(e.to_string()))?;

        if !entries.by_link.contains_key(&link) {
            let index = entries.tickets.len();
            entries.tickets.push((category, ticket));
            entries.by_link.insert(link, index);
        }
        Ok(link)
    }

    /// Builder-style [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn with(self, category: Category, ticket: Ticket) -> TicketResult<Self> {
        self.add(category, ticket)?;
        Ok(self)
    }

    /// Number of tickets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.tickets.len())
    }

    /// Whether the inventory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, mut keep: impl FnMut(Category, &Ticket) -> bool) -> Vec<Ticket> {
        let Ok(entries) = self.entries.read() else {
            warn!("inventory lock poisoned, returning no tickets");
            return Vec::new();
        };
        entries
            .tickets
            .iter()
            .filter(|(category, ticket)| keep(*category, ticket))
            .map(|(_, ticket)| ticket.clone())
            .collect()
    }
}

impl Inventory for MemoryInventory {
    fn tickets_by_category(&self, category: Category) -> Vec<Ticket> {
        self.select(|c, _| c == category)
    }

    fn tickets_by_audience(&self, audience: &Did) -> Vec<Ticket> {
        self.select(|_, t| &t.audience == audience)
    }

    fn ticket_by_link(&self, link: &Link) -> Option<Ticket> {
        let entries = self.entries.read().ok()?;
        let index = *entries.by_link.get(link)?;
        entries.tickets.get(index).map(|(_, t)| t.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, Delegation};
    use skiff_crypto::{KeySigner, Signer};

    fn grant(from: &KeySigner, to: &Did, proofs: &[Link]) -> Ticket {
        Delegation::builder(to.clone())
            .capability(Capability::wildcard("did:key:zSpace"))
            .proofs(proofs.iter().copied())
            .sign(from)
            .unwrap()
            .to_ticket()
            .unwrap()
    }

    #[test]
    fn test_lookup_by_category_and_audience() {
        let account = KeySigner::generate();
        let agent = KeySigner::generate();
        let inventory = MemoryInventory::new();

        let t1 = grant(&account, agent.did(), &[]);
        let t2 = grant(&agent, account.did(), &[]);
        inventory.add(Category::Account, t1.clone()).unwrap();
        inventory.add(Category::Agent, t2.clone()).unwrap();
        inventory.add(Category::Agent, t2.clone()).unwrap();

        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.tickets_by_category(Category::Account), vec![t1.clone()]);
        assert_eq!(inventory.tickets_by_category(Category::Agent), vec![t2]);
        assert_eq!(inventory.tickets_by_audience(agent.did()), vec![t1.clone()]);

        let link = codec::link_of(&t1).unwrap();
        assert_eq!(inventory.ticket_by_link(&link), Some(t1));
    }

    #[test]
    fn test_root_walk_follows_chain() {
        let root_signer = KeySigner::generate();
        let middle = KeySigner::generate();
        let leaf = KeySigner::generate();

        let root = grant(&root_signer, middle.did(), &[]);
        let root_link = codec::link_of(&root).unwrap();
        let child = grant(&middle, leaf.did(), &[root_link]);

        let inventory = MemoryInventory::new()
            .with(Category::Account, root.clone())
            .unwrap()
            .with(Category::Agent, child.clone())
            .unwrap();

        let found = inventory.root_ticket(&child, &CodecProofResolver).unwrap();
        assert_eq!(found, Some(root.clone()));

        // A ticket with no resolvable proofs is its own root.
        let found = inventory.root_ticket(&root, &CodecProofResolver).unwrap();
        assert_eq!(found, Some(root));
    }

    #[test]
    fn test_root_walk_skips_unknown_proofs() {
        let signer = KeySigner::generate();
        let other = KeySigner::generate();
        let root = grant(&signer, other.did(), &[]);
        let root_link = codec::link_of(&root).unwrap();
        let missing = skiff_crypto::content_id(skiff_crypto::Codec::DagCbor, b"missing");
        let child = grant(&other, signer.did(), &[missing, root_link]);

        let inventory = MemoryInventory::new()
            .with(Category::Account, root.clone())
            .unwrap();
        assert_eq!(
            inventory.root_ticket(&child, &CodecProofResolver).unwrap(),
            Some(root)
        );
    }

    #[test]
    fn test_root_walk_detects_cycle() {
        let signer = KeySigner::generate();
        let a = grant(&signer, signer.did(), &[]);
        let b = grant(&signer, signer.did(), &[]);
        let link_a = codec::link_of(&a).unwrap();
        let link_b = codec::link_of(&b).unwrap();

        let inventory = MemoryInventory::new()
            .with(Category::Account, a.clone())
            .unwrap()
            .with(Category::Account, b.clone())
            .unwrap();

        // a -> b -> a, wired through a custom resolver.
        let (ta, tb) = (a.clone(), b.clone());
        let resolver = move |t: &Ticket| -> TicketResult<Vec<Link>> {
            if *t == ta {
                Ok(vec![link_b])
            } else if *t == tb {
                Ok(vec![link_a])
            } else {
                Ok(vec![])
            }
        };

        assert_eq!(inventory.root_ticket(&a, &resolver).unwrap(), None);
    }

    #[test]
    fn test_root_walk_propagates_decode_errors() {
        let bogus = Ticket::new(
            Did::parse("did:key:zA").unwrap(),
            Did::parse("did:key:zB").unwrap(),
            "AAAA".to_string(),
        );
        let inventory = MemoryInventory::new();
        assert!(matches!(
            inventory.root_ticket(&bogus, &CodecProofResolver),
            Err(TicketError::BrokenChain { ref source, .. }) if matches!(**source, TicketError::Decode(_))
        ));
    }

    #[test]
    fn test_broken_chain_names_failing_ancestor() {
        let root_signer = KeySigner::generate();
        let leaf = KeySigner::generate();
        let parent = grant(&root_signer, leaf.did(), &[]);
        let parent_link = codec::link_of(&parent).unwrap();
        let child = grant(&leaf, root_signer.did(), &[parent_link]);

        let inventory = MemoryInventory::new()
            .with(Category::Account, parent.clone())
            .unwrap();
        let failing = parent.clone();
        let resolver = move |t: &Ticket| -> TicketResult<Vec<Link>> {
            if *t == failing {
                Err(TicketError::Decode("truncated envelope".into()))
            } else {
                Ok(vec![parent_link])
            }
        };

        match inventory.root_ticket(&child, &resolver) {
            Err(TicketError::BrokenChain {
                issuer, audience, ..
            }) => {
                assert_eq!(issuer, parent.issuer);
                assert_eq!(audience, parent.audience);
                assert_ne!(issuer, child.issuer);
            },
            other => panic!("unexpected result {other:?}"),
        }
    }
}
