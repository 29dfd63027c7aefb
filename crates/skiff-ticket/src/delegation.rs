//! Delegations - decoded, signed capability grants.
//!
//! A delegation names an issuer, an audience, an ordered list of
//! capabilities and the links of the delegations it was derived from.
//! Index 0 of the capability list is the primary capability.
//!
//! Delegations are built with [`DelegationBuilder`] and signed by any
//! [`Signer`]. The signature covers the DAG-CBOR payload; the content id
//! covers the whole signed envelope.

use chrono::{DateTime, Utc};
use skiff_crypto::{Did, Signer, verify_did_signature};
use uuid::Uuid;

use crate::capability::Capability;
use crate::codec;
use crate::error::TicketResult;
use crate::ticket::{Link, Ticket};

/// When a delegation stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Expiration {
    /// Valid forever.
    #[default]
    Never,
    /// Valid until this unix timestamp (seconds), exclusive.
    At(i64),
}

impl Expiration {
    /// Expire at a point in time.
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::At(time.timestamp())
    }

    pub(crate) fn to_wire(self) -> Option<i64> {
        match self {
            Self::Never => None,
            Self::At(secs) => Some(secs),
        }
    }

    pub(crate) fn from_wire(exp: Option<i64>) -> Self {
        exp.map_or(Self::Never, Self::At)
    }
}

/// A decoded delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub(crate) issuer: Did,
    pub(crate) audience: Did,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) proofs: Vec<Link>,
    pub(crate) expiration: Expiration,
    pub(crate) nonce: String,
    pub(crate) algorithm: String,
    pub(crate) signature: Vec<u8>,
    pub(crate) cid: Link,
}

impl Delegation {
    /// Start building a delegation to `audience`.
    #[must_use]
    pub fn builder(audience: Did) -> DelegationBuilder {
        DelegationBuilder::new(audience)
    }

    /// Who granted the capabilities.
    #[must_use]
    pub fn issuer(&self) -> &Did {
        &self.issuer
    }

    /// Who received them.
    #[must_use]
    pub fn audience(&self) -> &Did {
        &self.audience
    }

    /// The granted capabilities, primary first.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// The primary capability, if any.
    #[must_use]
    pub fn primary_capability(&self) -> Option<&Capability> {
        self.capabilities.first()
    }

    /// Whether the primary capability is `*`.
    #[must_use]
    pub fn grants_wildcard(&self) -> bool {
        self.primary_capability().is_some_and(Capability::is_wildcard)
    }

    /// Links of the delegations this one was derived from.
    #[must_use]
    pub fn proofs(&self) -> &[Link] {
        &self.proofs
    }

    /// Expiration.
    #[must_use]
    pub fn expiration(&self) -> Expiration {
        self.expiration
    }

    /// Issuance nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Signature algorithm, e.g. `EdDSA`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The delegation's own content identifier.
    #[must_use]
    pub fn link(&self) -> &Link {
        &self.cid
    }

    /// Whether the delegation has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the delegation is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Expiration::Never => false,
            Expiration::At(secs) => now.timestamp() >= secs,
        }
    }

    /// Verify the issuer's signature over the payload.
    ///
    /// Only `did:key` Ed25519 issuers can be verified locally.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the issuer cannot be resolved to a key or the
    /// signature does not match, and an encode error if the payload cannot be
    /// re-serialized.
    pub fn verify_signature(&self) -> TicketResult<()> {
        let payload = codec::payload_bytes(self)?;
        verify_did_signature(&self.issuer, &self.algorithm, &payload, &self.signature)?;
        Ok(())
    }

    /// Encode into a portable ticket.
    ///
    /// # Errors
    ///
    /// Returns an encode error if archival fails.
    pub fn to_ticket(&self) -> TicketResult<Ticket> {
        codec::encode(self)
    }
}

/// Fluent builder for [`Delegation`]s.
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    audience: Did,
    capabilities: Vec<Capability>,
    proofs: Vec<Link>,
    expiration: Expiration,
    nonce: Option<String>,
}

impl DelegationBuilder {
    /// Create a builder for a delegation to `audience`.
    #[must_use]
    pub fn new(audience: Did) -> Self {
        Self {
            audience,
            capabilities: Vec::new(),
            proofs: Vec::new(),
            expiration: Expiration::Never,
            nonce: None,
        }
    }

    /// Append a capability. The first one added is the primary capability.
    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Append several capabilities in order.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Append a proof link.
    #[must_use]
    pub fn proof(mut self, link: Link) -> Self {
        self.proofs.push(link);
        self
    }

    /// Append several proof links in order.
    #[must_use]
    pub fn proofs(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.proofs.extend(links);
        self
    }

    /// Set the expiration.
    #[must_use]
    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Use a fixed nonce instead of a random one.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sign with `signer`, who becomes the issuer.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if signing fails, or an encode error if the
    /// payload or envelope cannot be serialized.
    pub fn sign(self, signer: &dyn Signer) -> TicketResult<Delegation> {
        let mut delegation = Delegation {
            issuer: signer.did().clone(),
            audience: self.audience,
            capabilities: self.capabilities,
            proofs: self.proofs,
            expiration: self.expiration,
            nonce: self
                .nonce
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            algorithm: signer.signature_algorithm().to_string(),
            signature: Vec::new(),
            cid: codec::cid_of(&[]),
        };

        let payload = codec::payload_bytes(&delegation)?;
        delegation.signature = signer.sign(&payload)?;
        delegation.cid = codec::cid_of(&codec::envelope_bytes(&delegation)?);

        tracing::trace!(
            issuer = %delegation.issuer,
            audience = %delegation.audience,
            cid = %delegation.cid,
            "signed delegation"
        );
        Ok(delegation)
    }
}
