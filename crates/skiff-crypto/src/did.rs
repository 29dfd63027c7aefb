//! Decentralized identifiers.
//!
//! Only `did:key` identifiers over Ed25519 can be resolved to a public key.
//! Other methods (for example `did:web:web3.storage`) are carried as opaque
//! strings and compared by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;

/// Multicodec prefix for an Ed25519 public key (`0xed` as an unsigned varint).
const ED25519_PUB_PREFIX: [u8; 2] = [0xed, 0x01];

/// Multibase prefix for base58btc.
const BASE58BTC: char = 'z';

const DID_KEY_PREFIX: &str = "did:key:";

/// A validated decentralized identifier of the form `did:<method>:<id>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidDid`] if the string lacks the `did:` scheme,
    /// a method, or a method-specific identifier.
    pub fn parse(value: impl Into<String>) -> CryptoResult<Self> {
        let value = value.into();
        let mut parts = value.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();

        if scheme != "did" {
            return Err(CryptoError::InvalidDid(format!("missing did scheme: {value}")));
        }
        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !method_ok {
            return Err(CryptoError::InvalidDid(format!("bad method: {value}")));
        }
        if id.is_empty() {
            return Err(CryptoError::InvalidDid(format!("empty identifier: {value}")));
        }

        Ok(Self(value))
    }

    /// The `did:key` identifier of an Ed25519 public key.
    #[must_use]
    pub fn from_public_key(key: &PublicKey) -> Self {
        let mut bytes = Vec::with_capacity(34);
        bytes.extend_from_slice(&ED25519_PUB_PREFIX);
        bytes.extend_from_slice(key.as_bytes());
        Self(format!(
            "{DID_KEY_PREFIX}{BASE58BTC}{}",
            bs58::encode(bytes).into_string()
        ))
    }

    /// The full identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method, e.g. `key` or `web`.
    #[must_use]
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Whether this is a `did:key` identifier.
    #[must_use]
    pub fn is_key(&self) -> bool {
        self.0.starts_with(DID_KEY_PREFIX)
    }

    /// Resolve a `did:key` identifier to its Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidDid`] for other methods, non-base58btc
    /// encodings, or keys that are not Ed25519.
    pub fn public_key(&self) -> CryptoResult<PublicKey> {
        let encoded = self
            .0
            .strip_prefix(DID_KEY_PREFIX)
            .ok_or_else(|| CryptoError::InvalidDid(format!("not a did:key: {}", self.0)))?;
        let encoded = encoded.strip_prefix(BASE58BTC).ok_or_else(|| {
            CryptoError::InvalidDid(format!("unsupported multibase: {}", self.0))
        })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CryptoError::InvalidDid(format!("{}: {e}", self.0)))?;

        match bytes.split_at_checked(ED25519_PUB_PREFIX.len()) {
            Some((prefix, key)) if prefix == ED25519_PUB_PREFIX => PublicKey::try_from_slice(key),
            _ => Err(CryptoError::InvalidDid(format!(
                "not an ed25519 key: {}",
                self.0
            ))),
        }
    }
}

impl FromStr for Did {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}
