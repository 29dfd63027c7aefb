//! Signing principals.
//!
//! A [`Signer`] is anything that has a DID and can sign bytes. Local key
//! pairs implement it through [`KeySigner`]; host-provided signers (a
//! hardware wallet, a remote agent) plug in through [`FnSigner`].

use std::fmt;
use std::sync::Arc;

use crate::did::Did;
use crate::error::{CryptoError, CryptoResult};
use crate::keypair::KeyPair;
use crate::signature::Signature;

/// JWS algorithm name for Ed25519 signatures.
pub const EDDSA: &str = "EdDSA";

/// A principal able to sign on behalf of its DID.
pub trait Signer: Send + Sync {
    /// The identifier this signer speaks for.
    fn did(&self) -> &Did;

    /// The signature algorithm name, e.g. [`EDDSA`].
    fn signature_algorithm(&self) -> &str;

    /// Sign a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the signer cannot produce a signature.
    fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// A [`Signer`] backed by a local Ed25519 key pair.
pub struct KeySigner {
    keypair: KeyPair,
    did: Did,
}

impl KeySigner {
    /// Generate a signer with a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_keypair(KeyPair::generate())
    }

    /// Wrap an existing key pair.
    #[must_use]
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let did = keypair.did();
        Self { keypair, did }
    }

    /// The underlying key pair.
    #[must_use]
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

impl Signer for KeySigner {
    fn did(&self) -> &Did {
        &self.did
    }

    fn signature_algorithm(&self) -> &str {
        EDDSA
    }

    fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.keypair.sign(message).to_vec())
    }
}

impl fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySigner").field("did", &self.did).finish()
    }
}

type SignFn = dyn Fn(&[u8]) -> CryptoResult<Vec<u8>> + Send + Sync;

/// A [`Signer`] that delegates to a closure.
#[derive(Clone)]
pub struct FnSigner {
    did: Did,
    algorithm: String,
    sign: Arc<SignFn>,
}

impl FnSigner {
    /// Create a signer from a DID, an algorithm name and a signing closure.
    pub fn new<F>(did: Did, algorithm: impl Into<String>, sign: F) -> Self
    where
        F: Fn(&[u8]) -> CryptoResult<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            did,
            algorithm: algorithm.into(),
            sign: Arc::new(sign),
        }
    }

    /// A signer that signs with `keypair` but claims to speak for `did`.
    ///
    /// Used when a key acts under an identifier it does not derive, such as
    /// an agent key answering for a `did:web` principal.
    #[must_use]
    pub fn with_did(did: Did, keypair: Arc<KeyPair>) -> Self {
        Self::new(did, EDDSA, move |message| Ok(keypair.sign(message).to_vec()))
    }
}

impl Signer for FnSigner {
    fn did(&self) -> &Did {
        &self.did
    }

    fn signature_algorithm(&self) -> &str {
        &self.algorithm
    }

    fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        (self.sign)(message)
    }
}

impl fmt::Debug for FnSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSigner")
            .field("did", &self.did)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Verify a signature made by the key behind `did`.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] for anything but [`EDDSA`],
/// [`CryptoError::InvalidDid`] if `did` does not resolve to a key, and
/// [`CryptoError::SignatureVerificationFailed`] on a bad signature.
pub fn verify_did_signature(
    did: &Did,
    algorithm: &str,
    message: &[u8],
    signature: &[u8],
) -> CryptoResult<()> {
    if algorithm != EDDSA {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    let key = did.public_key()?;
    let signature = Signature::try_from_slice(signature)?;
    key.verify(message, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_signer_verifies() {
        let signer = KeySigner::generate();
        let sig = signer.sign(b"hello").unwrap();

        assert!(verify_did_signature(signer.did(), EDDSA, b"hello", &sig).is_ok());
        assert!(verify_did_signature(signer.did(), EDDSA, b"bye", &sig).is_err());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let signer = KeySigner::generate();
        let sig = signer.sign(b"hello").unwrap();

        assert!(matches!(
            verify_did_signature(signer.did(), "ES256", b"hello", &sig),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_fn_signer_delegates() {
        let keypair = Arc::new(KeyPair::generate());
        let did = keypair.did();
        let signer = FnSigner::with_did(did.clone(), Arc::clone(&keypair));

        assert_eq!(signer.did(), &did);
        let sig = signer.sign(b"abc").unwrap();
        assert!(verify_did_signature(&did, EDDSA, b"abc", &sig).is_ok());
    }

    #[test]
    fn test_fn_signer_failure_propagates() {
        let did = Did::parse("did:web:example.com").unwrap();
        let signer = FnSigner::new(did, EDDSA, |_| {
            Err(CryptoError::SignerUnavailable("locked".into()))
        });

        assert!(matches!(
            signer.sign(b"x"),
            Err(CryptoError::SignerUnavailable(_))
        ));
    }
}
