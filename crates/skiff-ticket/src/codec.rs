//! Ticket codec.
//!
//! Token format: base64url (unpadded) of a DAG-CBOR envelope
//!
//! ```text
//! { v, alg, sig, payload: { iss, aud, att: [{can, with}], prf: [CID], exp, nnc } }
//! ```
//!
//! The signature covers the DAG-CBOR encoding of `payload`. A delegation's
//! link is the CIDv1 (dag-cbor, sha2-256) of the envelope bytes, so it can
//! be computed without decoding.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use skiff_crypto::{Codec, Did, content_id};

use crate::capability::Capability;
use crate::delegation::{Delegation, Expiration};
use crate::error::{TicketError, TicketResult};
use crate::ticket::{Link, Ticket};

/// Envelope format version.
const TOKEN_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize)]
struct Payload {
    iss: Did,
    aud: Did,
    att: Vec<Capability>,
    prf: Vec<Link>,
    exp: Option<i64>,
    nnc: String,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: String,
    alg: String,
    #[serde(with = "serde_bytes")]
    sig: Vec<u8>,
    payload: Payload,
}

fn payload_of(delegation: &Delegation) -> Payload {
    Payload {
        iss: delegation.issuer.clone(),
        aud: delegation.audience.clone(),
        att: delegation.capabilities.clone(),
        prf: delegation.proofs.clone(),
        exp: delegation.expiration.to_wire(),
        nnc: delegation.nonce.clone(),
    }
}

fn to_dag_cbor<T: Serialize>(value: &T) -> TicketResult<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| TicketError::Encode(e.to_string()))
}

/// The bytes the issuer signs.
pub(crate) fn payload_bytes(delegation: &Delegation) -> TicketResult<Vec<u8>> {
    to_dag_cbor(&payload_of(delegation))
}

/// The full signed envelope.
pub(crate) fn envelope_bytes(delegation: &Delegation) -> TicketResult<Vec<u8>> {
    to_dag_cbor(&Envelope {
        v: TOKEN_VERSION.to_string(),
        alg: delegation.algorithm.clone(),
        sig: delegation.signature.clone(),
        payload: payload_of(delegation),
    })
}

/// Content identifier of encoded envelope bytes.
#[must_use]
pub fn cid_of(envelope: &[u8]) -> Link {
    content_id(Codec::DagCbor, envelope)
}

fn token_bytes(token: &str) -> TicketResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| TicketError::Decode(format!("token is not base64url: {e}")))
}

/// Decode a bare token.
///
/// # Errors
///
/// Returns [`TicketError::Decode`] if the token is not base64url, is not a
/// DAG-CBOR envelope, has an unknown version, or carries an empty signature.
pub fn decode_token(token: &str) -> TicketResult<Delegation> {
    let bytes = token_bytes(token)?;
    let envelope: Envelope = serde_ipld_dagcbor::from_slice(&bytes)
        .map_err(|e| TicketError::Decode(format!("malformed envelope: {e}")))?;

    if envelope.v != TOKEN_VERSION {
        return Err(TicketError::Decode(format!(
            "unsupported envelope version {}",
            envelope.v
        )));
    }
    if envelope.alg.is_empty() || envelope.sig.is_empty() {
        return Err(TicketError::Decode("missing signature".into()));
    }

    let Envelope {
        alg, sig, payload, ..
    } = envelope;
    Ok(Delegation {
        issuer: payload.iss,
        audience: payload.aud,
        capabilities: payload.att,
        proofs: payload.prf,
        expiration: Expiration::from_wire(payload.exp),
        nonce: payload.nnc,
        algorithm: alg,
        signature: sig,
        cid: cid_of(&bytes),
    })
}

/// Decode a ticket into its delegation.
///
/// The clear-text issuer and audience must agree with the signed payload.
///
/// # Errors
///
/// Returns [`TicketError::Decode`] if the token is malformed or disagrees
/// with the ticket header.
pub fn decode(ticket: &Ticket) -> TicketResult<Delegation> {
    let delegation = decode_token(&ticket.token)?;
    if delegation.issuer != ticket.issuer || delegation.audience != ticket.audience {
        return Err(TicketError::Decode(format!(
            "ticket header {} -> {} does not match token {} -> {}",
            ticket.issuer, ticket.audience, delegation.issuer, delegation.audience
        )));
    }
    Ok(delegation)
}

/// Encode a delegation into a ticket. Inverse of [`decode`].
///
/// # Errors
///
/// Returns [`TicketError::Encode`] if the envelope cannot be serialized.
pub fn encode(delegation: &Delegation) -> TicketResult<Ticket> {
    let bytes = envelope_bytes(delegation)?;
    Ok(Ticket::new(
        delegation.issuer.clone(),
        delegation.audience.clone(),
        URL_SAFE_NO_PAD.encode(bytes),
    ))
}

/// The ticket's own link, computed from the token bytes.
///
/// # Errors
///
/// Returns [`TicketError::Decode`] if the token is not base64url.
pub fn link_of(ticket: &Ticket) -> TicketResult<Link> {
    Ok(cid_of(&token_bytes(&ticket.token)?))
}

/// The proof links of a ticket.
///
/// # Errors
///
/// Returns [`TicketError::Decode`] if the ticket cannot be decoded.
pub fn proof_links(ticket: &Ticket) -> TicketResult<Vec<Link>> {
    Ok(decode(ticket)?.proofs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_crypto::{KeySigner, Signer};

    fn sample(signer: &KeySigner) -> Delegation {
        let proof = content_id(Codec::DagCbor, b"parent");
        Delegation::builder(Did::parse("did:key:zAudience").unwrap())
            .capability(Capability::wildcard("did:key:zSpace"))
            .capability(Capability::file_system("wnfs://did:key:zSpace/public/"))
            .proof(proof)
            .expiration(Expiration::At(1_900_000_000))
            .sign(signer)
            .unwrap()
    }

    #[test]
    fn test_decode_inverts_encode() {
        let signer = KeySigner::generate();
        let delegation = sample(&signer);

        let ticket = encode(&delegation).unwrap();
        assert_eq!(&ticket.issuer, signer.did());
        assert_eq!(ticket.audience.as_str(), "did:key:zAudience");

        let decoded = decode(&ticket).unwrap();
        assert_eq!(decoded, delegation);
        assert!(decoded.verify_signature().is_ok());
    }

    #[test]
    fn test_link_of_matches_decoded_link() {
        let signer = KeySigner::generate();
        let delegation = sample(&signer);
        let ticket = delegation.to_ticket().unwrap();

        let link = link_of(&ticket).unwrap();
        assert_eq!(&link, delegation.link());
        assert_eq!(link, link_of(&ticket).unwrap());
        assert_eq!(link.codec(), 0x71);
    }

    #[test]
    fn test_proof_links() {
        let signer = KeySigner::generate();
        let ticket = sample(&signer).to_ticket().unwrap();
        assert_eq!(
            proof_links(&ticket).unwrap(),
            vec![content_id(Codec::DagCbor, b"parent")]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let issuer = Did::parse("did:key:zIssuer").unwrap();
        let audience = Did::parse("did:key:zAudience").unwrap();

        for token in ["%%%", "", "aGVsbG8"] {
            let ticket = Ticket::new(issuer.clone(), audience.clone(), token.to_string());
            assert!(matches!(decode(&ticket), Err(TicketError::Decode(_))));
        }
    }

    #[test]
    fn test_decode_rejects_mismatched_header() {
        let signer = KeySigner::generate();
        let mut ticket = sample(&signer).to_ticket().unwrap();
        ticket.audience = Did::parse("did:key:zSomeoneElse").unwrap();

        assert!(matches!(decode(&ticket), Err(TicketError::Decode(_))));
        assert!(decode_token(&ticket.token).is_ok());
    }

    #[test]
    fn test_decode_rejects_unsigned_envelope() {
        let envelope = Envelope {
            v: TOKEN_VERSION.into(),
            alg: "EdDSA".into(),
            sig: Vec::new(),
            payload: Payload {
                iss: Did::parse("did:key:zIssuer").unwrap(),
                aud: Did::parse("did:key:zAudience").unwrap(),
                att: vec![],
                prf: vec![],
                exp: None,
                nnc: "n".into(),
            },
        };
        let token = URL_SAFE_NO_PAD.encode(to_dag_cbor(&envelope).unwrap());
        assert!(matches!(
            decode_token(&token),
            Err(TicketError::Decode(msg)) if msg.contains("signature")
        ));
    }
}
