//! Challenge/response proof of possession over a participant's long-term
//! secp256k1 key.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::RngCore;

use crate::CryptoError;

/// Issues a fresh 32-byte random challenge for a joining participant.
pub fn issue_challenge() -> [u8; 32] {
    let mut challenge = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}

/// Client-side: `sig = ECDSA-secp256k1(challenge, private)`.
pub fn sign_challenge(signing_key: &SigningKey, challenge: &[u8; 32]) -> Vec<u8> {
    let signature: Signature = signing_key.sign(challenge);
    signature.to_der().as_bytes().to_vec()
}

/// Server-side: verifies the participant's response against the public key
/// they claim. A successful verification is what lets SessionCore mint a
/// session-bound `ParticipantId`.
pub fn verify_challenge_response(
    public_key_bytes: &[u8],
    challenge: &[u8; 32],
    signature_der: &[u8],
) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key_bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("bad public key: {e}")))?;
    let signature = Signature::from_der(signature_der)
        .map_err(|_| CryptoError::SignatureInvalid)?;

    verifying_key
        .verify(challenge, &signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

/// Signs an arbitrary payload with the participant's long-term key — the
/// same keypair used for the auth challenge also signs each
/// `EncryptedOperation`
pub fn sign_payload(signing_key: &SigningKey, payload: &[u8]) -> Vec<u8> {
    let signature: Signature = signing_key.sign(payload);
    signature.to_der().as_bytes().to_vec()
}

pub fn verify_payload_signature(
    public_key_bytes: &[u8],
    payload: &[u8],
    signature_der: &[u8],
) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key_bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("bad public key: {e}")))?;
    let signature = Signature::from_der(signature_der)
        .map_err(|_| CryptoError::SignatureInvalid)?;

    verifying_key
        .verify(payload, &signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn valid_response_verifies() {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = signing_key.verifying_key().to_sec1_bytes();

        let challenge = issue_challenge();
        let sig = sign_challenge(&signing_key, &challenge);

        assert!(verify_challenge_response(&public_key, &challenge, &sig).is_ok());
    }

    #[test]
    fn wrong_key_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let impostor_key = SigningKey::random(&mut OsRng);
        let public_key = signing_key.verifying_key().to_sec1_bytes();

        let challenge = issue_challenge();
        let sig = sign_challenge(&impostor_key, &challenge);

        assert!(verify_challenge_response(&public_key, &challenge, &sig).is_err());
    }

    #[test]
    fn tampered_challenge_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = signing_key.verifying_key().to_sec1_bytes();

        let challenge = issue_challenge();
        let sig = sign_challenge(&signing_key, &challenge);

        let mut other_challenge = challenge;
        other_challenge[0] ^= 0xFF;

        assert!(verify_challenge_response(&public_key, &other_challenge, &sig).is_err());
    }
}
