//! AEAD encrypt/decrypt bound to a temporal key id, with optional
//! caller-supplied associated data.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;

use crate::temporal::TemporalKey;
use crate::CryptoError;

/// Result of `encrypt`: the four wire fields this AEAD contract exposes.
#[derive(Debug, Clone)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; 12],
    pub auth_tag: [u8; 16],
    pub key_id: String,
}

fn build_aad(key_id: &str, caller_aad: Option<&[u8]>) -> Vec<u8> {
    let mut aad = key_id.as_bytes().to_vec();
    if let Some(extra) = caller_aad {
        aad.extend_from_slice(extra);
    }
    aad
}

/// `encrypt(plaintext, TemporalKey, aad?) -> {ciphertext, nonce, authTag, keyId}`.
/// Fails only if the key is past its `valid_until` (caller's responsibility
/// to check via `TemporalKey::encrypt_valid_at` before calling — this
/// function does not re-check the clock so it stays a pure function of its
/// inputs).
pub fn encrypt(
    plaintext: &[u8],
    key: &TemporalKey,
    aad: Option<&[u8]>,
) -> Result<SealedPayload, CryptoError> {
    let cipher = Aes256Gcm::new(key.key_bytes().into());

    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let associated_data = build_aad(&key.id, aad);
    let sealed = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &associated_data,
            },
        )
        .map_err(|_| CryptoError::InvalidKey("AEAD seal failed".into()))?;

    // AES-256-GCM appends a 16-byte tag; split it off so the wire format
    // matches the explicit {ciphertext, nonce, authTag} triple.
    let tag_at = sealed.len() - 16;
    let mut auth_tag = [0u8; 16];
    auth_tag.copy_from_slice(&sealed[tag_at..]);

    Ok(SealedPayload {
        ciphertext: sealed[..tag_at].to_vec(),
        nonce: nonce_bytes,
        auth_tag,
        key_id: key.id.clone(),
    })
}

/// `decrypt(payload, TemporalKey, aad?) -> plaintext`. Returns
/// `KeyIdMismatch` if `payload.key_id != key.id`, `AuthFailure` if GCM
/// verification fails.
pub fn decrypt(
    payload: &SealedPayload,
    key: &TemporalKey,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    if payload.key_id != key.id {
        return Err(CryptoError::KeyIdMismatch);
    }

    let cipher = Aes256Gcm::new(key.key_bytes().into());
    let nonce = Nonce::from_slice(&payload.nonce);

    let mut full_ciphertext = payload.ciphertext.clone();
    full_ciphertext.extend_from_slice(&payload.auth_tag);

    let associated_data = build_aad(&key.id, aad);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &full_ciphertext,
                aad: &associated_data,
            },
        )
        .map_err(|_| CryptoError::AuthFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::derive_key;

    fn test_key() -> TemporalKey {
        derive_key(&[3u8; 32], 0, 300_000, "key-0", 60_000).unwrap()
    }

    #[test]
    fn round_trip() {
        let key = test_key();
        let plaintext = b"Hello World";
        let sealed = encrypt(plaintext, &key, None).unwrap();
        let recovered = decrypt(&sealed, &key, None).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn round_trip_with_aad() {
        let key = test_key();
        let aad = b"workspace-42";
        let sealed = encrypt(b"payload", &key, Some(aad)).unwrap();
        assert_eq!(decrypt(&sealed, &key, Some(aad)).unwrap(), b"payload");
        assert!(matches!(
            decrypt(&sealed, &key, Some(b"wrong-aad")),
            Err(CryptoError::AuthFailure)
        ));
    }

    #[test]
    fn tamper_detection_fails_auth() {
        let key = test_key();
        let mut sealed = encrypt(b"tamper me", &key, None).unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(matches!(decrypt(&sealed, &key, None), Err(CryptoError::AuthFailure)));
    }

    #[test]
    fn tamper_nonce_and_tag() {
        let key = test_key();
        let base = encrypt(b"data", &key, None).unwrap();

        let mut bad_nonce = base.clone();
        bad_nonce.nonce[0] ^= 0x01;
        assert!(matches!(decrypt(&bad_nonce, &key, None), Err(CryptoError::AuthFailure)));

        let mut bad_tag = base.clone();
        bad_tag.auth_tag[0] ^= 0x01;
        assert!(matches!(decrypt(&bad_tag, &key, None), Err(CryptoError::AuthFailure)));
    }

    #[test]
    fn key_id_mismatch() {
        let key = test_key();
        let other = derive_key(&[3u8; 32], 300_000, 600_000, "key-1", 60_000).unwrap();
        let sealed = encrypt(b"data", &key, None).unwrap();
        assert!(matches!(decrypt(&sealed, &other, None), Err(CryptoError::KeyIdMismatch)));
    }
}
