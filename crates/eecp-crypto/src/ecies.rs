//! ECIES-wrap of the workspace secret to N recipient secp256k1 public keys.
//!
//! Entries are keyed by `ParticipantId` rather than carried as two parallel
//! id/key arrays, so lookup by recipient is O(1) and there's no ordering
//! correspondence to keep in sync — the key IS the correspondence.

use std::collections::HashMap;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use k256::ecdh::EphemeralSecret;
use k256::{PublicKey as EcPublicKey, SecretKey as EcSecretKey};
use rand::RngCore;
use rand_core::OsRng;
use sha2::Sha256;

use serde::{Deserialize, Serialize};

use eecp_protocol::ParticipantId;

use crate::CryptoError;

const ECIES_HKDF_INFO: &[u8] = b"eecp-ecies-v1";

/// A single recipient's ECIES-wrapped copy of the workspace secret. Carries
/// its own serde impl so the server can pack it into the wire envelope's
/// opaque `wrapped_secret` byte field without a bespoke encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedEntry {
    /// Compressed SEC1 ephemeral public key (33 bytes) used for this entry's ECDH.
    pub ephemeral_public_key: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; 12],
    pub auth_tag: [u8; 16],
}

/// `EncryptedMessage`, structured as a map from participant to wrapped entry.
#[derive(Debug, Clone, Default)]
pub struct EncryptedMessage {
    entries: HashMap<ParticipantId, WrappedEntry>,
}

impl EncryptedMessage {
    pub fn recipient_count(&self) -> usize {
        self.entries.len()
    }

    pub fn recipient_ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.entries.keys()
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&WrappedEntry> {
        self.entries.get(id)
    }

    /// Inserts a single entry, for reassembling an `EncryptedMessage` of one
    /// recipient's own wrapped entry received from the wire (a participant
    /// only ever sees its own entry, never the others').
    pub fn insert(&mut self, id: ParticipantId, entry: WrappedEntry) {
        self.entries.insert(id, entry);
    }
}

fn parse_public_key(bytes: &[u8]) -> Result<EcPublicKey, CryptoError> {
    EcPublicKey::from_sec1_bytes(bytes)
        .map_err(|e| CryptoError::EciesFailed(format!("invalid public key: {e}")))
}

fn aead_key_from_shared_secret(shared_secret: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    hk.expand(ECIES_HKDF_INFO, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// `encryptForRecipients(secret, [R1..Rn]) -> EncryptedMessage`.
/// Each recipient gets an independent ephemeral-ECDH-derived AEAD key, so
/// per-recipient secrecy holds by construction: there is no shared ephemeral
/// key for recipient j to reuse against recipient i's entry.
pub fn encrypt_for_recipients(
    secret: &[u8; 32],
    recipients: &[(ParticipantId, Vec<u8>)],
) -> Result<EncryptedMessage, CryptoError> {
    let mut entries = HashMap::with_capacity(recipients.len());

    for (id, public_key_bytes) in recipients {
        let recipient_public = parse_public_key(public_key_bytes)?;

        let ephemeral_secret = EphemeralSecret::random(&mut OsRng);
        let ephemeral_public = EcPublicKey::from(&ephemeral_secret);
        let shared_secret = ephemeral_secret.diffie_hellman(&recipient_public);
        let aead_key = aead_key_from_shared_secret(shared_secret.raw_secret_bytes().as_slice());

        let cipher = Aes256Gcm::new((&aead_key).into());
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, secret.as_slice())
            .map_err(|e| CryptoError::EciesFailed(e.to_string()))?;
        let tag_at = sealed.len() - 16;
        let mut auth_tag = [0u8; 16];
        auth_tag.copy_from_slice(&sealed[tag_at..]);

        entries.insert(
            *id,
            WrappedEntry {
                ephemeral_public_key: ephemeral_public.to_sec1_bytes().to_vec(),
                ciphertext: sealed[..tag_at].to_vec(),
                nonce: nonce_bytes,
                auth_tag,
            },
        );
    }

    Ok(EncryptedMessage { entries })
}

/// `decryptForRecipient(msg, recipient)` — locates the entry by id and
/// recovers the workspace secret using the recipient's long-term private
/// key. Fails with `RecipientNotFound` if `recipient_id` has no entry.
pub fn decrypt_for_recipient(
    msg: &EncryptedMessage,
    recipient_id: ParticipantId,
    recipient_private_key: &EcSecretKey,
) -> Result<[u8; 32], CryptoError> {
    let entry = msg
        .entries
        .get(&recipient_id)
        .ok_or(CryptoError::RecipientNotFound)?;

    let ephemeral_public = parse_public_key(&entry.ephemeral_public_key)?;
    let shared_secret = k256::ecdh::diffie_hellman(
        recipient_private_key.to_nonzero_scalar(),
        ephemeral_public.as_affine(),
    );
    let aead_key = aead_key_from_shared_secret(shared_secret.raw_secret_bytes().as_slice());

    let cipher = Aes256Gcm::new((&aead_key).into());
    let nonce = Nonce::from_slice(&entry.nonce);

    let mut full_ciphertext = entry.ciphertext.clone();
    full_ciphertext.extend_from_slice(&entry.auth_tag);

    let plaintext = cipher
        .decrypt(nonce, full_ciphertext.as_slice())
        .map_err(|_| CryptoError::AuthFailure)?;

    plaintext
        .try_into()
        .map_err(|_| CryptoError::EciesFailed("unexpected plaintext length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (EcSecretKey, Vec<u8>) {
        let secret = EcSecretKey::random(&mut OsRng);
        let public = secret.public_key().to_sec1_bytes().to_vec();
        (secret, public)
    }

    #[test]
    fn per_recipient_secrecy_is_isolated() {
        let workspace_secret = [42u8; 32];
        let (alice_sk, alice_pk) = keypair();
        let (bob_sk, bob_pk) = keypair();

        let alice_id = ParticipantId::new();
        let bob_id = ParticipantId::new();

        let msg = encrypt_for_recipients(
            &workspace_secret,
            &[(alice_id, alice_pk), (bob_id, bob_pk)],
        )
        .unwrap();

        assert_eq!(msg.recipient_count(), 2);

        let recovered_alice = decrypt_for_recipient(&msg, alice_id, &alice_sk).unwrap();
        assert_eq!(recovered_alice, workspace_secret);

        let recovered_bob = decrypt_for_recipient(&msg, bob_id, &bob_sk).unwrap();
        assert_eq!(recovered_bob, workspace_secret);

        // Bob's key cannot open Alice's entry id, and vice versa cannot
        // cross-decrypt because the lookup is keyed by id, not by trying
        // every key against every entry — but confirm cross-recipient
        // secrecy directly: Bob's key against Alice's actual ciphertext.
        assert!(decrypt_for_recipient(&msg, alice_id, &bob_sk).is_err());
    }

    #[test]
    fn unknown_recipient_fails() {
        let workspace_secret = [1u8; 32];
        let (alice_sk, alice_pk) = keypair();
        let alice_id = ParticipantId::new();
        let msg = encrypt_for_recipients(&workspace_secret, &[(alice_id, alice_pk)]).unwrap();

        let stranger = ParticipantId::new();
        assert!(matches!(
            decrypt_for_recipient(&msg, stranger, &alice_sk),
            Err(CryptoError::RecipientNotFound)
        ));
    }
}
