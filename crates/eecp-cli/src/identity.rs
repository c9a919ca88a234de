use k256::ecdsa::SigningKey;
use k256::SecretKey;
use rand_core::OsRng;

/// A session's ephemeral secp256k1 identity: the same keypair signs auth
/// challenges and operations, and its private scalar is also what decrypts
/// the ECIES-wrapped workspace secret. The CLI has no notion of a
/// persistent user account — each run is a fresh participant.
pub struct Identity {
    pub secret_key: SecretKey,
    pub signing_key: SigningKey,
}

impl Identity {
    pub fn generate() -> Self {
        let secret_key = SecretKey::random(&mut OsRng);
        let signing_key = SigningKey::from(secret_key.clone());
        Self { secret_key, signing_key }
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_sec1_bytes().to_vec()
    }
}
