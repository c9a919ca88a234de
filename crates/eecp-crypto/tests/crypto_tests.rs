use eecp_crypto::aead::{decrypt, encrypt};
use eecp_crypto::auth::{issue_challenge, sign_challenge, verify_challenge_response};
use eecp_crypto::commitment::create_commitment;
use eecp_crypto::ecies::encrypt_for_recipients;
use eecp_crypto::temporal::derive_key;
use eecp_protocol::ParticipantId;
use k256::ecdsa::SigningKey;
use rand_core::OsRng;

#[test]
fn full_lifecycle_rotate_encrypt_commit() {
    let secret = [3u8; 32];
    let key = derive_key(&secret, 0, 300_000, "key-0", 60_000).expect("derives");

    let sealed = encrypt(b"hello workspace", &key, Some(b"aad")).expect("encrypts");
    let opened = decrypt(&sealed, &key, Some(b"aad")).expect("decrypts");
    assert_eq!(opened, b"hello workspace");

    let mut dying_key = key;
    let commitment = create_commitment(&dying_key, 123_456);
    dying_key.destroy();

    assert_eq!(commitment.key_id, "key-0");
    assert_eq!(dying_key.key_bytes(), &[0u8; 32]);
}

#[test]
fn challenge_response_round_trip() {
    let signing_key = SigningKey::random(&mut OsRng);
    let public_key = signing_key.verifying_key().to_sec1_bytes();

    let challenge = issue_challenge();
    let signature = sign_challenge(&signing_key, &challenge);

    assert!(verify_challenge_response(&public_key, &challenge, &signature).is_ok());
}

#[test]
fn ecies_wraps_for_multiple_recipients_independently() {
    let secret = [9u8; 32];
    let alice = SigningKey::random(&mut OsRng);
    let bob = SigningKey::random(&mut OsRng);
    let alice_id = ParticipantId::new();
    let bob_id = ParticipantId::new();

    let wrapped = encrypt_for_recipients(
        &secret,
        &[
            (alice_id, alice.verifying_key().to_sec1_bytes().to_vec()),
            (bob_id, bob.verifying_key().to_sec1_bytes().to_vec()),
        ],
    )
    .expect("wraps");

    assert_eq!(wrapped.recipient_count(), 2);
}
