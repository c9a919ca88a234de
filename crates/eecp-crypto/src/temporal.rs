//! HKDF-based derivation of per-window symmetric keys from a workspace
//! secret.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::CryptoError;

/// A symmetric key valid only during a specific time window. The raw
/// bytes are zeroized on drop; `destroy` performs the write-random-then-zero
/// erasure/ explicitly and is idempotent.
pub struct TemporalKey {
    pub id: String,
    key: [u8; 32],
    pub valid_from: i64,
    pub valid_until: i64,
    pub grace_period_end: i64,
}

impl TemporalKey {
    pub fn key_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Usable for encrypt only while `now < valid_until`.
    pub fn encrypt_valid_at(&self, now: i64) -> bool {
        now < self.valid_until
    }

    /// Usable for decrypt while `now < grace_period_end`.
    pub fn decrypt_valid_at(&self, now: i64) -> bool {
        now < self.grace_period_end
    }

    /// Overwrites the key buffer with random bytes, then zeros it. Calling
    /// this twice (or on an already-zeroed key) is safe — it just burns
    /// another round of randomness over already-dead bytes.
    pub fn destroy(&mut self) {
        rand::thread_rng().fill_bytes(&mut self.key);
        self.key.zeroize();
    }
}

impl Drop for TemporalKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for TemporalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalKey")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("valid_from", &self.valid_from)
            .field("valid_until", &self.valid_until)
            .field("grace_period_end", &self.grace_period_end)
            .finish()
    }
}

/// `deriveKey(secret, timeWindow, keyId) -> TemporalKey`.
///
/// HKDF-SHA256 with IKM = `secret`, salt = UTF-8 bytes of `key_id`, info =
/// 8-byte big-endian `start_time` || 8-byte big-endian `end_time`, length =
/// 32. Deterministic: identical inputs always yield byte-identical output.
pub fn derive_key(
    secret: &[u8; 32],
    start_time: i64,
    end_time: i64,
    key_id: &str,
    grace_period_ms: i64,
) -> Result<TemporalKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(key_id.as_bytes()), secret);

    let mut info = [0u8; 16];
    info[..8].copy_from_slice(&start_time.to_be_bytes());
    info[8..].copy_from_slice(&end_time.to_be_bytes());

    let mut okm = [0u8; 32];
    hk.expand(&info, &mut okm)
        .map_err(|_| CryptoError::InvalidKey("HKDF expand failed".into()))?;

    Ok(TemporalKey {
        id: key_id.to_string(),
        key: okm,
        valid_from: start_time,
        valid_until: end_time,
        grace_period_end: end_time + grace_period_ms,
    })
}

/// `getCurrentKeyId(createdAt, now, rotationInterval) -> "key-N"`.
/// `rotation_interval_min` is in minutes, per the `TimeWindow` convention.
pub fn current_key_id(created_at: i64, now: i64, rotation_interval_min: u32) -> String {
    if now <= created_at {
        return "key-0".to_string();
    }
    let interval_ms = rotation_interval_min as i64 * 60_000;
    let n = (now - created_at) / interval_ms;
    format!("key-{n}")
}

/// Parses `"key-N"` into `N`, or `None` if malformed.
pub fn parse_key_index(key_id: &str) -> Option<i64> {
    key_id.strip_prefix("key-")?.parse::<i64>().ok()
}

/// `isKeyValid(keyId, now, rotationInterval, gracePeriod)`. A
/// malformed `keyId` is not valid under any time.
pub fn is_key_valid(
    key_id: &str,
    now: i64,
    created_at: i64,
    rotation_interval_min: u32,
    grace_period_ms: i64,
) -> bool {
    let Some(n) = parse_key_index(key_id) else {
        return false;
    };
    if n < 0 {
        return false;
    }
    let interval_ms = rotation_interval_min as i64 * 60_000;
    let key_start = created_at + n * interval_ms;
    now >= key_start && now < key_start + interval_ms + grace_period_ms
}

/// Derives the `TemporalKey` that is current for `now`, given the
/// workspace's creation time and rotation parameters.
pub fn derive_current_key(
    secret: &[u8; 32],
    created_at: i64,
    now: i64,
    rotation_interval_min: u32,
    grace_period_ms: i64,
) -> Result<TemporalKey, CryptoError> {
    let id = current_key_id(created_at, now, rotation_interval_min);
    let n = parse_key_index(&id).ok_or_else(|| CryptoError::MalformedKeyId(id.clone()))?;
    let interval_ms = rotation_interval_min as i64 * 60_000;
    let start = created_at + n * interval_ms;
    let end = start + interval_ms;
    derive_key(secret, start, end, &id, grace_period_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let secret = [7u8; 32];
        let a = derive_key(&secret, 0, 300_000, "key-0", 60_000).unwrap();
        let b = derive_key(&secret, 0, 300_000, "key-0", 60_000).unwrap();
        assert_eq!(a.key_bytes(), b.key_bytes());
    }

    #[test]
    fn different_key_id_yields_different_bytes() {
        let secret = [7u8; 32];
        let a = derive_key(&secret, 0, 300_000, "key-0", 60_000).unwrap();
        let b = derive_key(&secret, 0, 300_000, "key-1", 60_000).unwrap();
        assert_ne!(a.key_bytes(), b.key_bytes());
    }

    #[test]
    fn different_secret_yields_different_bytes() {
        let a = derive_key(&[1u8; 32], 0, 300_000, "key-0", 60_000).unwrap();
        let b = derive_key(&[2u8; 32], 0, 300_000, "key-0", 60_000).unwrap();
        assert_ne!(a.key_bytes(), b.key_bytes());
    }

    #[test]
    fn rotation_boundary_advances_key_index() {
        let created_at = 1_000_000_000_000i64;
        let rotation_min = 5u32;

        assert_eq!(
            current_key_id(created_at, created_at + 300_000, rotation_min),
            "key-1"
        );
        assert_eq!(
            current_key_id(created_at, created_at + 299_999, rotation_min),
            "key-0"
        );
    }

    #[test]
    fn key_remains_decrypt_valid_through_grace() {
        let created_at = 0i64;
        let rotation_min = 5u32;
        let grace = 60_000i64;

        // key-0 covers [0, 300_000); decrypt-valid until 360_000.
        assert!(is_key_valid("key-0", 300_000, created_at, rotation_min, grace));
        assert!(is_key_valid("key-0", 359_999, created_at, rotation_min, grace));
        assert!(!is_key_valid("key-0", 360_000, created_at, rotation_min, grace));
    }

    #[test]
    fn malformed_key_id_is_never_valid() {
        assert!(!is_key_valid("nonsense", 0, 0, 5, 60_000));
        assert!(!is_key_valid("key-", 0, 0, 5, 60_000));
        assert!(!is_key_valid("key--1", 0, 0, 5, 60_000));
    }

    #[test]
    fn destroy_zeros_the_buffer() {
        let secret = [9u8; 32];
        let mut key = derive_key(&secret, 0, 300_000, "key-0", 60_000).unwrap();
        key.destroy();
        assert_eq!(key.key_bytes(), &[0u8; 32]);
        // idempotent
        key.destroy();
        assert_eq!(key.key_bytes(), &[0u8; 32]);
    }
}
