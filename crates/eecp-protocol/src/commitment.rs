use serde::{Deserialize, Serialize};

use crate::TimestampMillis;

/// `Commitment`: a publishable proof that a temporal key with the
/// given metadata existed and was later destroyed. The hash is computed by
/// `eecp_crypto::commitment::create_commitment`; this type is the pure data
/// shape shared between the crypto layer, the server's append-only log, and
/// the wire envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commitment {
    pub key_id: String,
    /// SHA-256(key || keyId || validFrom || validUntil).
    pub hash: [u8; 32],
    pub valid_from: TimestampMillis,
    pub valid_until: TimestampMillis,
    pub timestamp: TimestampMillis,
}
