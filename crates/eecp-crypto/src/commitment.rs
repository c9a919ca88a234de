//! Publishable hash commitments proving a temporal key existed and was
//! later destroyed.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use eecp_protocol::{Commitment, TimestampMillis};

use crate::temporal::TemporalKey;

/// `createCommitment(TemporalKey) -> Commitment`. Pure function of the
/// key's bytes and metadata; call before `TemporalKey::destroy` zeroes the
/// buffer. `hash = SHA-256(key || keyId || validFrom || validUntil)`.
pub fn create_commitment(key: &TemporalKey, timestamp: TimestampMillis) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(key.key_bytes());
    hasher.update(key.id.as_bytes());
    hasher.update(key.valid_from.to_be_bytes());
    hasher.update(key.valid_until.to_be_bytes());
    let hash: [u8; 32] = hasher.finalize().into();

    Commitment {
        key_id: key.id.clone(),
        hash,
        valid_from: key.valid_from,
        valid_until: key.valid_until,
        timestamp,
    }
}

/// `verifyCommitment(c, keyId, validFrom, validUntil) -> bool`: true iff
/// all four fields match `c`. This does not (and cannot) re-derive the
/// hash without the destroyed key; it checks the commitment's own claimed
/// metadata against what the caller expects to have happened.
pub fn verify_commitment(
    c: &Commitment,
    key_id: &str,
    valid_from: TimestampMillis,
    valid_until: TimestampMillis,
) -> bool {
    c.key_id == key_id && c.valid_from == valid_from && c.valid_until == valid_until
}

/// Append-only log of published commitments, keyed by `keyId` for lookup.
/// Entries are never removed, even after the referenced key is destroyed —
/// the commitment outlives the key by design.
#[derive(Debug, Default)]
pub struct CommitmentLog {
    by_key_id: HashMap<String, Commitment>,
    order: Vec<String>,
}

impl CommitmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `publishCommitment(c)`.
    pub fn publish(&mut self, commitment: Commitment) {
        if !self.by_key_id.contains_key(&commitment.key_id) {
            self.order.push(commitment.key_id.clone());
        }
        self.by_key_id.insert(commitment.key_id.clone(), commitment);
    }

    /// `findCommitment(keyId) -> Commitment?`.
    pub fn find(&self, key_id: &str) -> Option<&Commitment> {
        self.by_key_id.get(key_id)
    }

    pub fn all(&self) -> Vec<Commitment> {
        self.order
            .iter()
            .filter_map(|id| self.by_key_id.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_key_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key_id.is_empty()
    }
}
