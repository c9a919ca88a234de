use serde::{Deserialize, Serialize};

use crate::{ParticipantId, TimestampMillis, WorkspaceId};

/// `CRDTOperation`. Immutable once emitted; the `kind` discriminant is an
/// explicit tagged variant rather than an insert/delete class hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrdtOperation {
    pub id: String,
    pub participant_id: ParticipantId,
    pub timestamp: TimestampMillis,
    pub position: usize,
    pub kind: OperationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    Insert { content: String },
    Delete { length: usize },
}

impl CrdtOperation {
    /// Shape validation: insert requires content, delete requires
    /// a length, and the discriminant itself is always one of the two —
    /// an "unknown type" can only arise from a malformed wire payload,
    /// which is rejected before it reaches this type (see `envelope.rs`).
    pub fn validate(&self) -> Result<(), crate::EecpError> {
        match &self.kind {
            OperationKind::Insert { content } if content.is_empty() => Err(
                crate::EecpError::InvalidOperation("insert requires non-empty content".into()),
            ),
            OperationKind::Insert { .. } | OperationKind::Delete { .. } => Ok(()),
        }
    }
}

/// `EncryptedOperation`. `operation_type` and `position` are
/// visible to the server for routing/rate-limiting purposes; `encrypted_content`
/// is opaque ciphertext the server never attempts to decrypt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedOperation {
    pub id: String,
    pub workspace_id: WorkspaceId,
    pub participant_id: ParticipantId,
    pub timestamp: TimestampMillis,
    pub position: usize,
    pub operation_type: EncryptedOperationType,
    /// Opaque AEAD ciphertext of the serialized `CrdtOperation` payload
    /// fields (content/length), produced by `eecp_crypto::aead::encrypt`.
    pub encrypted_content: Vec<u8>,
    /// secp256k1 ECDSA signature over the rest of this struct.
    pub signature: Vec<u8>,
    /// Key id the `encrypted_content` was sealed under, so peers (and the
    /// rotation scheduler) can tell which temporal key to use for decrypt.
    pub key_id: String,
    /// AEAD nonce and tag, carried alongside the ciphertext on the wire.
    pub nonce: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptedOperationType {
    Insert,
    Delete,
}

impl EncryptedOperation {
    /// Canonical bytes the signature in `signature` is computed over: every
    /// field except the signature itself, in a fixed order. Used by both
    /// the signer (client) and the verifier (server).
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.id.as_bytes());
        buf.extend_from_slice(self.workspace_id.0.as_bytes());
        buf.extend_from_slice(self.participant_id.0.as_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.position.to_be_bytes());
        buf.push(match self.operation_type {
            EncryptedOperationType::Insert => 0,
            EncryptedOperationType::Delete => 1,
        });
        buf.extend_from_slice(&self.encrypted_content);
        buf.extend_from_slice(self.key_id.as_bytes());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.auth_tag);
        buf
    }
}
