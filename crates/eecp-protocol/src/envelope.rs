use serde::{Deserialize, Serialize};

use crate::{
    Commitment, EncryptedOperation, ParticipantId, ParticipantInfo, TimestampMillis, WorkspaceConfig,
    WorkspaceId, WorkspaceMetadata,
};

/// The outer wire message: `MessageEnvelope { type, workspaceId, participantId?, payload, timestamp }`.
/// Transport is left at this envelope level — the concrete codec (JSON
/// over WebSocket, or any binary format preserving these field names) is
/// an external collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub workspace_id: Option<WorkspaceId>,
    pub participant_id: Option<ParticipantId>,
    pub payload: MessagePayload,
    pub timestamp: TimestampMillis,
}

/// Payload variants, one per row of the wire message table. `#[serde(tag =
/// "type")]` makes the discriminant the wire `type` field directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessagePayload {
    #[serde(rename = "create_workspace")]
    CreateWorkspace {
        config: WorkspaceConfig,
        creator_public_key: Vec<u8>,
    },

    #[serde(rename = "workspace_created")]
    WorkspaceCreated {
        config: WorkspaceConfig,
        participant_id: ParticipantId,
        /// ECIES-wrapped workspace secret for the creator.
        wrapped_secret: Vec<u8>,
    },

    #[serde(rename = "auth_challenge")]
    AuthChallenge { challenge: [u8; 32] },

    #[serde(rename = "auth_response")]
    AuthResponse {
        signature: Vec<u8>,
        public_key: Vec<u8>,
    },

    #[serde(rename = "join_accepted")]
    JoinAccepted {
        metadata: WorkspaceMetadata,
        wrapped_secret: Vec<u8>,
    },

    #[serde(rename = "operation")]
    Operation(EncryptedOperation),

    #[serde(rename = "key_rotated")]
    KeyRotated {
        new_key_id: String,
        rotated_at: TimestampMillis,
        previous_key_expires_at: TimestampMillis,
    },

    #[serde(rename = "participant_joined")]
    ParticipantJoined(ParticipantInfo),

    #[serde(rename = "participant_left")]
    ParticipantLeft { id: ParticipantId },

    #[serde(rename = "workspace_expired")]
    WorkspaceExpired { commitments: Vec<Commitment> },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl MessageEnvelope {
    pub fn error(workspace_id: Option<WorkspaceId>, err: &crate::EecpError, now: TimestampMillis) -> Self {
        Self {
            workspace_id,
            participant_id: None,
            payload: MessagePayload::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            },
            timestamp: now,
        }
    }
}
