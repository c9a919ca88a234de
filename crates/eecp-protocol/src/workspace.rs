use serde::{Deserialize, Serialize};

use crate::{ParticipantId, TimestampMillis, WorkspaceId};

/// Allowed rotation intervals, in minutes.
pub const ALLOWED_ROTATION_INTERVALS_MIN: [u32; 4] = [5, 15, 30, 60];

/// Allowed grace period bounds, in milliseconds.
pub const MIN_GRACE_PERIOD_MS: i64 = 30_000;
pub const MAX_GRACE_PERIOD_MS: i64 = 120_000;

/// `TimeWindow`: the rotation/grace parameters governing a
/// workspace's temporal keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: TimestampMillis,
    pub end_time: TimestampMillis,
    /// Minutes; must be one of `ALLOWED_ROTATION_INTERVALS_MIN`.
    pub rotation_interval_min: u32,
    /// Milliseconds; must fall within `[MIN_GRACE_PERIOD_MS, MAX_GRACE_PERIOD_MS]`.
    pub grace_period_ms: i64,
}

impl TimeWindow {
    pub fn rotation_interval_ms(&self) -> i64 {
        self.rotation_interval_min as i64 * 60_000
    }

    pub fn is_valid(&self) -> bool {
        self.end_time > self.start_time
            && ALLOWED_ROTATION_INTERVALS_MIN.contains(&self.rotation_interval_min)
            && self.grace_period_ms >= MIN_GRACE_PERIOD_MS
            && self.grace_period_ms <= MAX_GRACE_PERIOD_MS
    }
}

/// A derived symmetric key valid only during a specific time window.
/// The raw key bytes are never serialized — only the identifying metadata
/// travels over the wire or into logs. Key material itself lives in
/// `eecp_crypto::temporal::TemporalKey`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalKeyId {
    /// `"key-N"`.
    pub id: String,
    pub valid_from: TimestampMillis,
    pub valid_until: TimestampMillis,
    pub grace_period_end: TimestampMillis,
}

/// `WorkspaceConfig`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub id: WorkspaceId,
    pub created_at: TimestampMillis,
    pub expires_at: TimestampMillis,
    pub time_window: TimeWindow,
    pub max_participants: u32,
    pub allow_extension: bool,
}

/// `ParticipantInfo`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    /// Compressed SEC1 secp256k1 public key (33 bytes), base64-free on the
    /// wire — callers encode/decode with whatever the transport needs.
    pub public_key: Vec<u8>,
    pub joined_at: TimestampMillis,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Creator,
    Editor,
    Viewer,
}

/// Workspace lifecycle state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    Created,
    Active,
    Expiring,
    Expired,
}

/// `WorkspaceMetadata`, mutated only by the server-side session actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub config: WorkspaceConfig,
    pub state: WorkspaceState,
    pub participants: Vec<ParticipantInfo>,
    pub current_temporal_key_id: String,
    pub previous_temporal_key_id: Option<String>,
    /// Next instant the rotation scheduler is due to fire, represented as
    /// the single next deadline rather than a persisted schedule — none
    /// would survive a server restart anyway given the in-memory-only
    /// state model.
    pub next_rotation_at: TimestampMillis,
}

impl WorkspaceMetadata {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn find_participant(&self, id: ParticipantId) -> Option<&ParticipantInfo> {
        self.participants.iter().find(|p| p.id == id)
    }
}
