use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod commitment;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod workspace;

pub use commitment::*;
pub use envelope::*;
pub use error::*;
pub use operation::*;
pub use workspace::*;

/// Wire protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum envelope size accepted by the server (1 MiB; text operations, not media).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Workspace identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub Uuid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant identifier (UUID v4), session-bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the Unix epoch. Used throughout rather than
/// `chrono::DateTime` so that key derivation operates on a plain
/// integer time axis, matching the `startTime`/`endTime` arithmetic
pub type TimestampMillis = i64;

pub fn now_millis() -> TimestampMillis {
    chrono::Utc::now().timestamp_millis()
}
