use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use zeroize::Zeroizing;

use eecp_crypto::commitment::CommitmentLog;
use eecp_crypto::temporal::TemporalKey;
use eecp_protocol::{EncryptedOperation, MessageEnvelope, ParticipantId, WorkspaceId, WorkspaceMetadata};

use crate::routing::TokenBucket;

/// Everything SessionCore owns for one workspace, guarded by a single
/// per-workspace lock. `secret` is held only to perform on-demand ECIES
/// wraps for participants admitted after creation — it is never logged,
/// never serialized, and is destroyed along with the temporal keys when
/// the workspace reaches `Expired` (see DESIGN.md for why this, not a
/// pure generate-wrap-discard at creation, is what lets later joins work
/// without a creator relay step).
pub struct WorkspaceActor {
    pub metadata: WorkspaceMetadata,
    pub(crate) secret: Option<Zeroizing<[u8; 32]>>,
    pub(crate) current_key: Option<TemporalKey>,
    pub(crate) previous_key: Option<TemporalKey>,
    pub(crate) commitments: CommitmentLog,
    pub(crate) operations: Vec<EncryptedOperation>,
    pub(crate) seen_operation_ids: HashSet<String>,
    pub(crate) public_keys: HashMap<ParticipantId, Vec<u8>>,
    pub(crate) limiters: HashMap<ParticipantId, TokenBucket>,
    pub(crate) broadcast: broadcast::Sender<MessageEnvelope>,
}

impl WorkspaceActor {
    pub fn new(metadata: WorkspaceMetadata, secret: [u8; 32], current_key: TemporalKey) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            metadata,
            secret: Some(Zeroizing::new(secret)),
            current_key: Some(current_key),
            previous_key: None,
            commitments: CommitmentLog::new(),
            operations: Vec::new(),
            seen_operation_ids: HashSet::new(),
            public_keys: HashMap::new(),
            limiters: HashMap::new(),
            broadcast: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageEnvelope> {
        self.broadcast.subscribe()
    }

    pub fn publish(&self, envelope: MessageEnvelope) {
        // No subscribers is a normal state (e.g. a lone creator before
        // anyone else connects); the send error is not a failure.
        let _ = self.broadcast.send(envelope);
    }

    /// Destroys all retained key material: the current and previous
    /// temporal keys and the workspace secret itself. Called only from the
    /// cleanup sweep on transition to `Expired` — the sole authorized
    /// destroyer of key material.
    pub fn destroy_all_keys(&mut self) {
        if let Some(mut key) = self.current_key.take() {
            key.destroy();
        }
        if let Some(mut key) = self.previous_key.take() {
            key.destroy();
        }
        self.secret = None;
    }
}

/// Shared application state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: WorkspaceRegistry,
    pub config: Arc<crate::config::ServerConfig>,
}

pub type SharedWorkspace = Arc<RwLock<WorkspaceActor>>;

/// Registry of all live workspaces. Mirrors the connected-peer map
/// pattern, widened to a workspace-keyed actor map: every workspace's
/// mutable state lives behind its own lock rather than one lock guarding
/// everything.
#[derive(Clone, Default)]
pub struct WorkspaceRegistry {
    workspaces: Arc<RwLock<HashMap<WorkspaceId, SharedWorkspace>>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: WorkspaceId, actor: WorkspaceActor) -> SharedWorkspace {
        let handle = Arc::new(RwLock::new(actor));
        self.workspaces.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: WorkspaceId) -> Option<SharedWorkspace> {
        self.workspaces.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: WorkspaceId) {
        self.workspaces.write().await.remove(&id);
    }

    pub async fn ids(&self) -> Vec<WorkspaceId> {
        self.workspaces.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.workspaces.read().await.len()
    }
}
