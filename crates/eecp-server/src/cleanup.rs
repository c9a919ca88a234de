use std::time::Duration;

use tracing::info;

use eecp_protocol::{now_millis, MessageEnvelope, MessagePayload, WorkspaceState};

use crate::lifecycle;
use crate::state::WorkspaceRegistry;

/// Background sweep, run every `cleanup_sweep_interval_secs`. This is the
/// sole authorized destroyer of key material: it advances every
/// `Expiring` workspace whose final grace period has elapsed to `Expired`,
/// broadcasts the resulting commitments, and then drops the workspace
/// from the registry entirely — nothing is persisted past this point.
pub async fn sweep(registry: &WorkspaceRegistry) {
    let now = now_millis();

    for id in registry.ids().await {
        let Some(handle) = registry.get(id).await else { continue };
        let newly_expired = {
            let mut actor = handle.write().await;
            let was_active = actor.metadata.state != WorkspaceState::Expired;
            lifecycle::advance(&mut actor, now);
            was_active && actor.metadata.state == WorkspaceState::Expired
        };

        if newly_expired {
            let commitments = handle.read().await.commitments.all();
            let envelope = MessageEnvelope {
                workspace_id: Some(id),
                participant_id: None,
                payload: MessagePayload::WorkspaceExpired { commitments },
                timestamp: now,
            };
            handle.read().await.publish(envelope);
            info!(workspace = %id, "workspace expired, discarding state");
            registry.remove(id).await;
        }
    }
}

pub fn spawn(registry: WorkspaceRegistry, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            sweep(&registry).await;
        }
    });
}
