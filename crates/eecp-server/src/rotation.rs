use std::time::Duration;

use tracing::info;

use eecp_crypto::commitment::create_commitment;
use eecp_crypto::temporal::{current_key_id, derive_key, parse_key_index};
use eecp_protocol::{now_millis, MessageEnvelope, MessagePayload, TimestampMillis, WorkspaceId, WorkspaceState};

use crate::state::{WorkspaceActor, WorkspaceRegistry};

pub struct KeyRotatedEvent {
    pub new_key_id: String,
    pub rotated_at: TimestampMillis,
    pub previous_key_expires_at: TimestampMillis,
}

/// One rotation-scheduler tick. Idempotent under late firing: regardless
/// of how many rotation intervals have actually elapsed since the last
/// tick, this derives the key that is correct for `now` directly rather
/// than stepping through every intermediate `key-N`.
///
/// Also retires (commits + destroys) the previous key once its grace
/// period has ended, whether or not a rotation happened on this tick.
pub fn rotate_tick(actor: &mut WorkspaceActor, now: TimestampMillis) -> Option<KeyRotatedEvent> {
    if actor.metadata.state != WorkspaceState::Active {
        return None;
    }

    let created_at = actor.metadata.config.created_at;
    let rotation_min = actor.metadata.config.time_window.rotation_interval_min;
    let grace_ms = actor.metadata.config.time_window.grace_period_ms;
    let expected_id = current_key_id(created_at, now, rotation_min);

    let mut event = None;

    if actor.metadata.current_temporal_key_id != expected_id {
        // A lingering previous key from an earlier rotation that never
        // got swept (the scheduler woke up more than one interval late)
        // must still get its commitment before we discard it.
        retire_previous(actor, now, true);

        let secret = actor.secret.clone();
        if let Some(secret) = secret {
            let n = parse_key_index(&expected_id).unwrap_or(0);
            let interval_ms = rotation_min as i64 * 60_000;
            let start = created_at + n * interval_ms;
            let end = start + interval_ms;

            if let Ok(new_key) = derive_key(&secret, start, end, &expected_id, grace_ms) {
                let previous_key_expires_at = actor
                    .current_key
                    .as_ref()
                    .map(|k| k.grace_period_end)
                    .unwrap_or(now);

                actor.metadata.previous_temporal_key_id =
                    actor.current_key.as_ref().map(|k| k.id.clone());
                actor.previous_key = actor.current_key.take();
                actor.metadata.current_temporal_key_id = expected_id.clone();
                actor.metadata.next_rotation_at = end;
                actor.current_key = Some(new_key);

                event = Some(KeyRotatedEvent {
                    new_key_id: expected_id,
                    rotated_at: now,
                    previous_key_expires_at,
                });
            }
        }
    }

    retire_previous(actor, now, false);
    event
}

/// Commits and destroys the previous key once its grace period has ended,
/// or unconditionally when `force` is set (about to be overwritten by a
/// newer rotation regardless of its own grace deadline).
fn retire_previous(actor: &mut WorkspaceActor, now: TimestampMillis, force: bool) {
    let Some(prev) = &actor.previous_key else { return };
    if !force && now < prev.grace_period_end {
        return;
    }
    let commitment = create_commitment(prev, now);
    actor.commitments.publish(commitment);
    if let Some(mut key) = actor.previous_key.take() {
        key.destroy();
    }
    actor.metadata.previous_temporal_key_id = None;
}

/// Spawns the per-workspace rotation scheduler: a single monotonic timer
/// that sleeps until `next_rotation_at`, ticks, and reschedules. Exits
/// once the workspace is no longer in the registry (expired and swept).
pub fn spawn_rotation_task(registry: WorkspaceRegistry, id: WorkspaceId) {
    tokio::spawn(async move {
        loop {
            let Some(handle) = registry.get(id).await else { break };

            let next_at = handle.read().await.metadata.next_rotation_at;
            let now = now_millis();
            if next_at > now {
                tokio::time::sleep(Duration::from_millis((next_at - now) as u64)).await;
            }

            let Some(handle) = registry.get(id).await else { break };
            let mut actor = handle.write().await;
            if actor.metadata.state == WorkspaceState::Expired {
                break;
            }
            if let Some(event) = rotate_tick(&mut actor, now_millis()) {
                info!(workspace = %id, new_key_id = %event.new_key_id, "rotated temporal key");
                actor.publish(MessageEnvelope {
                    workspace_id: Some(id),
                    participant_id: None,
                    payload: MessagePayload::KeyRotated {
                        new_key_id: event.new_key_id,
                        rotated_at: event.rotated_at,
                        previous_key_expires_at: event.previous_key_expires_at,
                    },
                    timestamp: event.rotated_at,
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_protocol::{TimeWindow, WorkspaceConfig, WorkspaceId, WorkspaceMetadata};

    fn fresh_actor() -> WorkspaceActor {
        let secret = [9u8; 32];
        let key = derive_key(&secret, 0, 300_000, "key-0", 60_000).unwrap();
        let metadata = WorkspaceMetadata {
            config: WorkspaceConfig {
                id: WorkspaceId::new(),
                created_at: 0,
                expires_at: 10_000_000,
                time_window: TimeWindow {
                    start_time: 0,
                    end_time: 300_000,
                    rotation_interval_min: 5,
                    grace_period_ms: 60_000,
                },
                max_participants: 8,
                allow_extension: false,
            },
            state: WorkspaceState::Active,
            participants: Vec::new(),
            current_temporal_key_id: "key-0".into(),
            previous_temporal_key_id: None,
            next_rotation_at: 300_000,
        };
        WorkspaceActor::new(metadata, secret, key)
    }

    #[test]
    fn rotation_advances_key_and_keeps_previous_for_grace() {
        let mut actor = fresh_actor();

        assert!(rotate_tick(&mut actor, 100_000).is_none());

        let event = rotate_tick(&mut actor, 300_000).expect("rotation at boundary");
        assert_eq!(event.new_key_id, "key-1");
        assert_eq!(actor.metadata.current_temporal_key_id, "key-1");
        assert_eq!(actor.metadata.previous_temporal_key_id.as_deref(), Some("key-0"));
        assert!(actor.previous_key.is_some());

        rotate_tick(&mut actor, 359_999);
        assert!(actor.previous_key.is_some());

        rotate_tick(&mut actor, 360_000);
        assert!(actor.previous_key.is_none());
        assert_eq!(actor.commitments.len(), 1);
    }

    #[test]
    fn late_tick_derives_correct_key_directly() {
        let mut actor = fresh_actor();
        let event = rotate_tick(&mut actor, 950_000).expect("rotation far past boundary");
        assert_eq!(event.new_key_id, "key-3");
    }
}
