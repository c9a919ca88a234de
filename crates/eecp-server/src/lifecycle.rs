use eecp_crypto::commitment::create_commitment;
use eecp_protocol::{EecpError, TimestampMillis, WorkspaceState};

use crate::state::WorkspaceActor;

/// `Created -> Active`: the first participant (the creator) has
/// authenticated. Idempotent if called again while already `Active`.
pub fn activate(actor: &mut WorkspaceActor) {
    if actor.metadata.state == WorkspaceState::Created {
        actor.metadata.state = WorkspaceState::Active;
    }
}

/// Advances the lifecycle state machine against the wall clock:
/// `Active -> Expiring` at `expires_at`, then `Expiring -> Expired` after
/// one more grace period has elapsed. Destroys temporal key material and
/// publishes commitments for each once `Expired` is reached. Safe to call
/// repeatedly (from the cleanup sweep); transitions only ever move
/// forward.
pub fn advance(actor: &mut WorkspaceActor, now: TimestampMillis) {
    match actor.metadata.state {
        WorkspaceState::Created | WorkspaceState::Active => {
            if now >= actor.metadata.config.expires_at {
                actor.metadata.state = WorkspaceState::Expiring;
            }
        }
        WorkspaceState::Expiring => {
            let grace = actor.metadata.config.time_window.grace_period_ms;
            if now >= actor.metadata.config.expires_at + grace {
                expire(actor, now);
            }
        }
        WorkspaceState::Expired => {}
    }
}

fn expire(actor: &mut WorkspaceActor, now: TimestampMillis) {
    if let Some(key) = &actor.current_key {
        let commitment = create_commitment(key, now);
        actor.commitments.publish(commitment);
    }
    if let Some(key) = &actor.previous_key {
        let commitment = create_commitment(key, now);
        actor.commitments.publish(commitment);
    }
    actor.destroy_all_keys();
    actor.operations.clear();
    actor.seen_operation_ids.clear();
    actor.metadata.state = WorkspaceState::Expired;
}

/// `allowExtension`: accepted only if the workspace currently has at least
/// one participant and the requested `new_expires_at` does not exceed
/// `createdAt + hard_cap_ms`.
pub fn extend(
    actor: &mut WorkspaceActor,
    new_expires_at: TimestampMillis,
    hard_cap_ms: i64,
) -> Result<(), EecpError> {
    if !actor.metadata.config.allow_extension {
        return Err(EecpError::Unauthorized("extension not permitted for this workspace".into()));
    }
    if actor.metadata.participant_count() < 1 {
        return Err(EecpError::InvalidOperation("no participants to authorize extension".into()));
    }
    let cap = actor.metadata.config.created_at + hard_cap_ms;
    if new_expires_at > cap {
        return Err(EecpError::InvalidOperation("extension exceeds hard cap".into()));
    }
    actor.metadata.config.expires_at = new_expires_at;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_crypto::temporal::derive_key;
    use eecp_protocol::{WorkspaceConfig, WorkspaceId, WorkspaceMetadata, TimeWindow};

    fn metadata(expires_at: i64, grace_period_ms: i64) -> WorkspaceMetadata {
        WorkspaceMetadata {
            config: WorkspaceConfig {
                id: WorkspaceId::new(),
                created_at: 0,
                expires_at,
                time_window: TimeWindow {
                    start_time: 0,
                    end_time: 300_000,
                    rotation_interval_min: 5,
                    grace_period_ms,
                },
                max_participants: 8,
                allow_extension: true,
            },
            state: WorkspaceState::Active,
            participants: Vec::new(),
            current_temporal_key_id: "key-0".into(),
            previous_temporal_key_id: None,
            next_rotation_at: 300_000,
        }
    }

    fn actor(expires_at: i64, grace_period_ms: i64) -> WorkspaceActor {
        let key = derive_key(&[1u8; 32], 0, 300_000, "key-0", grace_period_ms).unwrap();
        WorkspaceActor::new(metadata(expires_at, grace_period_ms), [1u8; 32], key)
    }

    #[test]
    fn active_transitions_to_expiring_then_expired() {
        let mut a = actor(1_000, 60_000);

        advance(&mut a, 500);
        assert_eq!(a.metadata.state, WorkspaceState::Active);

        advance(&mut a, 1_000);
        assert_eq!(a.metadata.state, WorkspaceState::Expiring);

        advance(&mut a, 1_000 + 60_000 - 1);
        assert_eq!(a.metadata.state, WorkspaceState::Expiring);

        advance(&mut a, 1_000 + 60_000);
        assert_eq!(a.metadata.state, WorkspaceState::Expired);
        assert!(a.current_key.is_none());
        assert_eq!(a.commitments.len(), 1);
        assert!(a.operations.is_empty());
    }

    #[test]
    fn extension_respects_hard_cap() {
        let mut a = actor(10_000, 60_000);
        a.metadata.participants.push(eecp_protocol::ParticipantInfo {
            id: eecp_protocol::ParticipantId::new(),
            public_key: vec![],
            joined_at: 0,
            role: eecp_protocol::ParticipantRole::Creator,
        });

        assert!(extend(&mut a, 5_000, 20_000).is_ok());
        assert!(extend(&mut a, 30_000, 20_000).is_err());
    }
}
