use eecp_crypto::auth::verify_challenge_response;
use eecp_crypto::ecies::{encrypt_for_recipients, WrappedEntry};
use eecp_protocol::{EecpError, ParticipantId, ParticipantInfo, ParticipantRole, TimestampMillis, WorkspaceState};

use crate::lifecycle;
use crate::state::WorkspaceActor;

/// Admits a participant who has just proven possession of `public_key` by
/// answering `challenge` with `signature`. Succeeds only if the workspace
/// is accepting joins (`Created`, for the creator's own admission, or
/// `Active`) and has room. On success, wraps the workspace secret for the
/// new participant and returns the entry to send back over the wire.
pub fn admit(
    actor: &mut WorkspaceActor,
    public_key: Vec<u8>,
    challenge: &[u8; 32],
    signature: &[u8],
    now: TimestampMillis,
) -> Result<(ParticipantId, WrappedEntry), EecpError> {
    match actor.metadata.state {
        WorkspaceState::Created | WorkspaceState::Active => {}
        WorkspaceState::Expiring | WorkspaceState::Expired => return Err(EecpError::Expired),
    }

    if actor.metadata.participant_count() >= actor.metadata.config.max_participants as usize {
        return Err(EecpError::CapacityExceeded);
    }

    verify_challenge_response(&public_key, challenge, signature)
        .map_err(|_| EecpError::Unauthorized("challenge response did not verify".into()))?;

    let is_creator = actor.metadata.participant_count() == 0;
    let id = ParticipantId::new();

    let secret = actor
        .secret
        .as_ref()
        .ok_or(EecpError::Internal)?;
    let wrapped = encrypt_for_recipients(secret, &[(id, public_key.clone())])
        .map_err(|_| EecpError::Internal)?;
    let entry = wrapped.get(&id).cloned().ok_or(EecpError::Internal)?;

    actor.metadata.participants.push(ParticipantInfo {
        id,
        public_key: public_key.clone(),
        joined_at: now,
        role: if is_creator { ParticipantRole::Creator } else { ParticipantRole::Editor },
    });
    actor.public_keys.insert(id, public_key);

    if is_creator {
        lifecycle::activate(actor);
    }

    Ok((id, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_crypto::auth::{issue_challenge, sign_challenge};
    use eecp_crypto::temporal::derive_key;
    use eecp_protocol::{TimeWindow, WorkspaceConfig, WorkspaceId, WorkspaceMetadata};
    use k256::ecdsa::SigningKey;
    use rand_core::OsRng;

    fn actor_with_capacity(max_participants: u32) -> WorkspaceActor {
        let secret = [4u8; 32];
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
                max_participants,
                allow_extension: false,
            },
            state: WorkspaceState::Created,
            participants: Vec::new(),
            current_temporal_key_id: "key-0".into(),
            previous_temporal_key_id: None,
            next_rotation_at: 300_000,
        };
        WorkspaceActor::new(metadata, secret, key)
    }

    fn admit_fresh_participant(actor: &mut WorkspaceActor) -> Result<(ParticipantId, WrappedEntry), EecpError> {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = signing_key.verifying_key().to_sec1_bytes().to_vec();
        let challenge = issue_challenge();
        let signature = sign_challenge(&signing_key, &challenge);
        admit(actor, public_key, &challenge, &signature, 0)
    }

    #[test]
    fn third_join_over_capacity_two_is_rejected() {
        let mut actor = actor_with_capacity(2);

        assert!(admit_fresh_participant(&mut actor).is_ok());
        assert!(admit_fresh_participant(&mut actor).is_ok());
        assert_eq!(actor.metadata.participant_count(), 2);

        let third = admit_fresh_participant(&mut actor);
        assert!(matches!(third, Err(EecpError::CapacityExceeded)));
        assert_eq!(actor.metadata.participant_count(), 2);
    }

    #[test]
    fn first_admission_activates_the_workspace() {
        let mut actor = actor_with_capacity(4);
        assert_eq!(actor.metadata.state, WorkspaceState::Created);

        admit_fresh_participant(&mut actor).unwrap();
        assert_eq!(actor.metadata.state, WorkspaceState::Active);
    }

    #[test]
    fn wrong_signature_is_unauthorized() {
        let mut actor = actor_with_capacity(4);
        let impostor = SigningKey::random(&mut OsRng);
        let public_key = impostor.verifying_key().to_sec1_bytes().to_vec();
        let challenge = issue_challenge();
        let bad_signature = sign_challenge(&SigningKey::random(&mut OsRng), &challenge);

        let result = admit(&mut actor, public_key, &challenge, &bad_signature, 0);
        assert!(matches!(result, Err(EecpError::Unauthorized(_))));
    }
}
