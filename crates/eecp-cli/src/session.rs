use tracing::{info, warn};
use uuid::Uuid;

use eecp_crdt::history::CrdtHistory;
use eecp_crypto::aead::{decrypt, SealedPayload};
use eecp_crypto::auth::sign_challenge;
use eecp_crypto::ecies::{decrypt_for_recipient, EncryptedMessage, WrappedEntry};
use eecp_crypto::temporal::{derive_key, parse_key_index};
use eecp_protocol::{CrdtOperation, MessageEnvelope, MessagePayload, OperationKind, ParticipantId, WorkspaceMetadata};

use crate::identity::Identity;
use crate::transport::{self, Socket};

pub struct JoinedSession {
    pub socket: Socket,
    pub participant_id: ParticipantId,
    pub metadata: WorkspaceMetadata,
    pub secret: [u8; 32],
}

/// Connects, runs the auth challenge/response handshake, and unwraps the
/// workspace secret from whichever accept payload the server sends
/// (`join_accepted` here; `create` has its own variant of this same dance
/// since the payload shape differs slightly).
pub async fn join(server: &str, workspace_id: Uuid, identity: &Identity) -> anyhow::Result<JoinedSession> {
    let mut socket = transport::connect(server, Some(workspace_id)).await?;

    let challenge = match transport::recv(&mut socket).await?.payload {
        MessagePayload::AuthChallenge { challenge } => challenge,
        MessagePayload::Error { code, message } => anyhow::bail!("{code}: {message}"),
        other => anyhow::bail!("unexpected message before auth challenge: {other:?}"),
    };

    let signature = sign_challenge(&identity.signing_key, &challenge);
    transport::send(
        &mut socket,
        &MessageEnvelope {
            workspace_id: None,
            participant_id: None,
            payload: MessagePayload::AuthResponse {
                signature,
                public_key: identity.public_key_bytes(),
            },
            timestamp: 0,
        },
    )
    .await?;

    let response = transport::recv(&mut socket).await?;
    let participant_id = response
        .participant_id
        .ok_or_else(|| anyhow::anyhow!("join response carried no participant id"))?;

    let (metadata, wrapped_bytes) = match response.payload {
        MessagePayload::JoinAccepted { metadata, wrapped_secret } => (metadata, wrapped_secret),
        MessagePayload::Error { code, message } => anyhow::bail!("{code}: {message}"),
        other => anyhow::bail!("unexpected join response: {other:?}"),
    };

    let entry: WrappedEntry = serde_json::from_slice(&wrapped_bytes)?;
    let secret = decrypt_for_recipient(
        &single_entry_message(participant_id, entry),
        participant_id,
        &identity.secret_key,
    )?;

    Ok(JoinedSession { socket, participant_id, metadata, secret })
}

fn single_entry_message(id: ParticipantId, entry: WrappedEntry) -> EncryptedMessage {
    let mut msg = EncryptedMessage::default();
    msg.insert(id, entry);
    msg
}

/// Listens for operations until the socket closes or the workspace expires,
/// decrypting each with the temporal key its `key_id` names and folding it
/// into a running CRDT replica. Returns the converged text.
pub async fn observe_until_closed(mut session: JoinedSession) -> anyhow::Result<String> {
    let mut history = CrdtHistory::new();
    let created_at = session.metadata.config.created_at;
    let rotation_min = session.metadata.config.time_window.rotation_interval_min;
    let grace_ms = session.metadata.config.time_window.grace_period_ms;

    loop {
        let envelope = tokio::select! {
            frame = transport::recv(&mut session.socket) => match frame {
                Ok(e) => e,
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        match envelope.payload {
            MessagePayload::Operation(op) => {
                let key_index = parse_key_index(&op.key_id)
                    .ok_or_else(|| anyhow::anyhow!("malformed key id on wire"))?;
                let interval_ms = rotation_min as i64 * 60_000;
                let start = created_at + key_index * interval_ms;
                let end = start + interval_ms;
                let key = derive_key(&session.secret, start, end, &op.key_id, grace_ms)?;

                let sealed = SealedPayload {
                    ciphertext: op.encrypted_content.clone(),
                    nonce: op.nonce.clone().try_into().map_err(|_| anyhow::anyhow!("bad nonce length"))?,
                    auth_tag: op.auth_tag.clone().try_into().map_err(|_| anyhow::anyhow!("bad tag length"))?,
                    key_id: op.key_id.clone(),
                };
                let plaintext = decrypt(&sealed, &key, None)?;
                let kind: OperationKind = serde_json::from_slice(&plaintext)?;

                history.merge_operations(vec![CrdtOperation {
                    id: op.id,
                    participant_id: op.participant_id,
                    timestamp: op.timestamp,
                    position: op.position,
                    kind,
                }])?;
                info!(text = %history.get_text(), "workspace text updated");
            }
            MessagePayload::WorkspaceExpired { .. } => {
                info!("workspace expired, ending session");
                break;
            }
            MessagePayload::Error { code, message } => {
                warn!(code = %code, message = %message, "server reported an error");
            }
            _ => {}
        }
    }

    Ok(history.get_text())
}
