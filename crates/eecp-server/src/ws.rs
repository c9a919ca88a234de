use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use eecp_crypto::auth::issue_challenge;
use eecp_crypto::temporal::derive_current_key;
use eecp_protocol::{
    now_millis, EecpError, MessageEnvelope, MessagePayload, ParticipantId, WorkspaceId, WorkspaceMetadata,
    WorkspaceState,
};

use crate::state::{AppState, SharedWorkspace, WorkspaceActor};
use crate::{admission, cleanup, routing};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Present for a join; absent when the connection is creating a
    /// workspace, matching the shareable-link query parameter convention.
    pub workspace: Option<Uuid>,
}

pub async fn handler(
    State(app): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app, query.workspace.map(WorkspaceId)))
}

async fn handle_socket(socket: WebSocket, app: AppState, join_target: Option<WorkspaceId>) {
    let (mut sender, mut receiver) = socket.split();

    let outcome = match join_target {
        Some(id) => handle_join(&mut sender, &mut receiver, &app, id).await,
        None => handle_create(&mut sender, &mut receiver, &app).await,
    };

    let (handle, workspace_id, participant_id) = match outcome {
        Ok(admitted) => admitted,
        Err(err) => {
            let _ = send(&mut sender, &MessageEnvelope::error(None, &err, now_millis())).await;
            return;
        }
    };

    run_connection(sender, receiver, handle, workspace_id, participant_id, app).await;
}

async fn send(sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin), envelope: &MessageEnvelope) -> Result<(), axum::Error> {
    let text = serde_json::to_string(envelope).expect("MessageEnvelope always serializes");
    sender.send(Message::Text(text)).await
}

async fn recv_payload(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    timeout_secs: u64,
) -> Result<MessagePayload, EecpError> {
    let fut = async {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let envelope: MessageEnvelope = serde_json::from_str(&text)
                        .map_err(|e| EecpError::InvalidOperation(format!("malformed envelope: {e}")))?;
                    return Ok(envelope.payload);
                }
                Ok(Message::Close(_)) => return Err(EecpError::NotFound("connection closed".into())),
                Ok(_) => continue,
                Err(_) => return Err(EecpError::Internal),
            }
        }
        Err(EecpError::NotFound("connection closed".into()))
    };

    tokio::time::timeout(Duration::from_secs(timeout_secs), fut)
        .await
        .map_err(|_| EecpError::Internal)?
}

async fn handle_create(
    sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    app: &AppState,
) -> Result<(SharedWorkspace, WorkspaceId, ParticipantId), EecpError> {
    let payload = recv_payload(receiver, app.config.join_handshake_timeout_secs).await?;
    let MessagePayload::CreateWorkspace { mut config, creator_public_key } = payload else {
        return Err(EecpError::InvalidOperation("expected create_workspace".into()));
    };

    if !config.time_window.is_valid() {
        return Err(EecpError::InvalidOperation("invalid time window".into()));
    }
    if config.expires_at <= config.created_at || config.max_participants == 0 {
        return Err(EecpError::InvalidOperation("invalid workspace config".into()));
    }

    let now = now_millis();
    config.id = WorkspaceId::new();
    config.created_at = now;

    let mut secret = [0u8; 32];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut secret);

    let current_key = derive_current_key(
        &secret,
        config.created_at,
        config.created_at,
        config.time_window.rotation_interval_min,
        config.time_window.grace_period_ms,
    )
    .map_err(|_| EecpError::Internal)?;

    let metadata = WorkspaceMetadata {
        next_rotation_at: current_key.valid_until,
        current_temporal_key_id: current_key.id.clone(),
        previous_temporal_key_id: None,
        state: WorkspaceState::Created,
        participants: Vec::new(),
        config: config.clone(),
    };

    let workspace_id = config.id;
    let handle = app
        .registry
        .insert(workspace_id, WorkspaceActor::new(metadata, secret, current_key))
        .await;

    crate::rotation::spawn_rotation_task(app.registry.clone(), workspace_id);

    let challenge = issue_challenge();
    send(sender, &MessageEnvelope {
        workspace_id: Some(workspace_id),
        participant_id: None,
        payload: MessagePayload::AuthChallenge { challenge },
        timestamp: now_millis(),
    })
    .await
    .map_err(|_| EecpError::Internal)?;

    let response = recv_payload(receiver, app.config.join_handshake_timeout_secs).await?;
    let MessagePayload::AuthResponse { signature, public_key } = response else {
        app.registry.remove(workspace_id).await;
        return Err(EecpError::Unauthorized("expected auth_response".into()));
    };
    if public_key != creator_public_key {
        app.registry.remove(workspace_id).await;
        return Err(EecpError::Unauthorized("public key mismatch".into()));
    }

    let (participant_id, entry) = {
        let mut actor = handle.write().await;
        match admission::admit(&mut actor, public_key, &challenge, &signature, now_millis()) {
            Ok(admitted) => admitted,
            Err(e) => {
                drop(actor);
                app.registry.remove(workspace_id).await;
                return Err(e);
            }
        }
    };

    send(sender, &MessageEnvelope {
        workspace_id: Some(workspace_id),
        participant_id: Some(participant_id),
        payload: MessagePayload::WorkspaceCreated {
            config,
            participant_id,
            wrapped_secret: serde_json::to_vec(&entry).expect("WrappedEntry always serializes"),
        },
        timestamp: now_millis(),
    })
    .await
    .map_err(|_| EecpError::Internal)?;

    info!(workspace = %workspace_id, participant = %participant_id, "workspace created");
    Ok((handle, workspace_id, participant_id))
}

async fn handle_join(
    sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    app: &AppState,
    workspace_id: WorkspaceId,
) -> Result<(SharedWorkspace, WorkspaceId, ParticipantId), EecpError> {
    let handle = app
        .registry
        .get(workspace_id)
        .await
        .ok_or_else(|| EecpError::NotFound("workspace".into()))?;

    let challenge = issue_challenge();
    send(sender, &MessageEnvelope {
        workspace_id: Some(workspace_id),
        participant_id: None,
        payload: MessagePayload::AuthChallenge { challenge },
        timestamp: now_millis(),
    })
    .await
    .map_err(|_| EecpError::Internal)?;

    let response = recv_payload(receiver, app.config.join_handshake_timeout_secs).await?;
    let MessagePayload::AuthResponse { signature, public_key } = response else {
        return Err(EecpError::Unauthorized("expected auth_response".into()));
    };

    let (participant_id, entry) = {
        let mut actor = handle.write().await;
        admission::admit(&mut actor, public_key, &challenge, &signature, now_millis())?
    };

    let metadata = handle.read().await.metadata.clone();
    send(sender, &MessageEnvelope {
        workspace_id: Some(workspace_id),
        participant_id: Some(participant_id),
        payload: MessagePayload::JoinAccepted {
            metadata: metadata.clone(),
            wrapped_secret: serde_json::to_vec(&entry).expect("WrappedEntry always serializes"),
        },
        timestamp: now_millis(),
    })
    .await
    .map_err(|_| EecpError::Internal)?;

    if let Some(info) = metadata.find_participant(participant_id) {
        handle.read().await.publish(MessageEnvelope {
            workspace_id: Some(workspace_id),
            participant_id: None,
            payload: MessagePayload::ParticipantJoined(info.clone()),
            timestamp: now_millis(),
        });
    }

    info!(workspace = %workspace_id, participant = %participant_id, "participant joined");
    Ok((handle, workspace_id, participant_id))
}

async fn run_connection(
    mut sender: impl SinkExt<Message, Error = axum::Error> + Unpin,
    mut receiver: impl StreamExt<Item = Result<Message, axum::Error>> + Unpin,
    handle: SharedWorkspace,
    workspace_id: WorkspaceId,
    participant_id: ParticipantId,
    app: AppState,
) {
    let mut broadcast_rx = handle.read().await.subscribe();

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(envelope) = serde_json::from_str::<MessageEnvelope>(&text) else { continue };
                        if let MessagePayload::Operation(op) = envelope.payload {
                            let now = now_millis();
                            let result = {
                                let mut actor = handle.write().await;
                                routing::route_operation(
                                    &mut actor,
                                    op,
                                    now,
                                    app.config.rate_limit_ops_per_sec,
                                    app.config.rate_limit_burst,
                                )
                            };
                            match result {
                                Ok(Some(accepted)) => {
                                    handle.read().await.publish(MessageEnvelope {
                                        workspace_id: Some(workspace_id),
                                        participant_id: Some(participant_id),
                                        payload: MessagePayload::Operation(accepted),
                                        timestamp: now,
                                    });
                                }
                                Ok(None) => {}
                                Err(err) => {
                                    let fatal = err.is_fatal_to_connection();
                                    let _ = send(&mut sender, &MessageEnvelope::error(Some(workspace_id), &err, now)).await;
                                    if fatal {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
            outbound = broadcast_rx.recv() => {
                match outbound {
                    Ok(envelope) => {
                        if envelope.participant_id == Some(participant_id) {
                            continue;
                        }
                        if send(&mut sender, &envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    handle.read().await.publish(MessageEnvelope {
        workspace_id: Some(workspace_id),
        participant_id: None,
        payload: MessagePayload::ParticipantLeft { id: participant_id },
        timestamp: now_millis(),
    });
    info!(workspace = %workspace_id, participant = %participant_id, "connection closed");

    // Opportunistically advance the lifecycle on disconnect rather than
    // only waiting for the next background sweep tick.
    cleanup::sweep(&app.registry).await;
}
