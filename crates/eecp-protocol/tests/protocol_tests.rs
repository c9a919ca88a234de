use eecp_protocol::*;

#[test]
fn envelope_roundtrips_through_json() {
    let envelope = MessageEnvelope {
        workspace_id: Some(WorkspaceId::new()),
        participant_id: Some(ParticipantId::new()),
        payload: MessagePayload::AuthChallenge { challenge: [7u8; 32] },
        timestamp: 1_700_000_000_000,
    };

    let json = serde_json::to_string(&envelope).expect("serializes");
    let back: MessageEnvelope = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(back.workspace_id, envelope.workspace_id);
    match back.payload {
        MessagePayload::AuthChallenge { challenge } => assert_eq!(challenge, [7u8; 32]),
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn error_payload_never_carries_debug_formatting() {
    let err = EecpError::Unauthorized("challenge response did not verify".into());
    let envelope = MessageEnvelope::error(Some(WorkspaceId::new()), &err, 0);

    match envelope.payload {
        MessagePayload::Error { code, message } => {
            assert_eq!(code, "UNAUTHORIZED");
            assert!(!message.contains("Unauthorized("));
        }
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn time_window_validation_rejects_out_of_range_grace() {
    let window = TimeWindow {
        start_time: 0,
        end_time: 300_000,
        rotation_interval_min: 5,
        grace_period_ms: 1,
    };
    assert!(!window.is_valid());

    let valid = TimeWindow { grace_period_ms: 60_000, ..window };
    assert!(valid.is_valid());
}

#[test]
fn crdt_operation_wire_shape_round_trips() {
    let op = CrdtOperation {
        id: "op-1".into(),
        participant_id: ParticipantId::new(),
        timestamp: 42,
        position: 3,
        kind: OperationKind::Insert { content: "hi".into() },
    };
    let json = serde_json::to_string(&op).unwrap();
    let back: CrdtOperation = serde_json::from_str(&json).unwrap();
    assert_eq!(back, op);
}

#[test]
fn encrypted_operation_signable_bytes_change_with_any_field() {
    let base = EncryptedOperation {
        id: "op-1".into(),
        workspace_id: WorkspaceId::new(),
        participant_id: ParticipantId::new(),
        timestamp: 1,
        position: 0,
        operation_type: EncryptedOperationType::Insert,
        encrypted_content: vec![1, 2, 3],
        signature: vec![],
        key_id: "key-0".into(),
        nonce: vec![0; 12],
        auth_tag: vec![0; 16],
    };
    let mut changed = base.clone();
    changed.position = 1;

    assert_ne!(base.signable_bytes(), changed.signable_bytes());
}
