use eecp_crdt::history::CrdtHistory;
use eecp_protocol::{CrdtOperation, OperationKind, ParticipantId};

fn insert(id: &str, ts: i64, position: usize, content: &str) -> CrdtOperation {
    CrdtOperation {
        id: id.to_string(),
        participant_id: ParticipantId::new(),
        timestamp: ts,
        position,
        kind: OperationKind::Insert { content: content.to_string() },
    }
}

#[test]
fn two_replicas_converge_regardless_of_arrival_order() {
    let ops = vec![
        insert("a", 1, 0, "Hello"),
        insert("b", 2, 5, " World"),
    ];

    let mut replica_one = CrdtHistory::new();
    replica_one.merge_operations(ops.clone()).unwrap();

    let mut replica_two = CrdtHistory::new();
    let mut reversed = ops;
    reversed.reverse();
    replica_two.merge_operations(reversed).unwrap();

    assert_eq!(replica_one.get_text(), replica_two.get_text());
    assert_eq!(replica_one.get_text(), "Hello World");
}

#[test]
fn merging_the_same_batch_twice_does_not_duplicate_text() {
    let ops = vec![insert("a", 1, 0, "once")];

    let mut history = CrdtHistory::new();
    history.merge_operations(ops.clone()).unwrap();
    history.merge_operations(ops).unwrap();

    assert_eq!(history.get_text(), "once");
    assert_eq!(history.len(), 1);
}
