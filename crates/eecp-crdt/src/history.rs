use std::collections::HashMap;

use eecp_protocol::{CrdtOperation, EecpError, TimestampMillis};

use crate::text::apply_in_order;

/// Stores `CRDTOperation`s by id (set semantics — duplicates ignored).
/// `getText()` replays the full stored set in the canonical
/// `(timestamp asc, id asc)` order on every call rather than mutating an
/// incrementally-updated buffer as operations arrive; this is what makes
/// the result independent of arrival order without needing per-character
/// CRDT ids — see DESIGN.md for the tradeoff.
#[derive(Debug, Default)]
pub struct CrdtHistory {
    operations: HashMap<String, CrdtOperation>,
}

impl CrdtHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.operations.contains_key(id)
    }

    /// `mergeOperations(ops[])`: validates each operation's shape, then
    /// inserts any not already present. Applying the same operation twice
    /// is idempotent because storage is keyed by id.
    pub fn merge_operations(&mut self, ops: Vec<CrdtOperation>) -> Result<usize, EecpError> {
        let mut inserted = 0;
        for op in ops {
            op.validate()?;
            if !self.operations.contains_key(&op.id) {
                self.operations.insert(op.id.clone(), op);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// All stored operations in `(timestamp asc, id asc)` order.
    pub fn all_sorted(&self) -> Vec<CrdtOperation> {
        let mut ops: Vec<CrdtOperation> = self.operations.values().cloned().collect();
        ops.sort_by(|a, b| (a.timestamp, &a.id).cmp(&(b.timestamp, &b.id)));
        ops
    }

    /// `getOperationsSince(ts)`: all stored ops with `timestamp > ts`, in
    /// the same canonical ordering.
    pub fn get_operations_since(&self, ts: TimestampMillis) -> Vec<CrdtOperation> {
        self.all_sorted()
            .into_iter()
            .filter(|op| op.timestamp > ts)
            .collect()
    }

    /// Replays the full history to produce the current text
    pub fn get_text(&self) -> String {
        apply_in_order(&self.all_sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_protocol::{OperationKind, ParticipantId};

    fn op(id: &str, ts: i64, position: usize, kind: OperationKind) -> CrdtOperation {
        CrdtOperation {
            id: id.to_string(),
            participant_id: ParticipantId::new(),
            timestamp: ts,
            position,
            kind,
        }
    }

    #[test]
    fn duplicate_ids_are_idempotent() {
        let mut history = CrdtHistory::new();
        let insert = op("a", 1, 0, OperationKind::Insert { content: "X".into() });

        history.merge_operations(vec![insert.clone()]).unwrap();
        history.merge_operations(vec![insert]).unwrap();

        assert_eq!(history.len(), 1);
    }

    #[test]
    fn operations_since_filters_and_orders() {
        let mut history = CrdtHistory::new();
        history
            .merge_operations(vec![
                op("b", 20, 0, OperationKind::Insert { content: "b".into() }),
                op("a", 10, 0, OperationKind::Insert { content: "a".into() }),
                op("c", 30, 0, OperationKind::Insert { content: "c".into() }),
            ])
            .unwrap();

        let since = history.get_operations_since(10);
        let ids: Vec<&str> = since.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn invalid_insert_rejected() {
        let mut history = CrdtHistory::new();
        let bad = op("x", 1, 0, OperationKind::Insert { content: String::new() });
        assert!(history.merge_operations(vec![bad]).is_err());
        assert!(history.is_empty());
    }
}
