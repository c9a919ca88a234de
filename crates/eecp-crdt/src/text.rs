use eecp_protocol::{CrdtOperation, OperationKind};

/// Applies a sequence of already-ordered operations to build the text
/// replica. Positions are character offsets, not byte offsets, so the
/// result is correct over multi-byte UTF-8 content.
///
/// Convergence rules:
/// - concurrent inserts at the same position are both preserved (the
///   later-ordered insert lands *before* the earlier one at that position,
///   since the earlier one was already applied and pushed forward — see
///   DESIGN.md for why this, not the reverse, is the chosen convention);
/// - deletes are clamped to the available length;
/// - delete-from-empty is a no-op.
pub fn apply_in_order(ops: &[CrdtOperation]) -> String {
    let mut buffer: Vec<char> = Vec::new();

    for op in ops {
        match &op.kind {
            OperationKind::Insert { content } => {
                let pos = op.position.min(buffer.len());
                for (offset, ch) in content.chars().enumerate() {
                    buffer.insert(pos + offset, ch);
                }
            }
            OperationKind::Delete { length } => {
                if op.position >= buffer.len() || *length == 0 {
                    continue;
                }
                let end = (op.position + *length).min(buffer.len());
                buffer.drain(op.position..end);
            }
        }
    }

    buffer.into_iter().collect()
}
