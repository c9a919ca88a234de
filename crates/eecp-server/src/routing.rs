use eecp_protocol::{EecpError, EncryptedOperation, ParticipantId, TimestampMillis};

use crate::state::WorkspaceActor;

/// Per-participant token bucket, default 50 ops/s with a burst of 100.
#[derive(Debug, Clone, Copy)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: TimestampMillis,
}

impl TokenBucket {
    pub fn new(refill_per_sec: f64, capacity: f64, now: TimestampMillis) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_refill: now,
        }
    }

    pub fn try_consume(&mut self, now: TimestampMillis) -> bool {
        let elapsed_secs = (now - self.last_refill).max(0) as f64 / 1000.0;
        self.tokens = (self.tokens + elapsed_secs * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Validates, rate-limits, and records an inbound operation. Returns the
/// envelope to broadcast to every other connected participant, or `None`
/// if this is a duplicate id (idempotent accept, not an error).
///
/// The server never attempts to decrypt `encrypted_content` — everything
/// here operates on the envelope's visible metadata only.
pub fn route_operation(
    actor: &mut WorkspaceActor,
    op: EncryptedOperation,
    now: TimestampMillis,
    rate_limit_ops_per_sec: f64,
    rate_limit_burst: f64,
) -> Result<Option<EncryptedOperation>, EecpError> {
    if actor.metadata.state != eecp_protocol::WorkspaceState::Active {
        return Err(EecpError::Expired);
    }

    let public_key = actor
        .public_keys
        .get(&op.participant_id)
        .ok_or_else(|| EecpError::Unauthorized("unknown participant".into()))?;

    eecp_crypto::auth::verify_payload_signature(public_key, &op.signable_bytes(), &op.signature)
        .map_err(|_| EecpError::Unauthorized("bad operation signature".into()))?;

    if actor.seen_operation_ids.contains(&op.id) {
        return Ok(None);
    }

    let allowed = allow_operation(actor, op.participant_id, now, rate_limit_ops_per_sec, rate_limit_burst);
    if !allowed {
        return Err(EecpError::RateLimited);
    }

    actor.seen_operation_ids.insert(op.id.clone());
    actor.operations.push(op.clone());

    Ok(Some(op))
}

fn allow_operation(
    actor: &mut WorkspaceActor,
    participant_id: ParticipantId,
    now: TimestampMillis,
    rate_limit_ops_per_sec: f64,
    rate_limit_burst: f64,
) -> bool {
    actor
        .limiters
        .entry(participant_id)
        .or_insert_with(|| TokenBucket::new(rate_limit_ops_per_sec, rate_limit_burst, now))
        .try_consume(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_allows_burst_then_throttles() {
        let mut bucket = TokenBucket::new(10.0, 5.0, 0);
        for _ in 0..5 {
            assert!(bucket.try_consume(0));
        }
        assert!(!bucket.try_consume(0));
    }

    #[test]
    fn bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(10.0, 5.0, 0);
        for _ in 0..5 {
            bucket.try_consume(0);
        }
        assert!(!bucket.try_consume(50));
        assert!(bucket.try_consume(200));
    }
}
