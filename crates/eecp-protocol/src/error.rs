use thiserror::Error;

/// System-wide error taxonomy. Every layer (crypto, CRDT, server)
/// converts its local error type into this one at the boundary so the wire
/// `error` envelope always carries one of these short codes, never a
/// `Debug`-formatted internal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EecpError {
    #[error("key id mismatch")]
    KeyIdMismatch,

    #[error("authentication tag verification failed")]
    AuthFailure,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("workspace expired")]
    Expired,

    #[error("rate limited")]
    RateLimited,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("capacity exceeded")]
    CapacityExceeded,

    #[error("internal error")]
    Internal,
}

impl EecpError {
    /// Short machine-readable code sent to clients in an `error` payload.
    /// Never includes key material, secrets, or plaintext.
    pub fn code(&self) -> &'static str {
        match self {
            EecpError::KeyIdMismatch => "KEY_ID_MISMATCH",
            EecpError::AuthFailure => "AUTH_FAILURE",
            EecpError::Unauthorized(_) => "UNAUTHORIZED",
            EecpError::NotFound(_) => "NOT_FOUND",
            EecpError::Expired => "EXPIRED",
            EecpError::RateLimited => "RATE_LIMITED",
            EecpError::InvalidOperation(_) => "INVALID_OPERATION",
            EecpError::CapacityExceeded => "CAPACITY_EXCEEDED",
            EecpError::Internal => "INTERNAL",
        }
    }

    /// Whether this failure should drop the connection (signature failure
    /// drops; rate limiting does not).
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, EecpError::Unauthorized(_))
    }
}

pub type EecpResult<T> = Result<T, EecpError>;
