use thiserror::Error;

pub mod aead;
pub mod auth;
pub mod commitment;
pub mod ecies;
pub mod temporal;

pub use aead::*;
pub use auth::*;
pub use commitment::*;
pub use ecies::*;
pub use temporal::*;

/// Crate-local crypto failures. Converted into the workspace-wide
/// `eecp_protocol::EecpError` taxonomy at the boundary (see `From` impl
/// below) so callers outside this crate never match on `CryptoError`
/// directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key id mismatch")]
    KeyIdMismatch,

    #[error("AEAD authentication failed")]
    AuthFailure,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("recipient not found in encrypted message")]
    RecipientNotFound,

    #[error("ECIES operation failed: {0}")]
    EciesFailed(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("malformed key id: {0}")]
    MalformedKeyId(String),
}

impl From<CryptoError> for eecp_protocol::EecpError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::KeyIdMismatch => eecp_protocol::EecpError::KeyIdMismatch,
            CryptoError::AuthFailure => eecp_protocol::EecpError::AuthFailure,
            CryptoError::SignatureInvalid => {
                eecp_protocol::EecpError::Unauthorized("bad signature".into())
            }
            CryptoError::InvalidKey(_)
            | CryptoError::RecipientNotFound
            | CryptoError::EciesFailed(_)
            | CryptoError::MalformedKeyId(_) => eecp_protocol::EecpError::Internal,
        }
    }
}
