use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token duration must be at least one second and end within representable time")]
    InvalidDuration,
    #[error("token secret must be at least {min} bytes")]
    InvalidKeySize { min: usize },
    #[error("failed to issue token: {0}")]
    Issuance(String),
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
}

/// Verified contents of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub id: Uuid,      // token id, fresh per issuance
    pub subject: Uuid, // user id
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Issues and verifies self-contained bearer tokens.
///
/// Implementations hold their key material for the life of the process and are
/// otherwise stateless, so one instance is shared by every request.
pub trait TokenMaker: Send + Sync {
    /// Issue a token for `subject` that expires `duration` from now.
    fn issue(&self, subject: Uuid, duration: Duration) -> Result<String, TokenError>;

    /// Authenticate `token` and return its payload. Fails with
    /// [`TokenError::InvalidToken`] on any integrity problem and
    /// [`TokenError::ExpiredToken`] once the expiry instant is reached.
    fn verify(&self, token: &str) -> Result<TokenPayload, TokenError>;
}
