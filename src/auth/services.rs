use std::{fmt, sync::Arc};

use serde::Serialize;
use time::{macros::format_description, Date, Duration};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{PasswordError, PasswordHasher},
        repo::{StoreError, UserStore},
        repo_types::{Gender, PublicUser, UserRecord},
        token::{TokenError, TokenMaker},
    },
    clock::Clock,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid birth date: {0}")]
    InvalidBirthDate(#[from] time::error::Parse),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Hashing(#[from] PasswordError),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Registration data that already passed request validation.
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub phone: String,
    pub first_name: String,
    pub birth_date: String, // YYYY-MM-DD
    pub gender: Gender,
    pub location_info: Option<String>,
    pub bio: Option<String>,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("first_name", &self.first_name)
            .field("birth_date", &self.birth_date)
            .field("gender", &self.gender)
            .finish_non_exhaustive()
    }
}

/// Result of a successful login.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: PublicUser,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_birth_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
}

/// Registration and login on top of a [`UserStore`] and a [`TokenMaker`].
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenMaker>,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    token_ttl: Duration,
    // Verified against when the email is unknown so both login failures cost one hash.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenMaker>,
        clock: Arc<dyn Clock>,
        token_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new();
        let dummy_hash = hasher.hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            tokens,
            clock,
            hasher,
            token_ttl,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenMaker> {
        &self.tokens
    }

    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser, AuthError> {
        let birth_date = parse_birth_date(&input.birth_date).map_err(|e| {
            warn!(error = %e, "invalid birth date");
            AuthError::InvalidBirthDate(e)
        })?;

        let password_hash = self.hasher.hash_password(&input.password)?;

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: normalize_email(&input.email),
            password_hash,
            phone: input.phone,
            first_name: input.first_name,
            birth_date,
            gender: input.gender,
            location_info: input.location_info,
            bio: input.bio,
            created_at: self.clock.now(),
        };

        // No pre-check: the store's unique constraint is the only authority.
        let user = self.store.insert(record).await.map_err(|e| match e {
            StoreError::UniqueViolation => {
                warn!("email already registered");
                AuthError::DuplicateEmail
            }
            other => {
                error!(error = %other, "insert user failed");
                AuthError::Store(other)
            }
        })?;

        info!(user_id = %user.id, "user registered");
        Ok(user.into())
    }

    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let user = match self.store.find_by_email(&email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                // Timing only; see `dummy_hash`. The outcome is always InvalidCredentials.
                let _ = self.hasher.verify_password(password, &self.dummy_hash);
                warn!("login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(AuthError::Store(e));
            }
        };

        if !self.hasher.verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.issue(user.id, self.token_ttl).map_err(|e| {
            error!(error = %e, "token issuance failed");
            AuthError::Token(e)
        })?;

        info!(user_id = %user.id, "user logged in");
        Ok(AuthSession {
            access_token,
            user: user.into(),
        })
    }

    /// Profile of an already authenticated user.
    #[instrument(skip(self))]
    pub async fn current_user(&self, id: Uuid) -> Result<PublicUser, AuthError> {
        match self.store.find_by_id(id).await {
            Ok(u) => Ok(u.into()),
            Err(StoreError::NotFound) => {
                warn!("token subject no longer exists");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!(error = %e, "find_by_id failed");
                Err(AuthError::Store(e))
            }
        }
    }
}
