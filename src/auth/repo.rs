use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::UserRecord;

/// Type-erased backend error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    UniqueViolation,
    #[error("user not found")]
    NotFound,
    #[error("user store failure: {0}")]
    Backend(#[source] BoxError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

/// Durable user persistence. Email uniqueness is enforced atomically by the
/// implementation, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, phone, first_name, birth_date, gender, \
                            location_info, bio, created_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Create a new user; the unique index on `lower(email)` decides duplicates.
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.phone)
            .bind(&user.first_name)
            .bind(user.birth_date)
            .bind(user.gender)
            .bind(&user.location_info)
            .bind(&user.bio)
            .bind(user.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    /// Find a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }
}
