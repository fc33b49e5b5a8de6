use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender_enum", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// User record in the database.
#[derive(Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,         // stored lowercased
    pub password_hash: String, // Argon2 PHC string, never leaves this crate
    pub phone: String,
    pub first_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub location_info: Option<String>,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub first_name: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub gender: Gender,
    pub location_info: Option<String>,
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            phone: u.phone,
            first_name: u.first_name,
            birth_date: u.birth_date,
            gender: u.gender,
            location_info: u.location_info,
            bio: u.bio,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            phone: "+15551234567".into(),
            first_name: "Ann".into(),
            birth_date: date!(1990 - 01 - 01),
            gender: Gender::Female,
            location_info: None,
            bio: Some("hi".into()),
            created_at: datetime!(2024-03-01 12:00:00 UTC),
        }
    }

    #[test]
    fn public_user_json_has_no_password() {
        let json = serde_json::to_value(PublicUser::from(record())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["birth_date"], "1990-01-01");
        assert_eq!(json["gender"], "female");
        assert_eq!(json["created_at"], "2024-03-01T12:00:00Z");
        assert!(json["location_info"].is_null());
    }

    #[test]
    fn debug_redacts_hash() {
        let printed = format!("{:?}", record());
        assert!(!printed.contains("argon2"));
        assert!(printed.contains("<redacted>"));
    }
}
