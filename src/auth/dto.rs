use std::fmt;

use serde::Deserialize;

use crate::auth::{repo_types::Gender, services::RegisterInput};

/// Request body for user registration.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub phone: String,
    pub first_name: String,
    pub birth_date: String,
    pub gender: Gender,
    #[serde(default)]
    pub location_info: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .finish_non_exhaustive()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl From<CreateUserRequest> for RegisterInput {
    fn from(r: CreateUserRequest) -> Self {
        Self {
            email: r.email,
            password: r.password,
            phone: r.phone,
            first_name: r.first_name,
            birth_date: r.birth_date,
            gender: r.gender,
            location_info: non_empty(r.location_info),
            bio: non_empty(r.bio),
        }
    }
}

/// Request body for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
