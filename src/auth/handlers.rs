use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{CreateUserRequest, LoginRequest},
        extractors::AuthUser,
        repo_types::PublicUser,
        services::{AuthError, AuthSession, RegisterInput},
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

type ApiError = (StatusCode, String);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login_user))
        .route("/users/me", get(get_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        // E.164
        static ref PHONE_RE: Regex = Regex::new(r"^\+[1-9]\d{1,14}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

fn bad_request(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn validate_create(req: &CreateUserRequest) -> Result<(), ApiError> {
    if !is_valid_email(req.email.trim()) {
        return Err(bad_request("Invalid email"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(bad_request("Password too short"));
    }
    if !is_valid_phone(&req.phone) {
        return Err(bad_request("Invalid phone number"));
    }
    if req.first_name.trim().is_empty() {
        return Err(bad_request("First name is required"));
    }
    Ok(())
}

/// Status mapping. "No such email" and "wrong password" share one response.
fn into_api_error(e: AuthError) -> ApiError {
    match e {
        AuthError::InvalidBirthDate(_) => bad_request("Invalid birth date"),
        AuthError::DuplicateEmail => (StatusCode::CONFLICT, "Email already registered".into()),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".into()),
        other => {
            error!(error = %other, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            )
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Err(rejection) = validate_create(&payload) {
        warn!(reason = %rejection.1, "invalid registration request");
        return Err(rejection);
    }

    let user = state
        .auth
        .register(RegisterInput::from(payload))
        .await
        .map_err(into_api_error)?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    if !is_valid_email(payload.email.trim()) || payload.password.chars().count() < MIN_PASSWORD_LEN
    {
        warn!("invalid login request");
        return Err(bad_request("Invalid login request"));
    }

    let session = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(into_api_error)?;
    Ok(Json(session))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .auth
        .current_user(user_id)
        .await
        .map_err(into_api_error)?;
    Ok(Json(user))
}
