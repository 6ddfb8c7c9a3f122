use crate::state;
use crate::types::user;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, api_error, internal_error};

/// The authenticated user, attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub(crate) user::User);

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if is_auth_bypass_path(req.uri().path()) {
        return next.run(req).await;
    }

    let Some(token) = bearer_token(req.headers()) else {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "Access denied. No token provided.",
        )
        .into_response();
    };

    let user = state
        .auth
        .verify_token(token)
        .ok()
        .and_then(|user_id| state.store.user_by_id(user_id))
        .filter(|user| user.is_active);

    match user {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "Invalid token.").into_response(),
    }
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/health"
        || path == "/auth/register"
        || path == "/auth/login"
        || path == "/sync"
        || path.starts_with("/notes/pdf/")
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct AuthResponse {
    success: bool,
    token: String,
    user: PublicUser,
}

#[derive(Serialize)]
pub(crate) struct PublicUser {
    id: Uuid,
    username: String,
    email: String,
}

pub(crate) async fn register(
    State(state): State<state::AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_string();

    user::validate_username(&username)
        .and_then(|_| user::validate_email(&email))
        .and_then(|_| user::validate_password(&body.password))
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let password_hash = hash_password(&body.password).map_err(|err| {
        eprintln!("failed to hash password: {err}");
        internal_error()
    })?;

    let created = state.store.create_user(crate::ports::NewUser {
        username,
        email,
        password_hash,
    });
    let user = created.map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            "User with this email or username already exists",
        )
    })?;

    let token = state.auth.issue_token(user.id).map_err(|err| {
        eprintln!("failed to issue auth token: {err}");
        internal_error()
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
        }),
    ))
}

pub(crate) async fn login(
    State(state): State<state::AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AuthResponse>, ApiError> {
    let rejected = || api_error(StatusCode::UNAUTHORIZED, "Invalid email or password");

    let user = state
        .store
        .user_by_email(body.email.trim())
        .filter(|user| user.is_active)
        .ok_or_else(rejected)?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(rejected());
    }

    let user = state.store.record_login(user.id).map_err(|err| {
        eprintln!("failed to record login for {}: {err}", user.id);
        internal_error()
    })?;

    let token = state.auth.issue_token(user.id).map_err(|err| {
        eprintln!("failed to issue auth token: {err}");
        internal_error()
    })?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

#[derive(Serialize)]
pub(crate) struct ProfileResponse {
    user: user::Profile,
}

pub(crate) async fn profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: user.profile(),
    })
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}
