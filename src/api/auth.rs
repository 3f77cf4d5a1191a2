//! Registration, login, logout, and the session extractor.
//!
//! The session token is 32 random bytes, hex-encoded, handed to the client
//! in an HTTP-only cookie and stored server-side as a SHA-256 hash (in the
//! `sessions` table and mirrored on the creator row). Mutating endpoints
//! authenticate by taking a [`Creator`] extractor argument, which resolves
//! the cookie to a non-expired session before the handler body runs.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_email, validate_password, validate_store_name, validate_title, validate_user_name,
};
use super::Success;
use crate::db::{counters, Creator, CounterKind, LoginRequest, RegisterRequest, Session};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint a session for `creator_id` and return the raw token.
///
/// The token hash lands in the `sessions` table and is mirrored on the
/// creator row.
pub(crate) async fn create_session(
    state: &AppState,
    creator_id: i64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = chrono::Utc::now();
    let expires_at = now
        + chrono::Duration::days(state.config.auth.session_ttl_days);

    let mut tx = state.db.begin().await?;
    sqlx::query(
        "INSERT INTO sessions (id, creator_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(creator_id)
    .bind(&token_hash)
    .bind(expires_at.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE creators SET session_token = ? WHERE id = ?")
        .bind(&token_hash)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(token)
}

/// Resolve a session cookie to its creator, or fail with 401.
pub(crate) async fn session_creator(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Creator, ApiError> {
    let token = jar
        .get(&state.config.auth.cookie_name)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("authentication required"))?;

    let token_hash = hash_token(&token);
    let now = chrono::Utc::now().to_rfc3339();

    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?",
    )
    .bind(&token_hash)
    .bind(&now)
    .fetch_optional(&state.db)
    .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("authentication required"))?;

    let creator: Option<Creator> = sqlx::query_as("SELECT * FROM creators WHERE id = ?")
        .bind(session.creator_id)
        .fetch_optional(&state.db)
        .await?;

    creator.ok_or_else(|| ApiError::unauthorized("authentication required"))
}

/// Extractor for the current authenticated creator
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Creator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        session_creator(state, &jar).await
    }
}

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_user_name(&req.user_name) {
        errors.add("userName", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_title(&req.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_store_name(&req.store_name) {
        errors.add("storeName", e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }

    errors.finish()
}

/// Register a new creator
///
/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Success<String>>), ApiError> {
    let req = RegisterRequest {
        user_name: req.user_name.trim().to_string(),
        email: req.email.trim().to_string(),
        title: req.title.trim().to_string(),
        store_name: req.store_name.trim().to_string(),
        password: req.password,
        confirm_password: req.confirm_password,
    };

    validate_register_request(&req)?;

    // Mismatch is checked before any database access
    if req.password != req.confirm_password {
        return Err(ApiError::bad_request("passwords do not match"));
    }

    // Hash before opening the transaction; argon2 is deliberately slow
    let hashed_password = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("failed to hash password: {}", e)))?;

    // Existence checks, insert, and counter bump share one transaction.
    // The UNIQUE constraints backstop the check-then-insert race between
    // concurrent registrations.
    let mut tx = state.db.begin().await?;

    let (email_taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM creators WHERE email = ?)")
            .bind(&req.email)
            .fetch_one(&mut *tx)
            .await?;
    if email_taken {
        return Err(ApiError::bad_request(format!(
            "user with email '{}' already exists",
            req.email
        )));
    }

    let (store_taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM creators WHERE store_name = ?)")
            .bind(&req.store_name)
            .fetch_one(&mut *tx)
            .await?;
    if store_taken {
        return Err(ApiError::bad_request(format!(
            "the storename '{}' is already taken",
            req.store_name
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO creators (user_name, email, store_name, hashed_password, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&req.user_name)
    .bind(&req.email)
    .bind(&req.store_name)
    .bind(&hashed_password)
    .bind(&req.title)
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::bad_request("email or store name already taken")
        } else {
            ApiError::from(e)
        }
    })?;

    counters::adjust(&mut tx, CounterKind::Creators, 1).await?;
    tx.commit().await?;

    tracing::info!(creator_id = id, store = %req.store_name, "Creator registered");

    Ok((
        StatusCode::CREATED,
        Json(Success {
            success: format!("UserId: {}", id),
        }),
    ))
}

/// Login and set the session cookie
///
/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Success<&'static str>>), ApiError> {
    let email = req.email.trim();

    // Same response for unknown email and wrong password
    let invalid = || ApiError::unauthorized("invalid email or password");

    let creator: Option<Creator> = sqlx::query_as("SELECT * FROM creators WHERE email = ?")
        .bind(email)
        .fetch_optional(&state.db)
        .await?;

    let creator = creator.ok_or_else(invalid)?;

    if !verify_password(&req.password, &creator.hashed_password) {
        return Err(invalid());
    }

    let token = create_session(&state, creator.id).await?;

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), token))
        .http_only(true)
        .path("/")
        .build();

    tracing::info!(creator_id = creator.id, "Login successful");

    Ok((
        jar.add(cookie),
        Json(Success {
            success: "login successful",
        }),
    ))
}

/// Invalidate the session. Idempotent; succeeds with or without a session.
///
/// GET /logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Success<&'static str>>), ApiError> {
    if let Some(cookie) = jar.get(&state.config.auth.cookie_name) {
        let token_hash = hash_token(cookie.value());

        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(&state.db)
            .await?;
        sqlx::query("UPDATE creators SET session_token = NULL WHERE session_token = ?")
            .bind(&token_hash)
            .execute(&state.db)
            .await?;
    }

    let mut removal = Cookie::new(state.config.auth.cookie_name.clone(), "");
    removal.set_path("/");

    Ok((
        jar.remove(removal),
        Json(Success {
            success: "logged out",
        }),
    ))
}
