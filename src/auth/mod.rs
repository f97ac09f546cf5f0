//! Credentials and sessions.
//!
//! Two concerns live here: the credential store (argon2-hashed passwords,
//! unique usernames) and the session authority (opaque bearer tokens in a
//! cookie, stored server-side as a sha256 hash with a fixed expiry).
//! Route guards are axum extractors: `AuthUser` redirects anonymous
//! visitors to the login page, `MaybeUser` just resolves the identity.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{DbPool, Session, User};
use crate::ui::flash;
use crate::AppState;

/// Name of the session token cookie.
pub const SESSION_COOKIE: &str = "photoshed_session";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username already exists")]
    DuplicateUsername,

    // Deliberately the same message for unknown user and wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password hashing failed")]
    Hash,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::Hash)?;
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
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------

/// Register a new user. Uniqueness is enforced by the database, so two
/// concurrent registrations with the same username cannot both succeed.
pub async fn create_user(pool: &DbPool, username: &str, password: &str) -> Result<User, AuthError> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let password_hash = hash_password(password)?;

    sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(username)
        .bind(&password_hash)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
                AuthError::DuplicateUsername
            }
            _ => AuthError::Database(e),
        })?;

    tracing::info!(username = %username, "Registered new user");

    Ok(User {
        id,
        username: username.to_string(),
        password_hash,
        created_at: now,
    })
}

/// Check a username/password pair. The error never reveals whether the
/// username exists.
pub async fn verify_credentials(
    pool: &DbPool,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let user = user.ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

// ---------------------------------------------------------------------
// Session authority
// ---------------------------------------------------------------------

/// Issue a session for a logged-in user and return the raw token. Only
/// the token's hash is persisted.
pub async fn create_session(pool: &DbPool, user: &User, ttl_secs: i64) -> Result<String, AuthError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = chrono::Utc::now();
    let expires_at = (now + chrono::Duration::seconds(ttl_secs)).to_rfc3339();

    // Expired sessions are already invisible to lookups; drop their rows
    // here so the table does not grow without bound.
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;

    let session_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(&user.id)
    .bind(&token_hash)
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(token)
}

/// Resolve a token to its user. Absent, expired, or tampered tokens all
/// come back as `Ok(None)`; callers decide how to react.
pub async fn current_user(pool: &DbPool, token: &str) -> Result<Option<User>, AuthError> {
    let token_hash = hash_token(token);
    let session: Option<Session> =
        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(&token_hash)
            .bind(chrono::Utc::now().to_rfc3339())
            .fetch_optional(pool)
            .await?;

    let session = match session {
        Some(s) => s,
        None => return Ok(None),
    };

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Destroy the session behind a token. Unknown tokens are a no-op.
pub async fn destroy_session(pool: &DbPool, token: &str) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------
// Route guards
// ---------------------------------------------------------------------

fn cookie_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Rejection for `AuthUser`: send the visitor to the login page with a
/// notice instead of serving an error page.
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let jar = flash::error(CookieJar::new(), "Please log in to access this page");
        (jar, Redirect::to("/users/login")).into_response()
    }
}

/// Extractor requiring an authenticated user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_token(parts).ok_or(AuthRedirect)?;
        match current_user(&state.db, &token).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(AuthRedirect),
            Err(e) => {
                tracing::error!("Failed to resolve session: {}", e);
                Err(AuthRedirect)
            }
        }
    }
}

/// Extractor resolving the viewer's identity without requiring one.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = match cookie_token(parts) {
            Some(t) => t,
            None => return Ok(MaybeUser(None)),
        };
        match current_user(&state.db, &token).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::error!("Failed to resolve session: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}
