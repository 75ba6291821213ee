//! Authentication layer.
//!
//! Bearer tokens are opaque session identifiers stored in the `sessions`
//! table rather than JSON web tokens; the role attached to a request is
//! always looked up from the user record, never trusted from the client.

use anyhow::{anyhow, Context as _};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::{models::Role, AppState, Error};

/// Hash a password with argon2 and a fresh salt.
pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), salt.as_salt())
        .context("failed to hash password")?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored argon2 hash. A malformed stored hash
/// counts as a failed verification, not an internal error.
pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// The principal behind an authenticated request, passed explicitly into
/// handlers as an axum extractor.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    id: String,
    role: Role,
}

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Fail with 403 unless the principal holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), Error> {
        if self.role == role {
            Ok(())
        } else {
            Err(Error::forbidden(anyhow!(
                "this operation requires the {role:?} role"
            )))
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    role: Role,
    expires_at: DateTime<Utc>,
}

fn bearer_token(parts: &axum::http::request::Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            counter!(crate::metrics::AUTH_FAILED).increment(1);
            return Err(Error::unauthorized(anyhow!("no bearer token provided")));
        };

        let session = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT s.user_id, u.role, s.expires_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&state.db)
        .await
        .map_err(anyhow::Error::new)?;

        match session {
            Some(s) if s.expires_at > Utc::now() => Ok(Self {
                id: s.user_id,
                role: s.role,
            }),
            _ => {
                counter!(crate::metrics::AUTH_FAILED).increment(1);
                Err(Error::unauthorized(anyhow!("invalid or expired session")))
            }
        }
    }
}

// Routes like `GET /hoardings/{id}` are public but show more to the listing's
// owner, so the extractor also comes in an optional flavor. A missing header
// is anonymous; a bad token is still an error.
impl OptionalFromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(None);
        }

        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}
