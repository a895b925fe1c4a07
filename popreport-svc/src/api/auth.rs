//! Access password gating
//!
//! Protected routes require the configured password in the
//! `x-access-password` header or the `password` query parameter. Without a
//! configured password every request passes.

use axum::{
    extract::{rejection::JsonRejection, Query, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::Success;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the access password
pub const PASSWORD_HEADER: &str = "x-access-password";

#[derive(Debug, Deserialize)]
struct PasswordQuery {
    password: Option<String>,
}

/// Reject requests without the access password
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.access_password.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            Query::<PasswordQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(q)| q.password)
        });

    match provided {
        Some(password) if passwords_match(&password, expected) => Ok(next.run(request).await),
        _ => {
            warn!(path = %request.uri().path(), "Rejected request: invalid password");
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Verified {}

/// POST /api/verify-password
pub async fn verify_password(
    State(state): State<AppState>,
    body: Result<Json<VerifyPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Success<Verified>>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let accepted = match state.access_password.as_deref() {
        None => true,
        Some(expected) => request
            .password
            .as_deref()
            .is_some_and(|p| passwords_match(p, expected)),
    };

    if accepted {
        Ok(Success::json(Verified {}))
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Compare without short-circuiting on the first differing byte
fn passwords_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
