//! Invitation endpoints.
//!
//! The invite code is the invited email address, base64-encoded. It offers
//! no secrecy; it only carries the address through a link so the join page
//! can pre-fill it.

use axum::{extract::State, Json};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::validate_email;
use super::Success;
use crate::db::Creator;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub invite_email: String,
    pub invited_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub email_invite: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub email_invite: String,
}

/// Encode an email address as an invite code.
pub fn encode_invite_code(email: &str) -> String {
    BASE64.encode(email.as_bytes())
}

/// Decode an invite code back to the email address it carries.
pub fn decode_invite_code(code: &str) -> Result<String, ApiError> {
    let bytes = BASE64
        .decode(code.trim())
        .map_err(|_| ApiError::validation_field("emailInvite", "invalid invite code"))?;
    String::from_utf8(bytes)
        .map_err(|_| ApiError::validation_field("emailInvite", "invalid invite code"))
}

/// Email an invite code to an unregistered address
///
/// POST /invite
pub async fn invite(
    State(state): State<Arc<AppState>>,
    creator: Creator,
    Json(req): Json<InviteRequest>,
) -> Result<Json<Success<&'static str>>, ApiError> {
    let invite_email = req.invite_email.trim().to_string();
    let invited_by = req.invited_by.trim().to_string();

    if let Err(e) = validate_email(&invite_email) {
        return Err(ApiError::validation_field("inviteEmail", e));
    }

    let (registered,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM creators WHERE email = ?)")
            .bind(&invite_email)
            .fetch_one(&state.db)
            .await?;
    if registered {
        return Err(ApiError::bad_request("user is already registered"));
    }

    let code = encode_invite_code(&invite_email);

    // Best effort: a failed send is logged, never surfaced
    if let Err(e) = state
        .mailer
        .send_invite_email(&invite_email, &invited_by, &code)
        .await
    {
        tracing::warn!(
            to = %invite_email,
            inviter = creator.id,
            error = %e,
            "Failed to send invite email"
        );
    }

    Ok(Json(Success {
        success: "invite sent successfully",
    }))
}

/// Decode an invite code for the join page
///
/// POST /join
pub async fn join(Json(req): Json<JoinRequest>) -> Result<Json<JoinResponse>, ApiError> {
    let email_invite = decode_invite_code(&req.email_invite)?;

    Ok(Json(JoinResponse { email_invite }))
}
