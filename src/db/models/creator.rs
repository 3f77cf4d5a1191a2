//! Creator (store owner) model and response shapes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered store owner. `session_token` holds the hash of the current
/// session token and is cleared at logout; `connections_count` is bumped by
/// the public connect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Creator {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub store_name: String,
    pub hashed_password: String,
    pub title: String,
    pub whatsapp: String,
    pub instagram: String,
    pub profile_image_url: String,
    pub session_token: Option<String>,
    pub connections_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Public projection of a creator, as returned by `GET /creators`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CreatorListing {
    pub id: i64,
    pub user_name: String,
    pub title: String,
    pub store_name: String,
    #[sqlx(rename = "profile_image_url")]
    pub profile: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub email: String,
    #[serde(default)]
    pub title: String,
    pub store_name: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProfileRequest {
    pub user_name: String,
    pub store_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub instagram: String,
}

/// Profile fields echoed back by `POST /profile`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_name: String,
    pub store_name: String,
    pub title: String,
    pub whatsapp: String,
    pub instagram: String,
}

