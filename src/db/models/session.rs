//! Session model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Server-side record for a logged-in session. The client only ever sees
/// the raw token (in the cookie); the database stores its hash.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub creator_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}
