pub mod auth;
mod creators;
mod error;
mod invites;
mod products;
mod uploads;
mod validation;

pub use error::{ApiError, ErrorCode, ErrorResponse, ValidationErrorBuilder};

use axum::{
    extract::State,
    http::{header, Method},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::{counters, CounterKind};
use crate::AppState;

/// The success response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: T,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Cookie-credentialed CORS needs a concrete origin, so mirror the caller's
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        // Index & public marketplace
        .route("/", get(index))
        .route("/market", get(products::market))
        .route("/creators", get(creators::list_creators))
        .route("/store/:store_name", get(creators::store_by_name))
        .route("/product/:product_id", get(products::get_product))
        .route("/connects/:store_name", get(creators::connect))
        // Accounts & sessions
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        // Session-gated creator surface
        .route("/dashboard", get(creators::dashboard))
        .route("/profile", post(creators::edit_profile))
        .route("/profile", delete(creators::delete_profile))
        .route("/image", post(uploads::upload_image))
        .route("/product", post(products::create_product))
        .route("/product/:product_id", delete(products::delete_product))
        // Invitations
        .route("/invite", post(invites::invite))
        .route("/join", post(invites::join))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCounts {
    pub creator_count: i64,
    pub product_count: i64,
}

/// Marketplace summary, served from the denormalized counters
///
/// GET /
async fn index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<IndexCounts>>, ApiError> {
    let creator_count = counters::read(&state.db, CounterKind::Creators).await?;
    let product_count = counters::read(&state.db, CounterKind::Products).await?;

    Ok(Json(Success {
        success: IndexCounts {
            creator_count,
            product_count,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::testutil::{register_alice, test_state};
    use super::*;

    #[tokio::test]
    async fn test_index_serves_denormalized_counts() {
        let state = test_state().await;

        let Json(body) = index(State(state.clone())).await.unwrap();
        assert_eq!(body.success.creator_count, 0);
        assert_eq!(body.success.product_count, 0);

        register_alice(&state).await.unwrap();

        let Json(body) = index(State(state)).await.unwrap();
        assert_eq!(body.success.creator_count, 1);
        assert_eq!(body.success.product_count, 0);
    }
}
