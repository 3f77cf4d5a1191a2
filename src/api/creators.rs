//! Creator-facing endpoints: dashboard, profile management, and the public
//! store/creator browsing surface.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_handle, validate_store_name, validate_title, validate_user_name,
};
use super::Success;
use crate::db::{
    counters, CounterKind, Creator, CreatorListing, EditProfileRequest, MarketListing,
    ProductThumb, ProfileResponse,
};
use crate::storage::cleanup;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub id: i64,
    pub user_name: String,
    pub store_name: String,
    pub title: String,
    pub whatsapp: String,
    pub instagram: String,
    pub profile: String,
    pub connections: i64,
    pub products: Vec<ProductThumb>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub user_name: String,
    pub store_name: String,
    pub title: String,
    pub whatsapp: String,
    pub instagram: String,
    pub profile: String,
    pub connections: i64,
    pub products: Vec<MarketListing>,
}

/// The logged-in creator's own storefront overview
///
/// GET /dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    creator: Creator,
) -> Result<Json<Success<DashboardResponse>>, ApiError> {
    let products: Vec<ProductThumb> =
        sqlx::query_as("SELECT id, image_url FROM products WHERE owner_id = ? ORDER BY created_at DESC")
            .bind(creator.id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(Success {
        success: DashboardResponse {
            id: creator.id,
            user_name: creator.user_name,
            store_name: creator.store_name,
            title: creator.title,
            whatsapp: creator.whatsapp,
            instagram: creator.instagram,
            profile: creator.profile_image_url,
            connections: creator.connections_count,
            products,
        },
    }))
}

fn validate_edit_request(req: &EditProfileRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_user_name(&req.user_name) {
        errors.add("userName", e);
    }
    if let Err(e) = validate_store_name(&req.store_name) {
        errors.add("storeName", e);
    }
    if let Err(e) = validate_title(&req.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_handle("whatsapp", &req.whatsapp) {
        errors.add("whatsapp", e);
    }
    if let Err(e) = validate_handle("instagram", &req.instagram) {
        errors.add("instagram", e);
    }

    errors.finish()
}

/// Update the mutable profile fields
///
/// POST /profile
pub async fn edit_profile(
    State(state): State<Arc<AppState>>,
    creator: Creator,
    Json(req): Json<EditProfileRequest>,
) -> Result<(StatusCode, Json<Success<ProfileResponse>>), ApiError> {
    let req = EditProfileRequest {
        user_name: req.user_name.trim().to_string(),
        store_name: req.store_name.trim().to_string(),
        title: req.title.trim().to_string(),
        whatsapp: req.whatsapp.trim().to_string(),
        instagram: req.instagram.trim().to_string(),
    };

    validate_edit_request(&req)?;

    // "Taken by someone else" is an error, keeping my own name is a no-op
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM creators WHERE store_name = ? AND id != ?)",
    )
    .bind(&req.store_name)
    .bind(creator.id)
    .fetch_one(&state.db)
    .await?;
    if taken {
        return Err(ApiError::bad_request(format!(
            "the storename '{}' is already taken",
            req.store_name
        )));
    }

    sqlx::query(
        r#"
        UPDATE creators
        SET user_name = ?, store_name = ?, title = ?, whatsapp = ?, instagram = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.user_name)
    .bind(&req.store_name)
    .bind(&req.title)
    .bind(&req.whatsapp)
    .bind(&req.instagram)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(creator.id)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Success {
            success: ProfileResponse {
                user_name: req.user_name,
                store_name: req.store_name,
                title: req.title,
                whatsapp: req.whatsapp,
                instagram: req.instagram,
            },
        }),
    ))
}

/// Delete the account, its products, and queue their assets for cleanup
///
/// DELETE /profile
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    creator: Creator,
) -> Result<Json<Success<&'static str>>, ApiError> {
    let mut tx = state.db.begin().await?;

    // 1. Collect the product image URLs, then delete the rows
    let image_urls: Vec<(String,)> =
        sqlx::query_as("SELECT image_url FROM products WHERE owner_id = ?")
            .bind(creator.id)
            .fetch_all(&mut *tx)
            .await?;

    let deleted = sqlx::query("DELETE FROM products WHERE owner_id = ?")
        .bind(creator.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    // 2. Counter follows the rows within the same transaction
    counters::adjust(&mut tx, CounterKind::Products, -(deleted as i64)).await?;

    // 3. Storage deletion is decoupled: outbox rows, drained in the background
    for (url,) in &image_urls {
        cleanup::enqueue(&mut tx, url).await?;
    }
    cleanup::enqueue(&mut tx, &creator.profile_image_url).await?;

    // 4. The creator row itself (sessions cascade)
    sqlx::query("DELETE FROM creators WHERE id = ?")
        .bind(creator.id)
        .execute(&mut *tx)
        .await?;

    // 5. Creator counter
    counters::adjust(&mut tx, CounterKind::Creators, -1).await?;

    tx.commit().await?;

    tracing::info!(
        creator_id = creator.id,
        products = deleted,
        "Creator account deleted"
    );

    Ok(Json(Success {
        success: "account deleted",
    }))
}

/// Public creator directory
///
/// GET /creators
pub async fn list_creators(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<CreatorListing>>>, ApiError> {
    let creators: Vec<CreatorListing> = sqlx::query_as(
        "SELECT id, user_name, title, store_name, profile_image_url FROM creators ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Success { success: creators }))
}

/// Public storefront page by store name
///
/// GET /store/:store_name
pub async fn store_by_name(
    State(state): State<Arc<AppState>>,
    Path(store_name): Path<String>,
) -> Result<Json<Success<StoreResponse>>, ApiError> {
    let creator: Option<Creator> = sqlx::query_as("SELECT * FROM creators WHERE store_name = ?")
        .bind(&store_name)
        .fetch_optional(&state.db)
        .await?;

    let creator = creator
        .ok_or_else(|| ApiError::not_found(format!("store '{}' not found", store_name)))?;

    let products: Vec<MarketListing> = sqlx::query_as(
        "SELECT id, name, description, image_url, price FROM products WHERE owner_id = ? ORDER BY created_at DESC",
    )
    .bind(creator.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Success {
        success: StoreResponse {
            user_name: creator.user_name,
            store_name: creator.store_name,
            title: creator.title,
            whatsapp: creator.whatsapp,
            instagram: creator.instagram,
            profile: creator.profile_image_url,
            connections: creator.connections_count,
            products,
        },
    }))
}

/// Public popularity counter; unauthenticated and unguarded on purpose
///
/// GET /connects/:store_name
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Path(store_name): Path<String>,
) -> Result<Json<Success<&'static str>>, ApiError> {
    let updated = sqlx::query(
        "UPDATE creators SET connections_count = connections_count + 1 WHERE store_name = ?",
    )
    .bind(&store_name)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found(format!(
            "store '{}' not found",
            store_name
        )));
    }

    Ok(Json(Success {
        success: "+1 connection",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testutil::{alice_creator, register_alice, test_state};
    use crate::api::ErrorCode;
    use crate::db::CreateProductRequest;

    async fn add_product(state: &Arc<AppState>, n: u32) {
        let creator = alice_creator(state).await;
        super::super::products::create_product(
            State(state.clone()),
            creator,
            Json(CreateProductRequest {
                name: format!("print {}", n),
                description: "a linocut print".into(),
                price: 15.0,
                image: format!("https://images.example.com/atelier/product_{}.png", n),
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_lists_own_products() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();
        add_product(&state, 1).await;
        add_product(&state, 2).await;

        let creator = alice_creator(&state).await;
        let Json(body) = dashboard(State(state.clone()), creator).await.unwrap();
        assert_eq!(body.success.store_name, "alicestore");
        assert_eq!(body.success.products.len(), 2);
        assert_eq!(body.success.connections, 0);
    }

    #[tokio::test]
    async fn test_edit_profile_keeps_own_store_name() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();
        let creator = alice_creator(&state).await;

        let (status, Json(body)) = edit_profile(
            State(state.clone()),
            creator,
            Json(EditProfileRequest {
                user_name: "alice the painter".into(),
                store_name: "alicestore".into(), // unchanged
                title: "oil paintings".into(),
                whatsapp: "+3161234".into(),
                instagram: "@alice".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.success.user_name, "alice the painter");

        let updated = alice_creator(&state).await;
        assert_eq!(updated.title, "oil paintings");
    }

    #[tokio::test]
    async fn test_edit_profile_rejects_taken_store_name() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();

        // Second creator holding the contested name
        super::super::auth::register(
            State(state.clone()),
            Json(crate::db::RegisterRequest {
                user_name: "bob the potter".into(),
                email: "b@x.com".into(),
                title: "".into(),
                store_name: "bobstore".into(),
                password: "secret123".into(),
                confirm_password: "secret123".into(),
            }),
        )
        .await
        .unwrap();

        let creator = alice_creator(&state).await;
        let err = edit_profile(
            State(state.clone()),
            creator,
            Json(EditProfileRequest {
                user_name: "alice".into(),
                store_name: "bobstore".into(),
                title: "".into(),
                whatsapp: "".into(),
                instagram: "".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(err.message().contains("bobstore"));
    }

    #[tokio::test]
    async fn test_delete_profile_cascades_counters_and_outbox() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();
        add_product(&state, 1).await;
        add_product(&state, 2).await;
        add_product(&state, 3).await;

        assert_eq!(
            counters::read(&state.db, CounterKind::Products)
                .await
                .unwrap(),
            3
        );

        let creator = alice_creator(&state).await;
        delete_profile(State(state.clone()), creator).await.unwrap();

        assert_eq!(
            counters::read(&state.db, CounterKind::Products)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            counters::read(&state.db, CounterKind::Creators)
                .await
                .unwrap(),
            0
        );

        // Product assets are queued for background deletion
        let (queued,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM asset_cleanup")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(queued, 3);

        // The store is gone
        let err = store_by_name(State(state.clone()), Path("alicestore".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_store_by_name_unknown_is_not_found() {
        let state = test_state().await;
        let err = store_by_name(State(state), Path("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_connect_increments_without_auth() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();

        for _ in 0..3 {
            let Json(body) = connect(State(state.clone()), Path("alicestore".into()))
                .await
                .unwrap();
            assert_eq!(body.success, "+1 connection");
        }

        let creator = alice_creator(&state).await;
        assert_eq!(creator.connections_count, 3);

        let err = connect(State(state), Path("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_list_creators_projection() {
        let state = test_state().await;
        register_alice(&state).await.unwrap();

        let Json(body) = list_creators(State(state)).await.unwrap();
        assert_eq!(body.success.len(), 1);
        assert_eq!(body.success[0].store_name, "alicestore");
        assert_eq!(body.success[0].user_name, "alice");
    }
}
