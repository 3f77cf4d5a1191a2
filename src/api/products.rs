//! Product endpoints and the public marketplace feed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_description, validate_image_url, validate_price, validate_product_name,
};
use super::Success;
use crate::db::{counters, CounterKind, CreateProductRequest, Creator, MarketListing, Product};
use crate::storage::cleanup;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    pub product_id: i64,
    pub image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetails {
    pub store_name: String,
    pub title: String,
    pub whatsapp: String,
    pub instagram: String,
    pub profile: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: f64,
    pub store_details: StoreDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedProduct {
    pub product_id: i64,
}

fn validate_create_request(req: &CreateProductRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_product_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_price(req.price) {
        errors.add("price", e);
    }
    if let Err(e) = validate_image_url(&req.image) {
        errors.add("image", e);
    }

    errors.finish()
}

/// List a new product under the session creator's store
///
/// POST /product
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    creator: Creator,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Success<CreatedProduct>>), ApiError> {
    let req = CreateProductRequest {
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        price: req.price,
        image: req.image.trim().to_string(),
    };

    validate_create_request(&req)?;

    let mut tx = state.db.begin().await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO products (name, description, price, image_url, owner_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.image)
    .bind(creator.id)
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_one(&mut *tx)
    .await?;

    counters::adjust(&mut tx, CounterKind::Products, 1).await?;
    tx.commit().await?;

    tracing::info!(product_id = id, creator_id = creator.id, "Product listed");

    Ok((
        StatusCode::CREATED,
        Json(Success {
            success: CreatedProduct {
                product_id: id,
                image: req.image,
            },
        }),
    ))
}

/// Public product page with the owning store's details
///
/// GET /product/:product_id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<Json<Success<ProductDetail>>, ApiError> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;

    let product = product.ok_or_else(|| ApiError::not_found("product not found"))?;

    let owner: Creator = sqlx::query_as("SELECT * FROM creators WHERE id = ?")
        .bind(product.owner_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(Success {
        success: ProductDetail {
            name: product.name,
            description: product.description,
            image: product.image_url,
            price: product.price,
            store_details: StoreDetails {
                store_name: owner.store_name,
                title: owner.title,
                whatsapp: owner.whatsapp,
                instagram: owner.instagram,
                profile: owner.profile_image_url,
            },
        },
    }))
}

/// Remove a product; only its owner may do so
///
/// DELETE /product/:product_id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    creator: Creator,
) -> Result<Json<Success<DeletedProduct>>, ApiError> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;

    let product = product.ok_or_else(|| ApiError::not_found("product not found"))?;

    if product.owner_id != creator.id {
        return Err(ApiError::forbidden("you do not own this product"));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(product.id)
        .execute(&mut *tx)
        .await?;
    counters::adjust(&mut tx, CounterKind::Products, -1).await?;
    cleanup::enqueue(&mut tx, &product.image_url).await?;

    tx.commit().await?;

    tracing::info!(product_id, creator_id = creator.id, "Product deleted");

    Ok(Json(Success {
        success: DeletedProduct { product_id },
    }))
}

/// Public marketplace feed across all stores
///
/// GET /market
pub async fn market(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<MarketListing>>>, ApiError> {
    let listings: Vec<MarketListing> = sqlx::query_as(
        "SELECT id, name, description, image_url, price FROM products ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Success { success: listings }))
}
