//! Product model and response shapes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub owner_id: i64,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub image: String,
}

/// Marketplace projection, as returned by `GET /market`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MarketListing {
    #[sqlx(rename = "id")]
    pub product_id: i64,
    #[sqlx(rename = "name")]
    pub product_name: String,
    #[sqlx(rename = "description")]
    pub product_description: String,
    #[sqlx(rename = "image_url")]
    pub image: String,
    pub price: f64,
}

/// Compact per-store projection used by the dashboard and store pages.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductThumb {
    #[sqlx(rename = "id")]
    pub product_id: i64,
    #[sqlx(rename = "image_url")]
    pub image: String,
}
