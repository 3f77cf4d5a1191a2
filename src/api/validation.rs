//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for a plausible email address
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$"
    ).unwrap();

    /// Regex for store names (lowercase alphanumeric with dashes)
    static ref STORE_NAME_REGEX: Regex = Regex::new(
        r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$"
    ).unwrap();

    /// Regex for http(s) asset URLs
    static ref IMAGE_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*(:\d+)?(/[-a-zA-Z0-9_%&=+@~.]+)*/?$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email is required".to_string());
    }

    if email.len() > 254 {
        return Err("email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("invalid email format".to_string());
    }

    Ok(())
}

/// Validate a display user name (4-32 chars)
pub fn validate_user_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("user name is required".to_string());
    }

    if name.len() < 4 {
        return Err("user name is too short (min 4 characters)".to_string());
    }

    if name.len() > 32 {
        return Err("user name is too long (max 32 characters)".to_string());
    }

    Ok(())
}

/// Validate a store name (4-32 chars, lowercase alphanumeric with dashes)
pub fn validate_store_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("store name is required".to_string());
    }

    if name.len() < 4 {
        return Err("store name is too short (min 4 characters)".to_string());
    }

    if name.len() > 32 {
        return Err("store name is too long (max 32 characters)".to_string());
    }

    if !STORE_NAME_REGEX.is_match(name) {
        return Err(
            "store name must be lowercase alphanumeric with dashes, starting and ending with alphanumeric".to_string()
        );
    }

    Ok(())
}

/// Validate a password (8-32 chars)
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password is required".to_string());
    }

    if password.len() < 8 {
        return Err("password is too short (min 8 characters)".to_string());
    }

    if password.len() > 32 {
        return Err("password is too long (max 32 characters)".to_string());
    }

    Ok(())
}

/// Validate a storefront title (optional, max 64 chars)
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.len() > 64 {
        return Err("title is too long (max 64 characters)".to_string());
    }

    Ok(())
}

/// Validate a social handle (optional, max 64 chars)
pub fn validate_handle(field_name: &str, handle: &str) -> Result<(), String> {
    if handle.len() > 64 {
        return Err(format!("{} is too long (max 64 characters)", field_name));
    }

    Ok(())
}

/// Validate a product name (1-64 chars)
pub fn validate_product_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("product name is required".to_string());
    }

    if name.len() > 64 {
        return Err("product name is too long (max 64 characters)".to_string());
    }

    Ok(())
}

/// Validate a product description (max 1024 chars)
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.len() > 1024 {
        return Err("description is too long (max 1024 characters)".to_string());
    }

    Ok(())
}

/// Validate a product price
pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("price must be a number".to_string());
    }

    if price <= 0.0 {
        return Err("price must be greater than 0".to_string());
    }

    if price > 1_000_000.0 {
        return Err("price is too high (max 1000000)".to_string());
    }

    Ok(())
}

/// Validate an image URL
pub fn validate_image_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("image URL is required".to_string());
    }

    if url.len() > 2048 {
        return Err("image URL is too long (max 2048 characters)".to_string());
    }

    if !IMAGE_URL_REGEX.is_match(url) {
        return Err("invalid image URL, must be an HTTP(S) URL".to_string());
    }

    Ok(())
}
