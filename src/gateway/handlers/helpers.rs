//! Handler helper functions
//!
//! This module contains shared utilities used by multiple handlers.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;

use crate::core_types::UserId;

use super::super::types::ApiError;

/// Header carrying the caller's identity, set by the enclosing auth layer
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Extract the caller's user id from `X-User-ID`
pub fn extract_user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Missing X-User-ID header"))
}

/// Get current time in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
