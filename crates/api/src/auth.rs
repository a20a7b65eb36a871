//! Caller identity extraction.
//!
//! Authentication happens upstream; requests arrive with the authenticated
//! user's id in the `x-user-id` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use store::{User, UserDirectory};

use crate::error::ApiError;
use crate::routes::travel_orders::{AppState, AppStore};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: AppStore> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| UserId::parse(value.trim()))
            .ok_or(ApiError::Unauthenticated)?;

        let user = state
            .store
            .find_user(id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(CurrentUser(user))
    }
}
