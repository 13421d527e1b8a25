//! Route tables. Each handler picks one policy per guarded action and runs
//! its service call through [`policy_use`](platform_authz::policy_use).

mod accounts;
mod auth;
mod challenges;
mod tags;
mod views;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use platform_api::{ApiError, ApiResult};
use platform_authz::ActorContext;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::http::AppState;

/// Routes that run without a caller, as the system actor.
pub fn public() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/sign-out", post(auth::sign_out))
}

/// Routes that require a bearer token.
pub fn authenticated() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{id}",
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/{id}/sensitive", get(accounts::get_sensitive))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        .route("/challenges", post(challenges::create_challenge))
        .route(
            "/challenges/{id}",
            get(challenges::get_challenge)
                .patch(challenges::update_challenge)
                .delete(challenges::delete_challenge),
        )
        .route("/challenges/{id}/tags/{tag_id}", put(tags::connect_challenge))
        .route(
            "/challenges/{id}/participants",
            get(challenges::list_participants).put(challenges::join_challenge),
        )
        .route(
            "/challenges/{id}/participants/{account_id}",
            delete(challenges::remove_participant),
        )
        .route("/challenges/{id}/likes", put(challenges::like_challenge))
        .route(
            "/challenges/{id}/likes/{account_id}",
            delete(challenges::unlike_challenge),
        )
}

/// The account behind an HTTP actor. Only the system actor lacks one, and it
/// never arrives over HTTP.
fn account_of(actor: &ActorContext) -> ApiResult<Uuid> {
    actor
        .account_id()
        .map(|id| id.into_uuid())
        .ok_or(ApiError::Unauthenticated)
}

fn require_text(field: &str, value: &str, max: usize) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Marks a nullable patch field as present, so `null` reads as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
