use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use platform_api::{ApiError, ApiResult};
use platform_authz::policy_use;
use platform_db::AccountPatch;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{
    require_text,
    views::{AccountView, SensitiveAccountView},
};
use crate::http::{Actor, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    display_name: Option<String>,
    /// `null` clears the bio; leaving the field out keeps it.
    #[serde(default, deserialize_with = "super::present")]
    bio: Option<Option<String>>,
}

#[instrument(name = "http.accounts.get", skip(state, actor))]
pub async fn get_account(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AccountView>> {
    let policy = state.policies.account.can_read(id.into());
    let account = policy_use(&actor, &policy, || async {
        state.services.accounts.find(id).await.map_err(ApiError::from)
    })
    .await?;
    Ok(Json(account.into()))
}

#[instrument(name = "http.accounts.get_sensitive", skip(state, actor))]
pub async fn get_sensitive(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SensitiveAccountView>> {
    let policy = state.policies.account.can_read_sensitive(id.into());
    let account = policy_use(&actor, &policy, || async {
        state.services.accounts.find(id).await.map_err(ApiError::from)
    })
    .await?;
    Ok(Json(account.into()))
}

#[instrument(name = "http.accounts.update", skip(state, actor, input))]
pub async fn update_account(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAccountRequest>,
) -> ApiResult<Json<SensitiveAccountView>> {
    let display_name = input
        .display_name
        .as_deref()
        .map(|name| require_text("display_name", name, 64))
        .transpose()?;
    let patch = AccountPatch {
        display_name,
        bio: input.bio,
    };

    let policy = state.policies.account.can_update(id.into());
    let account = policy_use(&actor, &policy, || async {
        state
            .services
            .accounts
            .update(id, patch)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(account.into()))
}

#[instrument(name = "http.accounts.delete", skip(state, actor))]
pub async fn delete_account(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let policy = state.policies.account.can_delete(id.into());
    policy_use(&actor, &policy, || async {
        state.services.accounts.delete(id).await.map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
