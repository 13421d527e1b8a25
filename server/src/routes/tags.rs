use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use platform_api::{ApiError, ApiResult};
use platform_authz::policy_use;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{account_of, require_text, views::TagView};
use crate::http::{Actor, AppState};

const MAX_TAG_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    name: String,
}

/// Tags are public vocabulary; any signed-in caller may list them.
#[instrument(name = "http.tags.list", skip_all)]
pub async fn list_tags(
    State(state): State<AppState>,
    Actor(_actor): Actor,
) -> ApiResult<Json<Vec<TagView>>> {
    let tags = state.services.tags.list().await?;
    Ok(Json(tags.into_iter().map(TagView::from).collect()))
}

#[instrument(name = "http.tags.create", skip_all)]
pub async fn create_tag(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(input): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<TagView>)> {
    let name = require_text("name", &input.name, MAX_TAG_LEN)?;
    let created_by = account_of(&actor)?;

    let policy = state.policies.tag.can_create();
    let tag = policy_use(&actor, &policy, || async {
        state
            .services
            .tags
            .create(&name, created_by)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    info!(tag = %tag.id, name = %tag.name, "tag created");
    Ok((StatusCode::CREATED, Json(tag.into())))
}

#[instrument(name = "http.tags.delete", skip(state, actor))]
pub async fn delete_tag(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let policy = state.policies.tag.can_delete();
    policy_use(&actor, &policy, || async {
        state.services.tags.delete(id).await.map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "http.tags.connect_challenge", skip(state, actor))]
pub async fn connect_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((challenge_id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let policy = state.policies.tag.can_connect_challenge(challenge_id);
    policy_use(&actor, &policy, || async {
        state
            .services
            .tags
            .connect_challenge(challenge_id, tag_id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
