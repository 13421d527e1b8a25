use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use platform_api::{ApiError, ApiResult};
use platform_authz::{AccountId, policy_use};
use platform_db::{ChallengePatch, NewChallenge};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    account_of, require_text,
    views::{ChallengeView, ParticipantView},
};
use crate::http::{Actor, AppState};

const MAX_TITLE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    title: String,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChallengeRequest {
    title: Option<String>,
    #[serde(default, deserialize_with = "super::present")]
    description: Option<Option<String>>,
}

fn description(value: Option<&str>) -> ApiResult<Option<String>> {
    value
        .map(|text| require_text("description", text, MAX_DESCRIPTION_LEN))
        .transpose()
}

#[instrument(name = "http.challenges.create", skip_all)]
pub async fn create_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(input): Json<CreateChallengeRequest>,
) -> ApiResult<(StatusCode, Json<ChallengeView>)> {
    let owner_id = account_of(&actor)?;
    let new = NewChallenge {
        owner_id,
        title: require_text("title", &input.title, MAX_TITLE_LEN)?,
        description: description(input.description.as_deref())?,
    };

    let policy = state.policies.challenge.can_create();
    let challenge = policy_use(&actor, &policy, || async {
        state
            .services
            .challenges
            .create(new)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    info!(challenge = %challenge.id, owner = %owner_id, "challenge created");
    Ok((
        StatusCode::CREATED,
        Json(ChallengeView::new(challenge, Vec::new(), 0)),
    ))
}

#[instrument(name = "http.challenges.get", skip(state, actor))]
pub async fn get_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ChallengeView>> {
    let policy = state.policies.challenge.can_read(id);
    let view = policy_use(&actor, &policy, || async {
        let challenge = state.services.challenges.find(id).await?;
        let tags = state.services.tags.for_challenge(id).await?;
        let likes = state.services.likes.count(id).await?;
        Ok::<_, ApiError>(ChallengeView::new(challenge, tags, likes))
    })
    .await?;
    Ok(Json(view))
}

#[instrument(name = "http.challenges.update", skip(state, actor, input))]
pub async fn update_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateChallengeRequest>,
) -> ApiResult<Json<ChallengeView>> {
    let patch = ChallengePatch {
        title: input
            .title
            .as_deref()
            .map(|title| require_text("title", title, MAX_TITLE_LEN))
            .transpose()?,
        description: input
            .description
            .map(|value| description(value.as_deref()))
            .transpose()?,
    };

    let policy = state.policies.challenge.can_update(id);
    let view = policy_use(&actor, &policy, || async {
        let challenge = state.services.challenges.update(id, patch).await?;
        let tags = state.services.tags.for_challenge(id).await?;
        let likes = state.services.likes.count(id).await?;
        Ok::<_, ApiError>(ChallengeView::new(challenge, tags, likes))
    })
    .await?;
    Ok(Json(view))
}

#[instrument(name = "http.challenges.delete", skip(state, actor))]
pub async fn delete_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let policy = state.policies.challenge.can_delete(id);
    policy_use(&actor, &policy, || async {
        state
            .services
            .challenges
            .delete(id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    info!(challenge = %id, "challenge deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "http.challenges.participants", skip(state, _actor))]
pub async fn list_participants(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ParticipantView>>> {
    let participants = state.services.participants.list(id).await?;
    Ok(Json(
        participants.into_iter().map(ParticipantView::from).collect(),
    ))
}

#[instrument(name = "http.challenges.join", skip(state, actor))]
pub async fn join_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ParticipantView>)> {
    let account_id = account_of(&actor)?;
    let policy = state.policies.participant.can_join(id);
    let participant = policy_use(&actor, &policy, || async {
        state
            .services
            .participants
            .join(id, account_id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(participant.into())))
}

/// Either the participant leaving or the challenge owner removing them.
#[instrument(name = "http.challenges.remove_participant", skip(state, actor))]
pub async fn remove_participant(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, account_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let policy = state
        .policies
        .participant
        .can_remove(id, AccountId::new(account_id));
    policy_use(&actor, &policy, || async {
        state
            .services
            .participants
            .leave(id, account_id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "http.challenges.like", skip(state, actor))]
pub async fn like_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let account_id = account_of(&actor)?;
    let policy = state.policies.like.can_create();
    policy_use(&actor, &policy, || async {
        state
            .services
            .likes
            .like(id, account_id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::CREATED)
}

#[instrument(name = "http.challenges.unlike", skip(state, actor))]
pub async fn unlike_challenge(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, account_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let policy = state.policies.like.can_delete(AccountId::new(account_id));
    policy_use(&actor, &policy, || async {
        state
            .services
            .likes
            .unlike(id, account_id)
            .await
            .map_err(ApiError::from)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
