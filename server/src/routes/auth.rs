use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use platform_api::{ApiError, ApiResult};
use platform_authn::{AuthnError, RefreshGrant, hash_password, verify_password};
use platform_authz::{AccountId, ActorContext, with_system_actor};
use platform_db::{DbError, NewAccount};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    require_text,
    views::{AccessTokenView, SensitiveAccountView, TokenPairView},
};
use crate::http::{AppState, refresh_credentials};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    email: String,
    password: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

/// Public sign-up. Nobody is signed in yet, so the account is created by the
/// system actor and no policy applies.
#[instrument(name = "http.sign_up", skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SensitiveAccountView>)> {
    let email = input.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::InvalidInput("email is not valid".into()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let display_name = require_text("display_name", &input.display_name, 64)?;
    let password_hash = hash_password(&input.password)?;

    let account = with_system_actor(|actor| async move {
        debug!(actor = %actor.id(), "creating account");
        state
            .services
            .accounts
            .create(NewAccount {
                email,
                password_hash,
                display_name,
            })
            .await
    })
    .await?;
    info!(account = %account.id, "account created");
    Ok((StatusCode::CREATED, Json(account.into())))
}

#[instrument(name = "http.sign_in", skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInRequest>,
) -> ApiResult<Json<TokenPairView>> {
    let tokens = with_system_actor(|actor| start_session(&state, actor, input)).await?;
    Ok(Json(tokens))
}

#[instrument(name = "http.refresh", skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AccessTokenView>> {
    let grant = state.authn.refresh_grant(&refresh_credentials(&headers))?;
    let token = with_system_actor(|actor| renew_access(&state, actor, grant)).await?;
    Ok(Json(token))
}

/// Revokes the session named by the presented refresh token, not by any
/// access token, so it also works after the access token expired.
#[instrument(name = "http.sign_out", skip_all)]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let grant = state.authn.refresh_grant(&refresh_credentials(&headers))?;
    with_system_actor(|actor| async move {
        debug!(actor = %actor.id(), session = %grant.session_id, "revoking session");
        state
            .services
            .sessions
            .revoke(grant.session_id)
            .await
            .map_err(revoked_session)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(
    state: &AppState,
    actor: ActorContext,
    input: SignInRequest,
) -> ApiResult<TokenPairView> {
    let account = state
        .services
        .accounts
        .find_by_email(&input.email)
        .await?
        .ok_or(AuthnError::InvalidPassword)?;
    if !verify_password(&input.password, &account.password_hash)? {
        return Err(AuthnError::InvalidPassword.into());
    }

    state.services.sessions.prune_expired(account.id).await?;
    let account_id = AccountId::new(account.id);
    let session_id = Uuid::new_v4();
    let refresh = state.authn.issue_refresh(account_id, session_id)?;
    state
        .services
        .sessions
        .create(session_id, account.id, refresh.expires_at)
        .await?;
    let access = state.authn.issue_access(account_id, &[])?;
    debug!(actor = %actor.id(), account = %account.id, "session started");
    Ok(TokenPairView {
        access_token: access.token,
        access_expires_at: access.expires_at,
        refresh_token: refresh.token,
        refresh_expires_at: refresh.expires_at,
    })
}

async fn renew_access(
    state: &AppState,
    actor: ActorContext,
    grant: RefreshGrant,
) -> ApiResult<AccessTokenView> {
    let session = state
        .services
        .sessions
        .find_active(grant.session_id)
        .await
        .map_err(revoked_session)?;
    if session.account_id != grant.account_id.into_uuid() {
        return Err(ApiError::Unauthenticated);
    }
    debug!(actor = %actor.id(), session = %session.id, "access token renewed");
    Ok(state.authn.issue_access(grant.account_id, &[])?.into())
}

/// A refresh token whose session is gone is a credential failure.
fn revoked_session(err: DbError) -> ApiError {
    match err {
        DbError::NotFound(_) => ApiError::Unauthenticated,
        other => other.into(),
    }
}
