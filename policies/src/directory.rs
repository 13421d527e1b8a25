use anyhow::Context;
use async_trait::async_trait;
use platform_authz::{AccountId, ActorContext};
use uuid::Uuid;

/// Read-only challenge ownership lookup used by ownership predicates.
#[async_trait]
pub trait ChallengeDirectory: Send + Sync {
    /// `Ok(None)` when the challenge does not exist.
    async fn owner_of(&self, challenge: Uuid) -> anyhow::Result<Option<AccountId>>;
}

/// Missing challenges deny, so a caller cannot probe which ids exist.
pub(crate) async fn owns_challenge(
    challenges: &dyn ChallengeDirectory,
    challenge: Uuid,
    actor: &ActorContext,
) -> anyhow::Result<bool> {
    let Some(account) = actor.account_id() else {
        return Ok(false);
    };
    let owner = challenges
        .owner_of(challenge)
        .await
        .with_context(|| format!("looking up owner of challenge {challenge}"))?;
    Ok(owner == Some(account))
}
