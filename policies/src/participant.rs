use std::sync::Arc;

use platform_authz::{AccountId, Policy, policy};
use uuid::Uuid;

use crate::{ChallengeDirectory, directory::owns_challenge};

pub const RESOURCE: &str = "participant";

#[derive(Clone)]
pub struct ParticipantPolicy {
    challenges: Arc<dyn ChallengeDirectory>,
}

impl ParticipantPolicy {
    pub fn new(challenges: Arc<dyn ChallengeDirectory>) -> Self {
        Self { challenges }
    }

    /// Joining is open to every actor.
    pub fn can_join(&self, _challenge: Uuid) -> Policy {
        Policy::from_fn(RESOURCE, "join", |_| true)
    }

    /// A participant may leave, and the challenge owner may remove anyone.
    pub fn can_remove(&self, challenge: Uuid, participant: AccountId) -> Policy {
        let challenges = self.challenges.clone();
        policy(RESOURCE, "remove", move |actor| {
            let challenges = challenges.clone();
            async move {
                if actor.is(participant) {
                    return Ok(true);
                }
                owns_challenge(challenges.as_ref(), challenge, &actor).await
            }
        })
    }
}
