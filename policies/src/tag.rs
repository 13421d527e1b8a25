use std::sync::Arc;

use platform_authz::{Policy, policy};
use uuid::Uuid;

use crate::{ChallengeDirectory, directory::owns_challenge};

pub const RESOURCE: &str = "tag";

#[derive(Clone)]
pub struct TagPolicy {
    challenges: Arc<dyn ChallengeDirectory>,
}

impl TagPolicy {
    pub fn new(challenges: Arc<dyn ChallengeDirectory>) -> Self {
        Self { challenges }
    }

    pub fn can_create(&self) -> Policy {
        Policy::from_fn(RESOURCE, "create", |_| true)
    }

    /// Tags are shared vocabulary; only the server itself removes them.
    pub fn can_delete(&self) -> Policy {
        Policy::from_fn(RESOURCE, "delete", |actor| actor.is_system())
    }

    /// Attaching a tag to a challenge is reserved to the challenge owner.
    pub fn can_connect_challenge(&self, challenge: Uuid) -> Policy {
        let challenges = self.challenges.clone();
        policy(RESOURCE, "connectChallenge", move |actor| {
            let challenges = challenges.clone();
            async move { owns_challenge(challenges.as_ref(), challenge, &actor).await }
        })
    }
}
