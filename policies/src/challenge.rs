use std::sync::Arc;

use platform_authz::{Policy, policy};
use uuid::Uuid;

use crate::{ChallengeDirectory, directory::owns_challenge};

pub const RESOURCE: &str = "challenge";

#[derive(Clone)]
pub struct ChallengePolicy {
    challenges: Arc<dyn ChallengeDirectory>,
}

impl ChallengePolicy {
    pub fn new(challenges: Arc<dyn ChallengeDirectory>) -> Self {
        Self { challenges }
    }

    pub fn can_create(&self) -> Policy {
        Policy::from_fn(RESOURCE, "create", |_| true)
    }

    pub fn can_read(&self, _challenge: Uuid) -> Policy {
        Policy::from_fn(RESOURCE, "read", |_| true)
    }

    pub fn can_update(&self, challenge: Uuid) -> Policy {
        self.owner_only("update", challenge)
    }

    pub fn can_delete(&self, challenge: Uuid) -> Policy {
        self.owner_only("delete", challenge)
    }

    fn owner_only(&self, action: &'static str, challenge: Uuid) -> Policy {
        let challenges = self.challenges.clone();
        policy(RESOURCE, action, move |actor| {
            let challenges = challenges.clone();
            async move { owns_challenge(challenges.as_ref(), challenge, &actor).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use platform_authz::{AccountId, ActorContext};

    use super::*;
    use crate::testing::StaticChallenges;

    #[tokio::test]
    async fn owner_checks_follow_the_directory() {
        let owner = AccountId::new(Uuid::new_v4());
        let challenge = Uuid::new_v4();
        let policies = ChallengePolicy::new(Arc::new(StaticChallenges(HashMap::from([(
            challenge, owner,
        )]))));
        let owner_actor = ActorContext::account(owner, []);
        let stranger = ActorContext::account(AccountId::new(Uuid::new_v4()), []);

        for policy in [policies.can_update(challenge), policies.can_delete(challenge)] {
            assert!(policy.evaluate(&owner_actor).await.unwrap());
            assert!(!policy.evaluate(&stranger).await.unwrap());
            assert!(!policy.evaluate(&ActorContext::system()).await.unwrap());
        }
        assert!(policies.can_read(challenge).evaluate(&stranger).await.unwrap());
        assert!(policies.can_create().evaluate(&stranger).await.unwrap());
    }
}
