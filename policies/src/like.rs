use platform_authz::{AccountId, Policy};

pub const RESOURCE: &str = "like";

#[derive(Clone, Copy, Debug, Default)]
pub struct LikePolicy;

impl LikePolicy {
    pub fn can_create(&self) -> Policy {
        Policy::from_fn(RESOURCE, "create", |_| true)
    }

    /// Likes are removed only by the account that left them.
    pub fn can_delete(&self, liked_by: AccountId) -> Policy {
        Policy::from_fn(RESOURCE, "delete", move |actor| actor.is(liked_by))
    }
}

#[cfg(test)]
mod tests {
    use platform_authz::ActorContext;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn likes_belong_to_their_author() {
        let author = AccountId::new(Uuid::new_v4());
        let other = ActorContext::account(AccountId::new(Uuid::new_v4()), []);

        assert!(
            LikePolicy
                .can_delete(author)
                .evaluate(&ActorContext::account(author, []))
                .await
                .unwrap()
        );
        assert!(!LikePolicy.can_delete(author).evaluate(&other).await.unwrap());
        assert!(LikePolicy.can_create().evaluate(&other).await.unwrap());
    }

    #[tokio::test]
    async fn anyone_may_like_but_system_cannot_unlike_for_others() {
        let system = ActorContext::system();
        assert!(LikePolicy.can_create().evaluate(&system).await.unwrap());
        let author = AccountId::new(Uuid::new_v4());
        assert!(!LikePolicy.can_delete(author).evaluate(&system).await.unwrap());
    }
}
