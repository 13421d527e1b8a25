use std::future::Future;

use tracing::{debug, error, warn};

use crate::{ActorContext, AuthzError, Policy};

/// Gate `operation` behind `policy`.
///
/// The operation closure is only invoked after the policy allows the actor,
/// so a denial or an evaluation failure leaves no side effects behind. Errors
/// from the operation itself are returned untouched.
pub async fn policy_use<T, E, F, Fut>(
    actor: &ActorContext,
    policy: &Policy,
    operation: F,
) -> Result<T, E>
where
    E: From<AuthzError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match policy.check(actor).await {
        Ok(()) => {
            debug!(
                resource = policy.resource(),
                action = policy.action(),
                actor = %actor.id(),
                "policy allowed"
            );
            operation().await
        }
        Err(err @ AuthzError::Denied { .. }) => {
            warn!(
                resource = policy.resource(),
                action = policy.action(),
                actor = %actor.id(),
                "policy denied"
            );
            Err(err.into())
        }
        Err(err) => {
            error!(
                resource = policy.resource(),
                action = policy.action(),
                actor = %actor.id(),
                error = ?err,
                "policy evaluation failed"
            );
            Err(err.into())
        }
    }
}

/// Run `operation` as the system actor.
///
/// The operation only ever sees [`ActorContext::system`]; whatever actor the
/// caller holds is not passed through.
pub async fn with_system_actor<T, F, Fut>(operation: F) -> T
where
    F: FnOnce(ActorContext) -> Fut,
    Fut: Future<Output = T>,
{
    operation(ActorContext::system()).await
}
