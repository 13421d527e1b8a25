use std::{fmt, future::Future, pin::Pin, sync::Arc};

use crate::{ActorContext, AuthzError};

type Decision = Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send>>;
type Predicate = dyn Fn(ActorContext) -> Decision + Send + Sync;

/// An immutable `(resource, action, predicate)` triple.
///
/// Cloning is cheap and a policy holds no state between evaluations, so the
/// same value can be evaluated concurrently against different actors.
#[derive(Clone)]
pub struct Policy {
    resource: &'static str,
    action: &'static str,
    predicate: Arc<Predicate>,
}

/// Build a policy whose predicate may await a read-only lookup.
///
/// An `Err` from the predicate means the decision could not be made; it is
/// reported as [`AuthzError::Evaluation`], never as a denial.
pub fn policy<F, Fut>(resource: &'static str, action: &'static str, predicate: F) -> Policy
where
    F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Policy {
        resource,
        action,
        predicate: Arc::new(move |actor| Box::pin(predicate(actor)) as Decision),
    }
}

impl Policy {
    /// Build a policy from a synchronous, infallible predicate.
    pub fn from_fn<F>(resource: &'static str, action: &'static str, predicate: F) -> Self
    where
        F: Fn(&ActorContext) -> bool + Send + Sync + 'static,
    {
        policy(resource, action, move |actor| {
            let allowed = predicate(&actor);
            async move { Ok(allowed) }
        })
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    /// Run the predicate. `Ok(true)` allows, `Ok(false)` denies.
    pub async fn evaluate(&self, actor: &ActorContext) -> Result<bool, AuthzError> {
        (self.predicate)(actor.clone())
            .await
            .map_err(|source| AuthzError::Evaluation {
                resource: self.resource,
                action: self.action,
                source,
            })
    }

    /// Like [`Policy::evaluate`] but turns a denial into an error.
    pub async fn check(&self, actor: &ActorContext) -> Result<(), AuthzError> {
        if self.evaluate(actor).await? {
            Ok(())
        } else {
            Err(AuthzError::Denied {
                resource: self.resource,
                action: self.action,
                actor: actor.id(),
            })
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("resource", &self.resource)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}
