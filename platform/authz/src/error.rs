use thiserror::Error;

use crate::ActorId;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("action {action} denied for resource {resource}")]
    Denied {
        resource: &'static str,
        action: &'static str,
        actor: ActorId,
    },
    #[error("failed to evaluate {action} policy for resource {resource}")]
    Evaluation {
        resource: &'static str,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AuthzError {
    pub fn resource(&self) -> &'static str {
        match self {
            AuthzError::Denied { resource, .. } | AuthzError::Evaluation { resource, .. } => {
                resource
            }
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            AuthzError::Denied { action, .. } | AuthzError::Evaluation { action, .. } => action,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AuthzError::Denied { .. })
    }
}
