use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a persisted account.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for AccountId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActorId {
    Account(AccountId),
    /// The server acting on its own behalf.
    System,
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Account(id) => fmt::Display::fmt(id, f),
            ActorId::System => f.write_str("system"),
        }
    }
}

/// The identity a single request acts as.
///
/// Built once per request by authentication, or synthetically through
/// [`crate::with_system_actor`], and only ever read afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActorContext {
    id: ActorId,
    roles: Arc<[String]>,
}

impl ActorContext {
    pub fn account(id: AccountId, roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: ActorId::Account(id),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn system() -> Self {
        Self {
            id: ActorId::System,
            roles: Arc::from([]),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn account_id(&self) -> Option<AccountId> {
        match self.id {
            ActorId::Account(id) => Some(id),
            ActorId::System => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.id, ActorId::System)
    }

    /// True only when this actor is the given account. The system actor
    /// never matches an account.
    pub fn is(&self, account: AccountId) -> bool {
        self.id == ActorId::Account(account)
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_actor_never_matches_an_account() {
        let system = ActorContext::system();
        assert!(system.is_system());
        assert_eq!(system.account_id(), None);
        assert!(!system.is(AccountId::new(Uuid::nil())));
        assert_eq!(system.id().to_string(), "system");
    }

    #[test]
    fn account_actor_carries_roles() {
        let id = AccountId::new(Uuid::new_v4());
        let actor = ActorContext::account(id, ["moderator".to_string()]);
        assert!(actor.is(id));
        assert!(actor.has_role("moderator"));
        assert!(!actor.has_role("admin"));
        assert_eq!(actor.account_id(), Some(id));
    }
}
