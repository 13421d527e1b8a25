use platform_authz::{AccountId, Policy};

pub const RESOURCE: &str = "account";

/// Account policies are pure identity checks and need no lookups.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccountPolicy;

impl AccountPolicy {
    pub fn can_create(&self) -> Policy {
        Policy::from_fn(RESOURCE, "create", |_| true)
    }

    pub fn can_read(&self, id: AccountId) -> Policy {
        owner_only("read", id)
    }

    pub fn can_read_sensitive(&self, id: AccountId) -> Policy {
        owner_only("readSensitive", id)
    }

    pub fn can_update(&self, id: AccountId) -> Policy {
        owner_only("update", id)
    }

    pub fn can_delete(&self, id: AccountId) -> Policy {
        owner_only("delete", id)
    }
}

fn owner_only(action: &'static str, id: AccountId) -> Policy {
    Policy::from_fn(RESOURCE, action, move |actor| actor.is(id))
}
