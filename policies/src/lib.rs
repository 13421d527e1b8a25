//! Resource policy modules.
//!
//! Each module exposes one factory per guarded action. Factories are cheap
//! and return a fresh [`Policy`](platform_authz::Policy) closed over the
//! target identifier; lookups they need are injected when the module is
//! constructed.

mod account;
mod challenge;
mod directory;
mod like;
mod participant;
mod tag;

use std::sync::Arc;

pub use account::AccountPolicy;
pub use challenge::ChallengePolicy;
pub use directory::ChallengeDirectory;
pub use like::LikePolicy;
pub use participant::ParticipantPolicy;
pub use tag::TagPolicy;

/// Every resource policy module, wired to the same lookups.
#[derive(Clone)]
pub struct Policies {
    pub account: AccountPolicy,
    pub tag: TagPolicy,
    pub challenge: ChallengePolicy,
    pub participant: ParticipantPolicy,
    pub like: LikePolicy,
}

impl Policies {
    pub fn new(challenges: Arc<dyn ChallengeDirectory>) -> Self {
        Self {
            account: AccountPolicy,
            tag: TagPolicy::new(challenges.clone()),
            challenge: ChallengePolicy::new(challenges.clone()),
            participant: ParticipantPolicy::new(challenges),
            like: LikePolicy,
        }
    }
}
