use chrono::{DateTime, FixedOffset, Utc};
use entity::{accounts, challenges, participants, tags};
use platform_authn::IssuedToken;
use serde::Serialize;
use uuid::Uuid;

/// What anyone allowed to read an account sees.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub display_name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<accounts::Model> for AccountView {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name,
            bio: model.bio,
            created_at: model.created_at,
        }
    }
}

/// Includes contact details; served behind `readSensitive`.
#[derive(Debug, Serialize)]
pub struct SensitiveAccountView {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<accounts::Model> for SensitiveAccountView {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            bio: model.bio,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: Uuid,
    pub name: String,
}

impl From<tags::Model> for TagView {
    fn from(model: tags::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<TagView>,
    pub likes: u64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl ChallengeView {
    pub fn new(model: challenges::Model, tags: Vec<tags::Model>, likes: u64) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            tags: tags.into_iter().map(TagView::from).collect(),
            likes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParticipantView {
    pub challenge_id: Uuid,
    pub account_id: Uuid,
    pub joined_at: DateTime<FixedOffset>,
}

impl From<participants::Model> for ParticipantView {
    fn from(model: participants::Model) -> Self {
        Self {
            challenge_id: model.challenge_id,
            account_id: model.account_id,
            joined_at: model.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessTokenView {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for AccessTokenView {
    fn from(token: IssuedToken) -> Self {
        Self {
            access_token: token.token,
            access_expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenPairView {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}
