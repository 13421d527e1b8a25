use async_trait::async_trait;
use chrono::Utc;
use entity::challenges;
use platform_authz::AccountId;
use policies::ChallengeDirectory;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QuerySelect};
use tracing::instrument;
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult};

#[derive(Clone, Debug)]
pub struct NewChallenge {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ChallengePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone)]
pub struct ChallengeService {
    db: DbPool,
}

impl ChallengeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "challenges.create", skip_all, fields(owner = %input.owner_id))]
    pub async fn create(&self, input: NewChallenge) -> DbResult<challenges::Model> {
        let now = Utc::now();
        Ok(challenges::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(input.owner_id),
            title: Set(input.title),
            description: Set(input.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?)
    }

    #[instrument(name = "challenges.find", skip(self))]
    pub async fn find(&self, id: Uuid) -> DbResult<challenges::Model> {
        challenges::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("challenge"))
    }

    #[instrument(name = "challenges.update", skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: ChallengePatch) -> DbResult<challenges::Model> {
        let mut model: challenges::ActiveModel = self.find(id).await?.into();
        if let Some(title) = patch.title {
            model.title = Set(title);
        }
        if let Some(description) = patch.description {
            model.description = Set(description);
        }
        model.updated_at = Set(Utc::now().into());
        Ok(model.update(&self.db).await?)
    }

    #[instrument(name = "challenges.delete", skip(self))]
    pub async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = challenges::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("challenge"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChallengeDirectory for ChallengeService {
    async fn owner_of(&self, challenge: Uuid) -> anyhow::Result<Option<AccountId>> {
        let owner = challenges::Entity::find_by_id(challenge)
            .select_only()
            .column(challenges::Column::OwnerId)
            .into_tuple::<Uuid>()
            .one(&self.db)
            .await?;
        Ok(owner.map(AccountId::from))
    }
}
