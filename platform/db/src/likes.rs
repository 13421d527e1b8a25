use chrono::Utc;
use entity::{challenges, likes};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult, conflict_or_db};

const ALREADY_LIKED: &str = "challenge already liked";

#[derive(Clone)]
pub struct LikeService {
    db: DbPool,
}

impl LikeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "likes.like", skip(self))]
    pub async fn like(&self, challenge_id: Uuid, account_id: Uuid) -> DbResult<likes::Model> {
        challenges::Entity::find_by_id(challenge_id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("challenge"))?;
        if likes::Entity::find_by_id((challenge_id, account_id))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(DbError::Conflict(ALREADY_LIKED.into()));
        }
        likes::ActiveModel {
            challenge_id: Set(challenge_id),
            account_id: Set(account_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_or_db(err, ALREADY_LIKED))
    }

    #[instrument(name = "likes.unlike", skip(self))]
    pub async fn unlike(&self, challenge_id: Uuid, account_id: Uuid) -> DbResult<()> {
        let result = likes::Entity::delete_by_id((challenge_id, account_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("like"));
        }
        Ok(())
    }

    pub async fn count(&self, challenge_id: Uuid) -> DbResult<u64> {
        Ok(likes::Entity::find()
            .filter(likes::Column::ChallengeId.eq(challenge_id))
            .count(&self.db)
            .await?)
    }
}
