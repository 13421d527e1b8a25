use chrono::Utc;
use entity::{challenges, participants};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult, conflict_or_db};

const ALREADY_JOINED: &str = "already participating in this challenge";

#[derive(Clone)]
pub struct ParticipantService {
    db: DbPool,
}

impl ParticipantService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "participants.join", skip(self))]
    pub async fn join(
        &self,
        challenge_id: Uuid,
        account_id: Uuid,
    ) -> DbResult<participants::Model> {
        challenges::Entity::find_by_id(challenge_id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("challenge"))?;
        if participants::Entity::find_by_id((challenge_id, account_id))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(DbError::Conflict(ALREADY_JOINED.into()));
        }
        participants::ActiveModel {
            challenge_id: Set(challenge_id),
            account_id: Set(account_id),
            joined_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_or_db(err, ALREADY_JOINED))
    }

    #[instrument(name = "participants.leave", skip(self))]
    pub async fn leave(&self, challenge_id: Uuid, account_id: Uuid) -> DbResult<()> {
        let result = participants::Entity::delete_by_id((challenge_id, account_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("participant"));
        }
        Ok(())
    }

    pub async fn list(&self, challenge_id: Uuid) -> DbResult<Vec<participants::Model>> {
        Ok(participants::Entity::find()
            .filter(participants::Column::ChallengeId.eq(challenge_id))
            .order_by_asc(participants::Column::JoinedAt)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ChallengeService, NewChallenge,
        testing::{memory_pool, seed_account},
    };

    #[tokio::test]
    async fn membership_is_unique_per_challenge() {
        let pool = memory_pool().await;
        let owner = seed_account(&pool, "frances@example.com").await;
        let member = seed_account(&pool, "john@example.com").await;
        let challenge = ChallengeService::new(pool.clone())
            .create(NewChallenge {
                owner_id: owner.id,
                title: "Fortran".into(),
                description: None,
            })
            .await
            .unwrap();
        let participants = ParticipantService::new(pool);

        participants.join(challenge.id, member.id).await.unwrap();
        assert!(matches!(
            participants.join(challenge.id, member.id).await,
            Err(DbError::Conflict(_))
        ));
        assert_eq!(participants.list(challenge.id).await.unwrap().len(), 1);

        participants.leave(challenge.id, member.id).await.unwrap();
        assert!(matches!(
            participants.leave(challenge.id, member.id).await,
            Err(DbError::NotFound("participant"))
        ));
    }

    #[tokio::test]
    async fn joining_a_missing_challenge_is_not_found() {
        let pool = memory_pool().await;
        let member = seed_account(&pool, "donald@example.com").await;
        let result = ParticipantService::new(pool)
            .join(Uuid::new_v4(), member.id)
            .await;
        assert!(matches!(result, Err(DbError::NotFound("challenge"))));
    }
}
