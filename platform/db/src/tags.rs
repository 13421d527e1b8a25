use chrono::Utc;
use entity::{challenge_tags, challenges, tags};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult, conflict_or_db};

const NAME_TAKEN: &str = "tag name already exists";

#[derive(Clone)]
pub struct TagService {
    db: DbPool,
}

impl TagService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "tags.create", skip(self))]
    pub async fn create(&self, name: &str, created_by: Uuid) -> DbResult<tags::Model> {
        let name = name.trim().to_lowercase();
        let existing = tags::Entity::find()
            .filter(tags::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(DbError::Conflict(NAME_TAKEN.into()));
        }
        tags::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_by: Set(created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_or_db(err, NAME_TAKEN))
    }

    pub async fn list(&self) -> DbResult<Vec<tags::Model>> {
        Ok(tags::Entity::find()
            .order_by_asc(tags::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Removes the tag and its challenge connections in one transaction.
    #[instrument(name = "tags.delete", skip(self))]
    pub async fn delete(&self, id: Uuid) -> DbResult<()> {
        let txn = self.db.begin().await?;
        challenge_tags::Entity::delete_many()
            .filter(challenge_tags::Column::TagId.eq(id))
            .exec(&txn)
            .await?;
        let result = tags::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("tag"));
        }
        txn.commit().await?;
        Ok(())
    }

    #[instrument(name = "tags.connect_challenge", skip(self))]
    pub async fn connect_challenge(&self, challenge_id: Uuid, tag_id: Uuid) -> DbResult<()> {
        challenges::Entity::find_by_id(challenge_id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("challenge"))?;
        tags::Entity::find_by_id(tag_id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("tag"))?;
        if challenge_tags::Entity::find_by_id((challenge_id, tag_id))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(DbError::Conflict("tag already connected".into()));
        }
        challenge_tags::ActiveModel {
            challenge_id: Set(challenge_id),
            tag_id: Set(tag_id),
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_or_db(err, "tag already connected"))?;
        Ok(())
    }

    pub async fn for_challenge(&self, challenge_id: Uuid) -> DbResult<Vec<tags::Model>> {
        Ok(tags::Entity::find()
            .join(JoinType::InnerJoin, tags::Relation::ChallengeTag.def())
            .filter(challenge_tags::Column::ChallengeId.eq(challenge_id))
            .order_by_asc(tags::Column::Name)
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
    async fn connecting_twice_conflicts() {
        let pool = memory_pool().await;
        let owner = seed_account(&pool, "margaret@example.com").await;
        let challenge = ChallengeService::new(pool.clone())
            .create(NewChallenge {
                owner_id: owner.id,
                title: "Apollo".into(),
                description: None,
            })
            .await
            .unwrap();
        let tags = TagService::new(pool);
        let tag = tags.create("Space", owner.id).await.unwrap();
        assert_eq!(tag.name, "space");

        tags.connect_challenge(challenge.id, tag.id).await.unwrap();
        assert!(matches!(
            tags.connect_challenge(challenge.id, tag.id).await,
            Err(DbError::Conflict(_))
        ));
        let connected = tags.for_challenge(challenge.id).await.unwrap();
        assert_eq!(
            connected.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![tag.id]
        );
    }

    #[tokio::test]
    async fn duplicate_names_conflict_and_unknown_targets_are_missing() {
        let pool = memory_pool().await;
        let owner = seed_account(&pool, "alan@example.com").await;
        let tags = TagService::new(pool);
        let tag = tags.create("crypto", owner.id).await.unwrap();

        assert!(matches!(
            tags.create(" Crypto ", owner.id).await,
            Err(DbError::Conflict(_))
        ));
        assert!(matches!(
            tags.connect_challenge(Uuid::new_v4(), tag.id).await,
            Err(DbError::NotFound("challenge"))
        ));
        tags.delete(tag.id).await.unwrap();
        assert!(tags.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_tag_drops_its_connections() {
        let pool = memory_pool().await;
        let owner = seed_account(&pool, "grace@example.com").await;
        let challenge = ChallengeService::new(pool.clone())
            .create(NewChallenge {
                owner_id: owner.id,
                title: "Compilers".into(),
                description: None,
            })
            .await
            .unwrap();
        let tags = TagService::new(pool);
        let tag = tags.create("cobol", owner.id).await.unwrap();
        tags.connect_challenge(challenge.id, tag.id).await.unwrap();

        tags.delete(tag.id).await.unwrap();
        assert!(tags.for_challenge(challenge.id).await.unwrap().is_empty());
        assert!(matches!(
            tags.delete(tag.id).await,
            Err(DbError::NotFound("tag"))
        ));
        // The failed delete rolled back and left the pool usable.
        assert!(tags.list().await.unwrap().is_empty());
    }
}
