use chrono::{DateTime, FixedOffset, Utc};
use entity::sessions;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult};

/// Refresh-token sessions. A session row existing is what keeps a refresh
/// token usable.
#[derive(Clone)]
pub struct SessionService {
    db: DbPool,
}

impl SessionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "sessions.create", skip(self))]
    pub async fn create(
        &self,
        id: Uuid,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> DbResult<sessions::Model> {
        Ok(sessions::ActiveModel {
            id: Set(id),
            account_id: Set(account_id),
            created_at: Set(Utc::now().into()),
            expires_at: Set(expires_at.into()),
        }
        .insert(&self.db)
        .await?)
    }

    /// Expired sessions are dropped on sight and reported as missing.
    #[instrument(name = "sessions.find_active", skip(self))]
    pub async fn find_active(&self, id: Uuid) -> DbResult<sessions::Model> {
        let session = sessions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("session"))?;
        if session.expires_at.with_timezone(&Utc) < Utc::now() {
            debug!(session = %id, "session expired");
            sessions::Entity::delete_by_id(id).exec(&self.db).await?;
            return Err(DbError::NotFound("session"));
        }
        Ok(session)
    }

    /// Delete the account's expired sessions; returns how many were removed.
    #[instrument(name = "sessions.prune_expired", skip(self))]
    pub async fn prune_expired(&self, account_id: Uuid) -> DbResult<u64> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::AccountId.eq(account_id))
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        if result.rows_affected > 0 {
            debug!(
                account = %account_id,
                pruned = result.rows_affected,
                "expired sessions pruned"
            );
        }
        Ok(result.rows_affected)
    }

    #[instrument(name = "sessions.revoke", skip(self))]
    pub async fn revoke(&self, id: Uuid) -> DbResult<()> {
        let result = sessions::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("session"));
        }
        Ok(())
    }
}
