use chrono::Utc;
use entity::accounts;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tracing::instrument;
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult, conflict_or_db};

const EMAIL_TAKEN: &str = "email already registered";

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

/// Fields a caller may change on an existing account. `None` leaves the field
/// untouched; `bio: Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub display_name: Option<String>,
    pub bio: Option<Option<String>>,
}

#[derive(Clone)]
pub struct AccountService {
    db: DbPool,
}

impl AccountService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    #[instrument(name = "accounts.create", skip_all)]
    pub async fn create(&self, input: NewAccount) -> DbResult<accounts::Model> {
        let email = normalize_email(&input.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(DbError::Conflict(EMAIL_TAKEN.into()));
        }
        let now = Utc::now();
        accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(input.password_hash),
            display_name: Set(input.display_name),
            bio: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_or_db(err, EMAIL_TAKEN))
    }

    #[instrument(name = "accounts.find", skip(self))]
    pub async fn find(&self, id: Uuid) -> DbResult<accounts::Model> {
        accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound("account"))
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?)
    }

    #[instrument(name = "accounts.update", skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: AccountPatch) -> DbResult<accounts::Model> {
        let mut model: accounts::ActiveModel = self.find(id).await?.into();
        if let Some(display_name) = patch.display_name {
            model.display_name = Set(display_name);
        }
        if let Some(bio) = patch.bio {
            model.bio = Set(bio);
        }
        model.updated_at = Set(Utc::now().into());
        Ok(model.update(&self.db).await?)
    }

    #[instrument(name = "accounts.delete", skip(self))]
    pub async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = accounts::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DbError::NotFound("account"));
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
