//! Database primitives and the domain services built on them.
//!
//! Services own no connection of their own; each holds a clone of the shared
//! pool and borrows a connection per call.

mod accounts;
mod challenges;
mod likes;
mod participants;
mod sessions;
mod tags;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use thiserror::Error;

pub use accounts::{AccountPatch, AccountService, NewAccount};
pub use challenges::{ChallengePatch, ChallengeService, NewChallenge};
pub use likes::LikeService;
pub use participants::ParticipantService;
pub use sessions::SessionService;
pub use tags::TagService;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Map a unique-constraint violation to a conflict, anything else to a
/// database error.
pub(crate) fn conflict_or_db(err: DbErr, message: &str) -> DbError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DbError::Conflict(message.to_string()),
        _ => DbError::Db(err),
    }
}

const DATABASE_URL_KEY: &str = "DATABASE_URL";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseSettings {
    /// Reads `DATABASE_MAX_CONNECTIONS`; unset or unparsable keeps the default.
    pub fn from_env() -> Self {
        Self::with_max_connections(std::env::var("DATABASE_MAX_CONNECTIONS").ok().as_deref())
    }

    fn with_max_connections(raw: Option<&str>) -> Self {
        let max_connections = raw
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Self { max_connections }
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(DATABASE_URL_KEY).map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.database_url()?);
    options
        .max_connections(settings.max_connections)
        .sqlx_logging(false);
    Ok(Database::connect(options).await?)
}

#[cfg(test)]
pub(crate) mod testing {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};

    use crate::{AccountService, DbPool, NewAccount};

    pub async fn memory_pool() -> DbPool {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let pool = Database::connect(options).await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        pool
    }

    pub async fn seed_account(pool: &DbPool, email: &str) -> entity::accounts::Model {
        AccountService::new(pool.clone())
            .create(NewAccount {
                email: email.to_string(),
                password_hash: "$argon2id$unused".to_string(),
                display_name: email.split('@').next().unwrap_or(email).to_string(),
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_falls_back_on_bad_input() {
        assert_eq!(DatabaseSettings::with_max_connections(Some(" 4 ")).max_connections, 4);
        assert_eq!(
            DatabaseSettings::with_max_connections(Some("many")).max_connections,
            DEFAULT_MAX_CONNECTIONS
        );
        assert_eq!(
            DatabaseSettings::with_max_connections(Some("0")).max_connections,
            DEFAULT_MAX_CONNECTIONS
        );
        assert_eq!(
            DatabaseSettings::with_max_connections(None).max_connections,
            DatabaseSettings::default().max_connections
        );
    }
}
