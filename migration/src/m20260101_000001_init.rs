use sea_orm_migration::prelude::*;

// Kept to types both Postgres and SQLite accept so tests can run in memory.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id uuid PRIMARY KEY,
    email text NOT NULL UNIQUE,
    password_hash text NOT NULL,
    display_name text NOT NULL,
    bio text NULL,
    created_at timestamptz NOT NULL,
    updated_at timestamptz NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id uuid PRIMARY KEY,
    name text NOT NULL UNIQUE,
    created_by uuid NOT NULL,
    created_at timestamptz NOT NULL
);

CREATE TABLE IF NOT EXISTS challenges (
    id uuid PRIMARY KEY,
    owner_id uuid NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    title text NOT NULL,
    description text NULL,
    created_at timestamptz NOT NULL,
    updated_at timestamptz NOT NULL
);

CREATE INDEX IF NOT EXISTS challenges_owner_idx ON challenges (owner_id);

CREATE TABLE IF NOT EXISTS challenge_tags (
    challenge_id uuid NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
    tag_id uuid NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (challenge_id, tag_id)
);

CREATE TABLE IF NOT EXISTS participants (
    challenge_id uuid NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
    account_id uuid NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    joined_at timestamptz NOT NULL,
    PRIMARY KEY (challenge_id, account_id)
);

CREATE TABLE IF NOT EXISTS likes (
    challenge_id uuid NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
    account_id uuid NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at timestamptz NOT NULL,
    PRIMARY KEY (challenge_id, account_id)
);
"#;

const DOWN_SQL: &str = r#"
DROP TABLE IF EXISTS likes;
DROP TABLE IF EXISTS participants;
DROP TABLE IF EXISTS challenge_tags;
DROP INDEX IF EXISTS challenges_owner_idx;
DROP TABLE IF EXISTS challenges;
DROP TABLE IF EXISTS tags;
DROP TABLE IF EXISTS accounts;
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(UP_SQL)
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await
            .map(|_| ())
    }
}
