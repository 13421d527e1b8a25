use crate::{accounts, challenges};
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub challenge_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: Uuid,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "challenges::Entity",
        from = "Column::ChallengeId",
        to = "challenges::Column::Id",
        on_delete = "Cascade"
    )]
    Challenge,
    #[sea_orm(
        belongs_to = "accounts::Entity",
        from = "Column::AccountId",
        to = "accounts::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<challenges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Challenge.def()
    }
}

impl Related<accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
