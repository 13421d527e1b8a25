use crate::{challenges, tags};
use sea_orm::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "challenge_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub challenge_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: Uuid,
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
        belongs_to = "tags::Entity",
        from = "Column::TagId",
        to = "tags::Column::Id",
        on_delete = "Cascade"
    )]
    Tag,
}

impl Related<challenges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Challenge.def()
    }
}

impl Related<tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
