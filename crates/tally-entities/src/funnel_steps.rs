use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use tally_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "funnel_steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub funnel_id: i32,
    pub step_number: i32,
    pub event_type: String,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::funnels::Entity",
        from = "Column::FunnelId",
        to = "super::funnels::Column::Id",
        on_delete = "Cascade"
    )]
    Funnel,
}

impl Related<super::funnels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Funnel.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now());
        }

        Ok(self)
    }
}
