//! `SeaORM` Entity for the events table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::DBDateTime;

/// One recorded user action. Rows are immutable once written.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session_id: String,
    pub user_id: Option<String>,
    pub event_type: String,
    pub occurred_at: DBDateTime,

    // Traffic source
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,

    pub page_url: Option<String>,
    pub properties: Option<Json>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
