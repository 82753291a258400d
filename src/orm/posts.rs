use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_name: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub age: i32,
    pub gender: Option<String>,
    pub location: String,
    // The anonymous rate-limit key. Stored, never exposed.
    #[serde(skip_serializing)]
    pub ip_hash: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
