use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "managed_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub external_id: String,
    #[sea_orm(column_name = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: i64,
    pub proxied: Option<i32>,
    /// Full canonical record (type-conditional fields included), JSON.
    pub data_json: String,
    pub comment: Option<String>,
    pub fingerprint: String,
    pub source: String,
    pub managed: i32,
    pub is_orphaned: i32,
    pub orphaned_at: Option<String>,
    pub first_seen_at: String,
    pub tracked_at: String,
    pub updated_at: String,
    pub metadata_json: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
