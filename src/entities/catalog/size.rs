use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A size option (S, M, 42, One Size...) shared across products.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sizes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub size_type: SizeType,
    /// Position within its size type when listing
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_size::Entity")]
    ProductSizes,
}

impl Related<super::product_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSizes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SizeType {
    #[sea_orm(string_value = "clothing")]
    Clothing,
    #[sea_orm(string_value = "shoes")]
    Shoes,
    #[sea_orm(string_value = "accessories")]
    Accessories,
}
