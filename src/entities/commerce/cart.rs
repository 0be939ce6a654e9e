use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shopping cart entity. One per user; totals are derived from items on read.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_one = "super::applied_coupon::Entity")]
    AppliedCoupon,
    #[sea_orm(
        belongs_to = "crate::entities::accounts::user::Entity",
        from = "Column::UserId",
        to = "crate::entities::accounts::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::applied_coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppliedCoupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
