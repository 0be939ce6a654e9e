use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub discount_price: Option<Decimal>,
    pub stock: i32,
    /// JSON array of color names
    #[sea_orm(column_type = "Json")]
    pub available_colors: Json,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::product_size::Entity")]
    ProductSizes,
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSizes.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Price charged per unit: the discount price when it undercuts the list price.
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discounted) if discounted < self.price => discounted,
            _ => self.price,
        }
    }

    pub fn has_discount(&self) -> bool {
        matches!(self.discount_price, Some(d) if d < self.price)
    }

    /// Whole-number percentage off the list price, 0 when not discounted.
    pub fn discount_percentage(&self) -> Decimal {
        match self.discount_price {
            Some(d) if d < self.price && self.price > Decimal::ZERO => {
                ((self.price - d) / self.price * Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            }
            _ => Decimal::ZERO,
        }
    }

    pub fn colors(&self) -> Vec<String> {
        self.available_colors
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
