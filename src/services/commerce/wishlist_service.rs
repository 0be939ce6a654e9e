use crate::{
    entities::{
        catalog::{product, product_image, Product, ProductImage, ProductModel},
        commerce::{wishlist_item, WishlistItem},
    },
    errors::ServiceError,
    services::catalog::ProductSummary,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub added_at: DateTime<Utc>,
    pub product: ProductSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistView {
    pub items: Vec<WishlistEntry>,
    pub wishlist_count: u64,
}

/// Result of a wishlist mutation
#[derive(Debug, Clone, Serialize)]
pub struct WishlistChange {
    pub success: bool,
    pub message: String,
    pub in_wishlist: bool,
    pub wishlist_count: u64,
}

#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn count<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .count(db)
            .await?)
    }

    async fn find_entry(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<wishlist_item::Model>, ServiceError> {
        Ok(WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?)
    }

    async fn active_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    /// Saved products, most recently added first.
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: Uuid) -> Result<WishlistView, ServiceError> {
        let rows = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .order_by_desc(wishlist_item::Column::AddedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = rows.iter().map(|(w, _)| w.product_id).collect();
        let images = if product_ids.is_empty() {
            Vec::new()
        } else {
            ProductImage::find()
                .filter(product_image::Column::ProductId.is_in(product_ids))
                .order_by_asc(product_image::Column::CreatedAt)
                .all(&*self.db)
                .await?
        };

        let items: Vec<WishlistEntry> = rows
            .into_iter()
            .filter_map(|(entry, product)| {
                let product = product?;
                let own: Vec<_> = images
                    .iter()
                    .filter(|img| img.product_id == product.id)
                    .cloned()
                    .collect();
                Some(WishlistEntry {
                    id: entry.id,
                    added_at: entry.added_at,
                    product: ProductSummary::from_model(&product, &own),
                })
            })
            .collect();

        Ok(WishlistView {
            wishlist_count: items.len() as u64,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistChange, ServiceError> {
        let product = self.active_product(product_id).await?;

        if self.find_entry(user_id, product_id).await?.is_some() {
            return Ok(WishlistChange {
                success: false,
                message: format!("{} is already in your wishlist!", product.name),
                in_wishlist: true,
                wishlist_count: Self::count(&*self.db, user_id).await?,
            });
        }

        wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            added_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(%user_id, %product_id, "Added to wishlist");
        Ok(WishlistChange {
            success: true,
            message: format!("{} added to wishlist!", product.name),
            in_wishlist: true,
            wishlist_count: Self::count(&*self.db, user_id).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistChange, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let (success, message) = match self.find_entry(user_id, product_id).await? {
            Some(entry) => {
                WishlistItem::delete_by_id(entry.id).exec(&*self.db).await?;
                (true, format!("{} removed from wishlist!", product.name))
            }
            None => (false, format!("{} is not in your wishlist!", product.name)),
        };

        Ok(WishlistChange {
            success,
            message,
            in_wishlist: false,
            wishlist_count: Self::count(&*self.db, user_id).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistChange, ServiceError> {
        let product = self.active_product(product_id).await?;

        let (in_wishlist, message) = match self.find_entry(user_id, product_id).await? {
            Some(entry) => {
                WishlistItem::delete_by_id(entry.id).exec(&*self.db).await?;
                (false, format!("{} removed from wishlist!", product.name))
            }
            None => {
                wishlist_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    added_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?;
                (true, format!("{} added to wishlist!", product.name))
            }
        };

        Ok(WishlistChange {
            success: true,
            message,
            in_wishlist,
            wishlist_count: Self::count(&*self.db, user_id).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<WishlistChange, ServiceError> {
        let removed = WishlistItem::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?
            .rows_affected;

        Ok(WishlistChange {
            success: true,
            message: format!("Cleared {} items from your wishlist!", removed),
            in_wishlist: false,
            wishlist_count: 0,
        })
    }
}
