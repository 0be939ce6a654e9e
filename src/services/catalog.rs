use crate::{
    entities::catalog::{
        category, product, product_image, product_size, size, Category, CategoryModel, Product,
        ProductImage, ProductImageModel, ProductModel, ProductSize, Size, SizeModel, SizeType,
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Product filters accepted by the public listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Category slug
    pub category: Option<String>,
    pub featured: Option<bool>,
    /// Free-text match on name and description
    pub q: Option<String>,
}

/// Product as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub effective_price: Decimal,
    pub has_discount: bool,
    pub discount_percentage: Decimal,
    pub stock: i32,
    pub in_stock: bool,
    pub is_featured: bool,
    pub colors: Vec<String>,
    pub primary_image: Option<String>,
}

impl ProductSummary {
    pub fn from_model(product: &ProductModel, images: &[ProductImageModel]) -> Self {
        Self {
            id: product.id,
            category_id: product.category_id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            price: product.price.round_dp(2),
            discount_price: product.discount_price.map(|d| d.round_dp(2)),
            effective_price: product.effective_price().round_dp(2),
            has_discount: product.has_discount(),
            discount_percentage: product.discount_percentage(),
            stock: product.stock,
            in_stock: product.in_stock(),
            is_featured: product.is_featured,
            colors: product.colors(),
            primary_image: product_image::primary_image(images).map(|img| img.image_url.clone()),
        }
    }
}

/// A size a product can currently be bought in
#[derive(Debug, Clone, Serialize)]
pub struct AvailableSize {
    pub size_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub quantity: i32,
}

/// Full product page payload
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub description: String,
    pub is_active: bool,
    pub category: Option<CategoryModel>,
    pub sizes: Vec<AvailableSize>,
    pub images: Vec<ProductImageModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: CategoryModel,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SizeInput {
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub display_name: String,
    pub size_type: SizeType,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "non_negative_amount")]
    pub price: Decimal,
    #[validate(custom = "non_negative_amount")]
    pub discount_price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub available_colors: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductSizeInput {
    pub size_id: Uuid,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductImageInput {
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: String,
    #[validate(length(max = 200))]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

fn default_true() -> bool {
    true
}

pub(crate) fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// "Summer Linen Shirt!" -> "summer-linen-shirt"
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, ServiceError> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(ServiceError::ValidationError(
            "Slug must contain letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

/// Catalog reads for shoppers and catalog management for staff
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<CategoryDetail, ServiceError> {
        let category = Category::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category '{}' not found", slug)))?;

        let products = Product::find()
            .filter(product::Column::CategoryId.eq(category.id))
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let products = self.summaries(products).await?;

        Ok(CategoryDetail { category, products })
    }

    /// Active products, newest first. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductSummary>, u64), ServiceError> {
        let mut query = Product::find().filter(product::Column::IsActive.eq(true));

        if let Some(slug) = filter.category.as_deref().filter(|s| !s.is_empty()) {
            let category = Category::find()
                .filter(category::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?;
            match category {
                Some(c) => query = query.filter(product::Column::CategoryId.eq(c.id)),
                None => return Ok((Vec::new(), 0)),
            }
        }
        if let Some(featured) = filter.featured {
            query = query.filter(product::Column::IsFeatured.eq(featured));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(q))
                    .add(product::Column::Description.contains(q)),
            );
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((self.summaries(products).await?, total))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        self.detail(product).await
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let product = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", slug)))?;
        self.detail(product).await
    }

    /// Sizes with stock on active size rows, in display order.
    pub async fn available_sizes<C: ConnectionTrait>(
        db: &C,
        product_id: Uuid,
    ) -> Result<Vec<AvailableSize>, ServiceError> {
        let rows = ProductSize::find()
            .filter(product_size::Column::ProductId.eq(product_id))
            .filter(product_size::Column::Quantity.gt(0))
            .find_also_related(Size)
            .all(db)
            .await?;

        let mut sizes: Vec<(i32, AvailableSize)> = rows
            .into_iter()
            .filter_map(|(ps, size)| {
                let size = size.filter(|s| s.is_active)?;
                Some((
                    size.sort_order,
                    AvailableSize {
                        size_id: size.id,
                        name: size.name,
                        display_name: size.display_name,
                        quantity: ps.quantity,
                    },
                ))
            })
            .collect();
        sizes.sort_by_key(|(order, _)| *order);
        Ok(sizes.into_iter().map(|(_, s)| s).collect())
    }

    async fn detail(&self, product: ProductModel) -> Result<ProductDetail, ServiceError> {
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .order_by_asc(product_image::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let category = Category::find_by_id(product.category_id)
            .one(&*self.db)
            .await?;
        let sizes = Self::available_sizes(&*self.db, product.id).await?;

        Ok(ProductDetail {
            summary: ProductSummary::from_model(&product, &images),
            description: product.description,
            is_active: product.is_active,
            category,
            sizes,
            images,
        })
    }

    async fn summaries(
        &self,
        products: Vec<ProductModel>,
    ) -> Result<Vec<ProductSummary>, ServiceError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.is_in(ids))
            .all(&*self.db)
            .await?;

        Ok(products
            .iter()
            .map(|p| {
                let own: Vec<ProductImageModel> = images
                    .iter()
                    .filter(|img| img.product_id == p.id)
                    .cloned()
                    .collect();
                ProductSummary::from_model(p, &own)
            })
            .collect())
    }

    // ----- admin: categories -----

    #[instrument(skip(self))]
    pub async fn list_all_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
        self.ensure_category_unique(&input.name, &slug, None).await?;

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            description: Set(input.description),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = %category.id, "Created category {}", category.name);
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let existing = Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))?;
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
        self.ensure_category_unique(&input.name, &slug, Some(id)).await?;

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.slug = Set(slug);
        active.description = Set(input.description);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let category = Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))?;

        let products = Product::find()
            .filter(product::Column::CategoryId.eq(id))
            .count(&*self.db)
            .await?;
        if products > 0 {
            return Err(ServiceError::Conflict(format!(
                "Cannot delete category '{}' while it has {} product(s).",
                category.name, products
            )));
        }

        Category::delete_by_id(id).exec(&*self.db).await?;
        info!(category_id = %id, "Deleted category");
        Ok(())
    }

    async fn ensure_category_unique(
        &self,
        name: &str,
        slug: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Category::find().filter(
            Condition::any()
                .add(category::Column::Name.eq(name.trim()))
                .add(category::Column::Slug.eq(slug)),
        );
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A category named '{}' or with slug '{}' already exists",
                name.trim(),
                slug
            )));
        }
        Ok(())
    }

    // ----- admin: sizes -----

    pub async fn list_sizes(&self) -> Result<Vec<SizeModel>, ServiceError> {
        Ok(Size::find()
            .order_by_asc(size::Column::SizeType)
            .order_by_asc(size::Column::SortOrder)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_size(&self, input: SizeInput) -> Result<SizeModel, ServiceError> {
        input.validate()?;
        let size = size::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            display_name: Set(input.display_name.trim().to_string()),
            size_type: Set(input.size_type),
            sort_order: Set(input.sort_order),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        info!(size_id = %size.id, "Created size {}", size.name);
        Ok(size)
    }

    #[instrument(skip(self))]
    pub async fn update_size(&self, id: Uuid, input: SizeInput) -> Result<SizeModel, ServiceError> {
        input.validate()?;
        let existing = Size::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", id)))?;

        let mut active: size::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.display_name = Set(input.display_name.trim().to_string());
        active.size_type = Set(input.size_type);
        active.sort_order = Set(input.sort_order);
        active.is_active = Set(input.is_active);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_size(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Size::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Size {} not found", id)));
        }
        Ok(())
    }

    // ----- admin: products -----

    #[instrument(skip(self))]
    pub async fn list_all_products(
        &self,
        q: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductSummary>, u64), ServiceError> {
        let mut query = Product::find();
        if let Some(q) = q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(q))
                    .add(product::Column::Slug.contains(q)),
            );
        }
        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((self.summaries(products).await?, total))
    }

    /// Product detail for staff, including inactive products.
    pub async fn admin_get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = self.find_product(id).await?;
        self.detail(product).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: ProductInput) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        Self::check_prices(&input)?;
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
        self.ensure_category_exists(input.category_id).await?;
        self.ensure_product_slug_free(&slug, None).await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(input.category_id),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            description: Set(input.description),
            price: Set(input.price),
            discount_price: Set(input.discount_price),
            stock: Set(input.stock),
            available_colors: Set(serde_json::json!(input.available_colors)),
            is_active: Set(input.is_active),
            is_featured: Set(input.is_featured),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %product.id, "Created product {}", product.slug);
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: ProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        Self::check_prices(&input)?;
        let existing = self.find_product(id).await?;
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
        self.ensure_category_exists(input.category_id).await?;
        self.ensure_product_slug_free(&slug, Some(id)).await?;

        let mut active: product::ActiveModel = existing.into();
        active.category_id = Set(input.category_id);
        active.name = Set(input.name.trim().to_string());
        active.slug = Set(slug);
        active.description = Set(input.description);
        active.price = Set(input.price);
        active.discount_price = Set(input.discount_price);
        active.stock = Set(input.stock);
        active.available_colors = Set(serde_json::json!(input.available_colors));
        active.is_active = Set(input.is_active);
        active.is_featured = Set(input.is_featured);
        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;
        info!(product_id = %product.id, "Updated product");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        info!(product_id = %id, "Deleted product");
        Ok(())
    }

    /// Overwrite the product-level stock counter.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        id: Uuid,
        stock: Option<i32>,
    ) -> Result<ProductModel, ServiceError> {
        let stock =
            stock.ok_or_else(|| ServiceError::BadRequest("Stock value is required".to_string()))?;
        if stock < 0 {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }
        let product = self.find_product(id).await?;

        let mut active: product::ActiveModel = product.into();
        active.stock = Set(stock);
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;
        info!(product_id = %id, stock, "Stock updated");
        Ok(product)
    }

    /// Replace the per-size quantities of a product.
    #[instrument(skip(self, sizes))]
    pub async fn set_product_sizes(
        &self,
        id: Uuid,
        sizes: Vec<ProductSizeInput>,
    ) -> Result<Vec<AvailableSize>, ServiceError> {
        for entry in &sizes {
            entry.validate()?;
        }
        let txn = self.db.begin().await?;

        Product::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        ProductSize::delete_many()
            .filter(product_size::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        let mut seen = Vec::with_capacity(sizes.len());
        for entry in sizes {
            if seen.contains(&entry.size_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Size {} is listed more than once",
                    entry.size_id
                )));
            }
            seen.push(entry.size_id);

            Size::find_by_id(entry.size_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", entry.size_id)))?;

            product_size::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(id),
                size_id: Set(entry.size_id),
                quantity: Set(entry.quantity),
            }
            .insert(&txn)
            .await?;
        }

        let available = Self::available_sizes(&txn, id).await?;
        txn.commit().await?;
        info!(product_id = %id, sizes = seen.len(), "Product sizes replaced");
        Ok(available)
    }

    #[instrument(skip(self, input))]
    pub async fn add_image(
        &self,
        product_id: Uuid,
        input: ProductImageInput,
    ) -> Result<ProductImageModel, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if input.is_primary {
            Self::clear_primary(&txn, product_id).await?;
        }
        let image = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_url: Set(input.image_url),
            alt_text: Set(input.alt_text),
            is_primary: Set(input.is_primary),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(image)
    }

    #[instrument(skip(self))]
    pub async fn delete_image(&self, product_id: Uuid, image_id: Uuid) -> Result<(), ServiceError> {
        let result = ProductImage::delete_many()
            .filter(product_image::Column::Id.eq(image_id))
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Image {} not found", image_id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_primary_image(
        &self,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<ProductImageModel, ServiceError> {
        let txn = self.db.begin().await?;
        let image = ProductImage::find_by_id(image_id)
            .filter(product_image::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {} not found", image_id)))?;

        Self::clear_primary(&txn, product_id).await?;
        let mut active: product_image::ActiveModel = image.into();
        active.is_primary = Set(true);
        let image = active.update(&txn).await?;
        txn.commit().await?;
        Ok(image)
    }

    async fn clear_primary<C: ConnectionTrait>(db: &C, product_id: Uuid) -> Result<(), ServiceError> {
        ProductImage::update_many()
            .col_expr(product_image::Column::IsPrimary, Expr::value(false))
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    async fn ensure_category_exists(&self, id: Uuid) -> Result<(), ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::ValidationError(format!("Category {} does not exist", id)))
    }

    async fn ensure_product_slug_free(
        &self,
        slug: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A product with slug '{}' already exists",
                slug
            )));
        }
        Ok(())
    }

    fn check_prices(input: &ProductInput) -> Result<(), ServiceError> {
        if let Some(discount) = input.discount_price {
            if discount >= input.price {
                return Err(ServiceError::ValidationError(
                    "Discount price must be lower than the regular price.".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Summer  Linen Shirt!"), "summer-linen-shirt");
        assert_eq!(slugify("  --Kids' Wear-- "), "kids-wear");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn explicit_slug_is_normalized() {
        assert_eq!(resolve_slug(Some("Men Tops"), "ignored").unwrap(), "men-tops");
        assert_eq!(resolve_slug(Some("  "), "Denim Jackets").unwrap(), "denim-jackets");
        assert!(resolve_slug(None, "???").is_err());
    }
}
