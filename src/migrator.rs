use sea_orm::DbBackend;
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_accounts_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_cart_and_coupon_tables::Migration),
            Box::new(m20240301_000004_create_order_tables::Migration),
            Box::new(m20240301_000005_create_wishlist_table::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    PasswordHash,
    FirstName,
    LastName,
    IsStaff,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    Phone,
    Address,
    City,
    State,
    PostalCode,
    Country,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Addresses {
    Table,
    Id,
    UserId,
    AddressType,
    FullName,
    Phone,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Country,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sizes {
    Table,
    Id,
    Name,
    DisplayName,
    SizeType,
    SortOrder,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    CategoryId,
    Name,
    Slug,
    Description,
    Price,
    DiscountPrice,
    Stock,
    AvailableColors,
    IsActive,
    IsFeatured,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProductSizes {
    Table,
    Id,
    ProductId,
    SizeId,
    Quantity,
}

#[derive(DeriveIden)]
enum ProductImages {
    Table,
    Id,
    ProductId,
    ImageUrl,
    AltText,
    IsPrimary,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Carts {
    Table,
    Id,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CartItems {
    Table,
    Id,
    CartId,
    ProductId,
    SizeId,
    Color,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    Description,
    DiscountType,
    DiscountValue,
    MinOrderAmount,
    MaxDiscount,
    ValidFrom,
    ValidTo,
    IsActive,
    UsageLimit,
    TimesUsed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AppliedCoupons {
    Table,
    Id,
    CouponId,
    UserId,
    CartId,
    DiscountAmount,
    AppliedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    FullName,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
    Country,
    Subtotal,
    Discount,
    Total,
    CouponCode,
    Status,
    PaymentStatus,
    GatewayOrderId,
    PaymentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    Quantity,
    Price,
    SizeId,
    Size,
    Color,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WishlistItems {
    Table,
    Id,
    UserId,
    ProductId,
    AddedAt,
}

/// Decimal(19, 4) on Postgres. SQLite tops out at 16 digits of precision.
fn decimal_col(backend: DbBackend, col: impl IntoIden) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match backend {
        DbBackend::Sqlite => def.decimal_len(16, 4),
        _ => def.decimal_len(19, 4),
    };
    def
}

fn money(backend: DbBackend, col: impl IntoIden) -> ColumnDef {
    decimal_col(backend, col).not_null().default(0).to_owned()
}

fn uuid_pk(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().primary_key().to_owned()
}

fn timestamp(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

mod m20240301_000001_create_accounts_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_accounts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(uuid_pk(Users::Id))
                        .col(ColumnDef::new(Users::Email).string_len(254).not_null().unique_key())
                        .col(ColumnDef::new(Users::Username).string_len(150).not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string_len(150).not_null().default(""))
                        .col(ColumnDef::new(Users::LastName).string_len(150).not_null().default(""))
                        .col(ColumnDef::new(Users::IsStaff).boolean().not_null().default(false))
                        .col(ColumnDef::new(Users::IsActive).boolean().not_null().default(true))
                        .col(timestamp(Users::CreatedAt))
                        .col(timestamp(Users::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserProfiles::Table)
                        .if_not_exists()
                        .col(uuid_pk(UserProfiles::Id))
                        .col(ColumnDef::new(UserProfiles::UserId).uuid().not_null().unique_key())
                        .col(ColumnDef::new(UserProfiles::Phone).string_len(15).null())
                        .col(ColumnDef::new(UserProfiles::Address).text().null())
                        .col(ColumnDef::new(UserProfiles::City).string_len(100).null())
                        .col(ColumnDef::new(UserProfiles::State).string_len(100).null())
                        .col(ColumnDef::new(UserProfiles::PostalCode).string_len(20).null())
                        .col(
                            ColumnDef::new(UserProfiles::Country)
                                .string_len(100)
                                .not_null()
                                .default("India"),
                        )
                        .col(timestamp(UserProfiles::CreatedAt))
                        .col(timestamp(UserProfiles::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_profiles_user_id")
                                .from(UserProfiles::Table, UserProfiles::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Addresses::Table)
                        .if_not_exists()
                        .col(uuid_pk(Addresses::Id))
                        .col(ColumnDef::new(Addresses::UserId).uuid().not_null())
                        .col(ColumnDef::new(Addresses::AddressType).string_len(10).not_null())
                        .col(ColumnDef::new(Addresses::FullName).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::Phone).string_len(15).not_null())
                        .col(ColumnDef::new(Addresses::AddressLine1).string_len(255).not_null())
                        .col(ColumnDef::new(Addresses::AddressLine2).string_len(255).null())
                        .col(ColumnDef::new(Addresses::City).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::State).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::PostalCode).string_len(20).not_null())
                        .col(ColumnDef::new(Addresses::Country).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::IsDefault).boolean().not_null().default(false))
                        .col(timestamp(Addresses::CreatedAt))
                        .col(timestamp(Addresses::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_addresses_user_id")
                                .from(Addresses::Table, Addresses::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_addresses_user_type")
                        .table(Addresses::Table)
                        .col(Addresses::UserId)
                        .col(Addresses::AddressType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Addresses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000002_create_catalog_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let backend = manager.get_database_backend();

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(uuid_pk(Categories::Id))
                        .col(ColumnDef::new(Categories::Name).string_len(100).not_null().unique_key())
                        .col(ColumnDef::new(Categories::Slug).string_len(100).not_null().unique_key())
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::IsActive).boolean().not_null().default(true))
                        .col(timestamp(Categories::CreatedAt))
                        .col(timestamp(Categories::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sizes::Table)
                        .if_not_exists()
                        .col(uuid_pk(Sizes::Id))
                        .col(ColumnDef::new(Sizes::Name).string_len(20).not_null())
                        .col(ColumnDef::new(Sizes::DisplayName).string_len(50).not_null())
                        .col(ColumnDef::new(Sizes::SizeType).string_len(20).not_null())
                        .col(ColumnDef::new(Sizes::SortOrder).integer().not_null().default(0))
                        .col(ColumnDef::new(Sizes::IsActive).boolean().not_null().default(true))
                        .col(timestamp(Sizes::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(uuid_pk(Products::Id))
                        .col(ColumnDef::new(Products::CategoryId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Products::Slug).string_len(200).not_null().unique_key())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(money(backend, Products::Price))
                        .col(decimal_col(backend, Products::DiscountPrice).null())
                        .col(ColumnDef::new(Products::Stock).integer().not_null().default(0))
                        .col(ColumnDef::new(Products::AvailableColors).json().not_null())
                        .col(ColumnDef::new(Products::IsActive).boolean().not_null().default(true))
                        .col(ColumnDef::new(Products::IsFeatured).boolean().not_null().default(false))
                        .col(timestamp(Products::CreatedAt))
                        .col(timestamp(Products::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSizes::Table)
                        .if_not_exists()
                        .col(uuid_pk(ProductSizes::Id))
                        .col(ColumnDef::new(ProductSizes::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductSizes::SizeId).uuid().not_null())
                        .col(ColumnDef::new(ProductSizes::Quantity).integer().not_null().default(0))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_sizes_product_id")
                                .from(ProductSizes::Table, ProductSizes::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_sizes_size_id")
                                .from(ProductSizes::Table, ProductSizes::SizeId)
                                .to(Sizes::Table, Sizes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_product_sizes_product_size")
                        .table(ProductSizes::Table)
                        .col(ProductSizes::ProductId)
                        .col(ProductSizes::SizeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductImages::Table)
                        .if_not_exists()
                        .col(uuid_pk(ProductImages::Id))
                        .col(ColumnDef::new(ProductImages::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductImages::ImageUrl).string_len(500).not_null())
                        .col(ColumnDef::new(ProductImages::AltText).string_len(200).null())
                        .col(ColumnDef::new(ProductImages::IsPrimary).boolean().not_null().default(false))
                        .col(timestamp(ProductImages::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_images_product_id")
                                .from(ProductImages::Table, ProductImages::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                ProductImages::Table.into_iden(),
                ProductSizes::Table.into_iden(),
                Products::Table.into_iden(),
                Sizes::Table.into_iden(),
                Categories::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }
}

mod m20240301_000003_create_cart_and_coupon_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_cart_and_coupon_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let backend = manager.get_database_backend();

            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(uuid_pk(Carts::Id))
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null().unique_key())
                        .col(timestamp(Carts::CreatedAt))
                        .col(timestamp(Carts::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_carts_user_id")
                                .from(Carts::Table, Carts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(uuid_pk(CartItems::Id))
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::SizeId).uuid().null())
                        .col(ColumnDef::new(CartItems::Color).string_len(50).null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null().default(1))
                        .col(timestamp(CartItems::CreatedAt))
                        .col(timestamp(CartItems::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart_id")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_product_id")
                                .from(CartItems::Table, CartItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_cart_items_line")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::ProductId)
                        .col(CartItems::SizeId)
                        .col(CartItems::Color)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(uuid_pk(Coupons::Id))
                        .col(ColumnDef::new(Coupons::Code).string_len(50).not_null().unique_key())
                        .col(ColumnDef::new(Coupons::Description).text().null())
                        .col(ColumnDef::new(Coupons::DiscountType).string_len(10).not_null())
                        .col(money(backend, Coupons::DiscountValue))
                        .col(money(backend, Coupons::MinOrderAmount))
                        .col(decimal_col(backend, Coupons::MaxDiscount).null())
                        .col(timestamp(Coupons::ValidFrom))
                        .col(timestamp(Coupons::ValidTo))
                        .col(ColumnDef::new(Coupons::IsActive).boolean().not_null().default(true))
                        .col(ColumnDef::new(Coupons::UsageLimit).integer().not_null().default(1))
                        .col(ColumnDef::new(Coupons::TimesUsed).integer().not_null().default(0))
                        .col(timestamp(Coupons::CreatedAt))
                        .col(timestamp(Coupons::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AppliedCoupons::Table)
                        .if_not_exists()
                        .col(uuid_pk(AppliedCoupons::Id))
                        .col(ColumnDef::new(AppliedCoupons::CouponId).uuid().not_null())
                        .col(ColumnDef::new(AppliedCoupons::UserId).uuid().not_null())
                        .col(ColumnDef::new(AppliedCoupons::CartId).uuid().null().unique_key())
                        .col(money(backend, AppliedCoupons::DiscountAmount))
                        .col(timestamp(AppliedCoupons::AppliedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_applied_coupons_coupon_id")
                                .from(AppliedCoupons::Table, AppliedCoupons::CouponId)
                                .to(Coupons::Table, Coupons::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_applied_coupons_user_id")
                                .from(AppliedCoupons::Table, AppliedCoupons::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_applied_coupons_cart_id")
                                .from(AppliedCoupons::Table, AppliedCoupons::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_applied_coupons_coupon_user_cart")
                        .table(AppliedCoupons::Table)
                        .col(AppliedCoupons::CouponId)
                        .col(AppliedCoupons::UserId)
                        .col(AppliedCoupons::CartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                AppliedCoupons::Table.into_iden(),
                Coupons::Table.into_iden(),
                CartItems::Table.into_iden(),
                Carts::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }
}

mod m20240301_000004_create_order_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let backend = manager.get_database_backend();

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(uuid_pk(Orders::Id))
                        .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null().unique_key())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::FullName).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::Email).string_len(254).not_null())
                        .col(ColumnDef::new(Orders::Phone).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::Address).text().not_null())
                        .col(ColumnDef::new(Orders::City).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::State).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::ZipCode).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::Country).string_len(100).not_null().default("IN"))
                        .col(money(backend, Orders::Subtotal))
                        .col(money(backend, Orders::Discount))
                        .col(money(backend, Orders::Total))
                        .col(ColumnDef::new(Orders::CouponCode).string_len(50).null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::GatewayOrderId).string_len(100).null())
                        .col(ColumnDef::new(Orders::PaymentId).string_len(100).null())
                        .col(timestamp(Orders::CreatedAt))
                        .col(timestamp(Orders::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user_id")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_orders_user_id", Orders::UserId),
                ("idx_orders_status", Orders::Status),
                ("idx_orders_gateway_order_id", Orders::GatewayOrderId),
                ("idx_orders_created_at", Orders::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Orders::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(uuid_pk(OrderItems::Id))
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string_len(200).not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(money(backend, OrderItems::Price))
                        .col(ColumnDef::new(OrderItems::SizeId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Size).string_len(50).null())
                        .col(ColumnDef::new(OrderItems::Color).string_len(50).null())
                        .col(timestamp(OrderItems::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000005_create_wishlist_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_wishlist_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WishlistItems::Table)
                        .if_not_exists()
                        .col(uuid_pk(WishlistItems::Id))
                        .col(ColumnDef::new(WishlistItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(WishlistItems::ProductId).uuid().not_null())
                        .col(timestamp(WishlistItems::AddedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_wishlist_items_user_id")
                                .from(WishlistItems::Table, WishlistItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_wishlist_items_product_id")
                                .from(WishlistItems::Table, WishlistItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_wishlist_items_user_product")
                        .table(WishlistItems::Table)
                        .col(WishlistItems::UserId)
                        .col(WishlistItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WishlistItems::Table).to_owned())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products_table(backend: DbBackend) -> TableCreateStatement {
        Table::create()
            .table(Products::Table)
            .col(money(backend, Products::Price))
            .col(decimal_col(backend, Products::DiscountPrice).null())
            .to_owned()
    }

    #[test]
    fn money_precision_follows_backend() {
        let sqlite = products_table(DbBackend::Sqlite).to_string(SqliteQueryBuilder);
        assert!(sqlite.contains("(16, 4)"), "{sqlite}");
        assert!(!sqlite.contains("(19, 4)"), "{sqlite}");

        let postgres = products_table(DbBackend::Postgres).to_string(PostgresQueryBuilder);
        assert!(postgres.contains("(19, 4)"), "{postgres}");
    }
}
