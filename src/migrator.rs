use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_users_table::Migration),
            Box::new(m20240201_000002_create_stock_items_table::Migration),
            Box::new(m20240201_000003_create_stock_movements_table::Migration),
        ]
    }
}

mod m20240201_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_users_table"
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
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::DisplayName).string().not_null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        PasswordHash,
        DisplayName,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000002_create_stock_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_stock_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockItems::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(StockItems::Sku).string().not_null())
                        .col(ColumnDef::new(StockItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(StockItems::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockItems::LowStockThreshold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::SupplierName).string().null())
                        .col(
                            ColumnDef::new(StockItems::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(StockItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One SKU per owner; lookups are always owner-scoped.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_owner_sku")
                        .table(StockItems::Table)
                        .col(StockItems::OwnerId)
                        .col(StockItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
        OwnerId,
        Sku,
        Name,
        Quantity,
        LowStockThreshold,
        SupplierName,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000003_create_stock_movements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Delta).integer().not_null())
                        .col(
                            ColumnDef::new(StockMovements::CustomerName)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reason).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // History is always read newest-first per item.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_item_created")
                        .table(StockMovements::Table)
                        .col(StockMovements::ItemId)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_owner")
                        .table(StockMovements::Table)
                        .col(StockMovements::OwnerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        OwnerId,
        ItemId,
        MovementType,
        Delta,
        CustomerName,
        Reason,
        CreatedAt,
    }
}
