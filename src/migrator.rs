use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_stock_items_table::Migration),
            Box::new(m20250101_000002_create_stock_transactions_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_stock_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_stock_items_table"
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
                        .col(ColumnDef::new(StockItems::Name).string().not_null())
                        .col(ColumnDef::new(StockItems::Sku).string().not_null())
                        .col(ColumnDef::new(StockItems::Unit).string().not_null())
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
                        .col(ColumnDef::new(StockItems::UrgentNote).string().null())
                        .col(ColumnDef::new(StockItems::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(StockItems::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            // Catalog snapshots list by owner and name
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_owner_name")
                        .table(StockItems::Table)
                        .col(StockItems::OwnerId)
                        .col(StockItems::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_owner_sku")
                        .table(StockItems::Table)
                        .col(StockItems::OwnerId)
                        .col(StockItems::Sku)
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

    #[derive(Iden)]
    enum StockItems {
        Table,
        Id,
        OwnerId,
        Name,
        Sku,
        Unit,
        Quantity,
        LowStockThreshold,
        UrgentNote,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_stock_transactions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_stock_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to stock_items: ledger rows are weak references
            // and must survive item deletion.
            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::OwnerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::ItemName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Unit).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Actor).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::Date)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Notes).string().null())
                        .to_owned(),
                )
                .await?;

            // History is read by owner in date order; range reports filter the same way
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_owner_date")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::OwnerId)
                        .col(StockTransactions::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_item_date")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::ItemId)
                        .col(StockTransactions::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockTransactions {
        Table,
        Id,
        OwnerId,
        ItemId,
        ItemName,
        Unit,
        MovementType,
        Quantity,
        Actor,
        Date,
        Notes,
    }
}
