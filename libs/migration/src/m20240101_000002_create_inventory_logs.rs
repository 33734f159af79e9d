use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(integer(InventoryLogs::ProductId))
                    .col(integer(InventoryLogs::PreviousStock))
                    .col(
                        ColumnDef::new(InventoryLogs::NewStock)
                            .integer()
                            .not_null()
                            .check(Expr::col(InventoryLogs::NewStock).gte(0)),
                    )
                    .col(integer(InventoryLogs::ChangeAmount))
                    .col(string(InventoryLogs::UserSource).default("system"))
                    .col(
                        timestamp_with_time_zone(InventoryLogs::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_logs_product_id")
                            .from(InventoryLogs::Table, InventoryLogs::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for the reporting queries: filter by product and
        // date range, order by created_at within a product.
        manager
            .create_index(
                Index::create()
                    .name("idx_product_date_composite")
                    .table(InventoryLogs::Table)
                    .col(InventoryLogs::ProductId)
                    .col(InventoryLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_logs_user_source")
                    .table(InventoryLogs::Table)
                    .col(InventoryLogs::UserSource)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_logs_created_at")
                    .table(InventoryLogs::Table)
                    .col(InventoryLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // For the statistics queries (sums over positive/negative deltas).
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_logs_change_amount")
                    .table(InventoryLogs::Table)
                    .col(InventoryLogs::ChangeAmount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryLogs {
    Table,
    Id,
    ProductId,
    PreviousStock,
    NewStock,
    ChangeAmount,
    UserSource,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
