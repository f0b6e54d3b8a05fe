use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flow::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Flow::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Flow::BotId).string().not_null())
                    .col(ColumnDef::new(Flow::Name).string().not_null())
                    .col(ColumnDef::new(Flow::Active).boolean().not_null())
                    .col(ColumnDef::new(Flow::Graph).string().not_null())
                    .col(
                        ColumnDef::new(Flow::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Flow::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER flow_updated_at
            AFTER UPDATE ON flow
            FOR EACH ROW
            BEGIN
                UPDATE flow
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Flow::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Flow {
    Table,
    Id,
    BotId,
    Name,
    Active,
    Graph,
    CreatedAt,
    UpdatedAt,
}
