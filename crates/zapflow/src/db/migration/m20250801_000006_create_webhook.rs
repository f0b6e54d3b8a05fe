use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Webhook::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Webhook::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Webhook::UserId).string().not_null())
                    .col(ColumnDef::new(Webhook::Url).string().not_null())
                    .col(ColumnDef::new(Webhook::OnEvent).string().not_null())
                    .col(ColumnDef::new(Webhook::Active).boolean().not_null())
                    .col(ColumnDef::new(Webhook::LastCalledAt).date_time())
                    .col(
                        ColumnDef::new(Webhook::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Webhook::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER webhook_updated_at
            AFTER UPDATE ON webhook
            FOR EACH ROW
            BEGIN
                UPDATE webhook
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Webhook::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Webhook {
    Table,
    Id,
    UserId,
    Url,
    OnEvent,
    Active,
    LastCalledAt,
    CreatedAt,
    UpdatedAt,
}
