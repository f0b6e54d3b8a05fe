use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Message::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Message::BotId).string().not_null())
                    .col(ColumnDef::new(Message::FromNumber).string().not_null())
                    .col(ColumnDef::new(Message::ToNumber).string().not_null())
                    .col(ColumnDef::new(Message::Content).string().not_null())
                    .col(ColumnDef::new(Message::ContentType).string().not_null())
                    .col(ColumnDef::new(Message::Direction).string().not_null())
                    .col(ColumnDef::new(Message::Status).string().not_null())
                    .col(
                        ColumnDef::new(Message::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Message::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER message_updated_at
            AFTER UPDATE ON message
            FOR EACH ROW
            BEGIN
                UPDATE message
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Message {
    Table,
    Id,
    BotId,
    FromNumber,
    ToNumber,
    Content,
    ContentType,
    Direction,
    Status,
    CreatedAt,
    UpdatedAt,
}
