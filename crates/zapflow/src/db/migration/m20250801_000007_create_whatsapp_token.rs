use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WhatsappToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WhatsappToken::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WhatsappToken::BotId).string().not_null())
                    .col(
                        ColumnDef::new(WhatsappToken::AccessToken)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WhatsappToken::PhoneNumberId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WhatsappToken::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WhatsappToken::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER whatsapp_token_updated_at
            AFTER UPDATE ON whatsapp_token
            FOR EACH ROW
            BEGIN
                UPDATE whatsapp_token
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WhatsappToken::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WhatsappToken {
    Table,
    Id,
    BotId,
    AccessToken,
    PhoneNumberId,
    CreatedAt,
    UpdatedAt,
}
