use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebhookConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookConfig::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebhookConfig::UserId).string().not_null())
                    .col(
                        ColumnDef::new(WebhookConfig::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(WebhookConfig::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookConfig::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WebhookConfig {
    Table,
    Id,
    UserId,
    Token,
    CreatedAt,
}
