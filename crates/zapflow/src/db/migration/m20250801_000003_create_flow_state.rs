use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FlowState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FlowState::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FlowState::BotId).string().not_null())
                    .col(ColumnDef::new(FlowState::UserNumber).string().not_null())
                    .col(ColumnDef::new(FlowState::CurrentNode).string().not_null())
                    .col(
                        ColumnDef::new(FlowState::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FlowState::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER flow_state_updated_at
            AFTER UPDATE ON flow_state
            FOR EACH ROW
            BEGIN
                UPDATE flow_state
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FlowState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FlowState {
    Table,
    Id,
    BotId,
    UserNumber,
    CurrentNode,
    CreatedAt,
    UpdatedAt,
}
