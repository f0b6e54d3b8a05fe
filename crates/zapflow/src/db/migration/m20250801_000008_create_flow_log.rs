use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FlowLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FlowLog::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FlowLog::FlowId).string().not_null())
                    .col(ColumnDef::new(FlowLog::NodeId).string().not_null())
                    .col(ColumnDef::new(FlowLog::Status).string().not_null())
                    .col(ColumnDef::new(FlowLog::Detail).string().not_null())
                    .col(
                        ColumnDef::new(FlowLog::CreatedAt)
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
            .drop_table(Table::drop().table(FlowLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FlowLog {
    Table,
    Id,
    FlowId,
    NodeId,
    Status,
    Detail,
    CreatedAt,
}
