use sea_orm::DatabaseConnection;
pub use sea_orm_migration::prelude::*;

use crate::error::ZapflowError;

mod m20250801_000001_create_bot;
mod m20250801_000002_create_flow;
mod m20250801_000003_create_flow_state;
mod m20250801_000004_create_message;
mod m20250801_000005_create_webhook_config;
mod m20250801_000006_create_webhook;
mod m20250801_000007_create_whatsapp_token;
mod m20250801_000008_create_flow_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_bot::Migration),
            Box::new(m20250801_000002_create_flow::Migration),
            Box::new(m20250801_000003_create_flow_state::Migration),
            Box::new(m20250801_000004_create_message::Migration),
            Box::new(m20250801_000005_create_webhook_config::Migration),
            Box::new(m20250801_000006_create_webhook::Migration),
            Box::new(m20250801_000007_create_whatsapp_token::Migration),
            Box::new(m20250801_000008_create_flow_log::Migration),
        ]
    }
}

pub async fn migrate(db: &DatabaseConnection) -> Result<(), ZapflowError> {
    Migrator::up(db, None).await?;
    Ok(())
}
