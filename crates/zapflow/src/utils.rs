#[cfg(test)]
use crate::api::ApiState;
#[cfg(test)]
use crate::db;
#[cfg(test)]
use crate::flow::ConversationLocks;
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use axum::Router;
#[cfg(test)]
use axum_test::TestServer;
#[cfg(test)]
use sea_orm::Database;
#[cfg(test)]
use sea_orm_migration::MigratorTrait;

#[cfg(test)]
pub async fn get_test_state() -> ApiState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::migration::Migrator::refresh(&db).await.unwrap();

    ApiState {
        db,
        auth: "test".into(),
        settings: Settings::default(),
        locks: ConversationLocks::default(),
    }
}

#[cfg(test)]
pub async fn get_test_server(app: Router<ApiState>) -> TestServer {
    let state = get_test_state().await;
    TestServer::new(app.with_state(state)).unwrap()
}
